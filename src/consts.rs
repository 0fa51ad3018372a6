pub const BLOCK_SIZE: usize = 2048;
pub const MAX_FILE_SIZE: usize = 64 * 1024;
pub const DIRECT_POINTERS: usize = MAX_FILE_SIZE / BLOCK_SIZE;

pub const SUPERBLOCK_INDEX: BlockPointer = 0;
pub const INODE_MAP_INDEX: BlockPointer = 1;
pub const DATA_MAP_INDEX: BlockPointer = 2;
pub const CHECKSUM_START: BlockPointer = 3;
/// Blocks that precede the checksum region: superblock and the two bitmaps.
pub const FIXED_BLOCKS: u64 = 3;

pub const CHECKSUM_WIDTH: usize = 2;
pub const BITS_PER_MAP: u64 = (BLOCK_SIZE * 8) as u64;

pub const FILE_NAME_LENGTH: usize = 32;
pub(crate) const SUPERBLOCK_HEADER_SIZE: usize = 48;
pub(crate) const DIRECTORY_ENTRY_SIZE: usize = FILE_NAME_LENGTH + 8;
/// Directory slots that fit in the superblock block, one per possible inode.
pub const MAX_FILES: usize = (BLOCK_SIZE - SUPERBLOCK_HEADER_SIZE) / DIRECTORY_ENTRY_SIZE;

pub const MAX_OPEN_FILES: usize = 16;

pub type BlockPointer = u64;
pub type InodePointer = u64;
pub type DirectPointers = [BlockPointer; DIRECT_POINTERS];
