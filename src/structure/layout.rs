use crate::consts::{
    BlockPointer, BITS_PER_MAP, BLOCK_SIZE, CHECKSUM_START, CHECKSUM_WIDTH, DIRECT_POINTERS, FIXED_BLOCKS, MAX_FILES,
};

/// Where everything lives on a volume of `block_count` blocks.
///
/// Every inode is guaranteed room to grow to the maximum file size at the
/// same time: `max_data_blocks >= max_inodes * DIRECT_POINTERS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub block_count: u64,
    pub checksum_blocks: u64,
    pub max_inodes: u64,
    pub max_data_blocks: u64,
}

impl Layout {
    pub fn plan(block_count: u64) -> Layout {
        let checksum_blocks = (block_count * CHECKSUM_WIDTH as u64).div_ceil(BLOCK_SIZE as u64);
        let available = block_count.saturating_sub(FIXED_BLOCKS + checksum_blocks);
        let max_inodes = (available / (DIRECT_POINTERS as u64 + 1)).min(MAX_FILES as u64);
        let max_data_blocks = (available - max_inodes).min(BITS_PER_MAP);

        Layout { block_count, checksum_blocks, max_inodes, max_data_blocks }
    }

    #[inline]
    pub fn checksum_start(&self) -> BlockPointer {
        CHECKSUM_START
    }

    #[inline]
    pub fn inode_table_start(&self) -> BlockPointer {
        CHECKSUM_START + self.checksum_blocks
    }

    #[inline]
    pub fn data_start(&self) -> BlockPointer {
        self.inode_table_start() + self.max_inodes
    }

    /// Blocks covered by the layout; anything past this is never touched.
    pub fn used_blocks(&self) -> u64 {
        self.data_start() + self.max_data_blocks
    }

    pub fn is_consistent(&self) -> bool {
        self.max_inodes > 0
            && self.used_blocks() <= self.block_count
            && self.max_data_blocks >= self.max_inodes * DIRECT_POINTERS as u64
            && self.checksum_blocks * (BLOCK_SIZE / CHECKSUM_WIDTH) as u64 >= self.block_count
    }
}
