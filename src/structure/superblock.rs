use crate::consts::{BLOCK_SIZE, SUPERBLOCK_HEADER_SIZE, SUPERBLOCK_INDEX};
use crate::driver::DeviceDriver;
use crate::integrity::CheckedIO;
use crate::structure::directory::Directory;
use crate::structure::layout::Layout;
use crate::util::error::{FsError, Result};
use crate::util::serializable::ByteSerializable;

pub(crate) const MAGIC: u32 = 0x464c_4154;

#[derive(Debug, Clone, PartialEq)]
pub struct SuperBlock {
    pub magic: u32,
    pub block_size: usize,
    pub layout: Layout,
    pub directory: Directory,
}

impl SuperBlock {
    pub fn new(layout: Layout) -> SuperBlock {
        SuperBlock { magic: MAGIC, block_size: BLOCK_SIZE, layout, directory: Directory::new() }
    }

    pub fn inodes_in_use(&self) -> u64 {
        self.directory.len()
    }

    pub(crate) fn read<A: DeviceDriver>(io: &CheckedIO<A>) -> Result<SuperBlock> {
        SuperBlock::from_bytes(&io.read_block(SUPERBLOCK_INDEX)?)
    }

    pub(crate) fn write<A: DeviceDriver>(&self, io: &mut CheckedIO<A>) -> Result<()> {
        io.write_block(SUPERBLOCK_INDEX, &self.to_bytes())
    }
}

impl ByteSerializable for SuperBlock {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(BLOCK_SIZE);
        buffer.extend_from_slice(&self.magic.to_le_bytes());
        buffer.extend_from_slice(&(self.block_size as u32).to_le_bytes());
        buffer.extend_from_slice(&self.layout.block_count.to_le_bytes());
        buffer.extend_from_slice(&self.layout.checksum_blocks.to_le_bytes());
        buffer.extend_from_slice(&self.directory.len().to_le_bytes());
        buffer.extend_from_slice(&self.layout.max_inodes.to_le_bytes());
        buffer.extend_from_slice(&self.layout.max_data_blocks.to_le_bytes());
        buffer.append(&mut self.directory.to_bytes());
        buffer.resize(BLOCK_SIZE, 0);
        buffer
    }

    fn from_bytes(buffer: &[u8]) -> Result<SuperBlock> {
        if buffer.len() < BLOCK_SIZE {
            return Err(FsError::Inconsistent("superblock truncated".to_string()));
        }
        let u32_at = |at: usize| u32::from_le_bytes(buffer[at..at + 4].try_into().unwrap_or_default());
        let u64_at = |at: usize| u64::from_le_bytes(buffer[at..at + 8].try_into().unwrap_or_default());

        let magic = u32_at(0);
        if magic != MAGIC {
            return Err(FsError::Inconsistent(format!("bad magic {:#x}, not a flatfs volume", magic)));
        }
        let block_size = u32_at(4) as usize;
        let layout = Layout {
            block_count: u64_at(8),
            checksum_blocks: u64_at(16),
            max_inodes: u64_at(32),
            max_data_blocks: u64_at(40),
        };
        let in_use = u64_at(24);
        if in_use > layout.max_inodes {
            return Err(FsError::Inconsistent(format!(
                "{} files in use but only {} inodes",
                in_use, layout.max_inodes
            )));
        }
        let directory = Directory::from_bytes(&buffer[SUPERBLOCK_HEADER_SIZE..], in_use)?;
        Ok(SuperBlock { magic, block_size, layout, directory })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory_drive::MemoryDrive;
    use crate::io::IO;
    use crate::structure::directory::FileName;

    #[test]
    fn read_write_superblock() {
        let layout = Layout::plan(1024);
        let io = IO::new(MemoryDrive::new(1024 * BLOCK_SIZE, 512)).unwrap();
        let mut io = CheckedIO::new(io, &layout);
        io.clear_region().unwrap();

        let mut superblock = SuperBlock::new(layout);
        superblock.directory.insert(FileName::new("test.txt").unwrap(), 3).unwrap();
        superblock.write(&mut io).unwrap();

        let drive_superblock = SuperBlock::read(&io).unwrap();
        assert_eq!(superblock, drive_superblock);
        assert_eq!(drive_superblock.inodes_in_use(), 1);
        assert_eq!(drive_superblock.directory.lookup("test.txt"), Some(3));
        io.verify_block(SUPERBLOCK_INDEX).unwrap();
    }

    #[test]
    fn header_layout() {
        let bytes = SuperBlock::new(Layout::plan(2055)).to_bytes();
        assert_eq!(&bytes[0..4], &MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &(BLOCK_SIZE as u32).to_le_bytes());
        assert_eq!(&bytes[8..16], &2055u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &3u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &0u64.to_le_bytes());
    }

    #[test]
    fn rejects_foreign_block() {
        assert!(matches!(SuperBlock::from_bytes(&vec![0; BLOCK_SIZE]), Err(FsError::Inconsistent(_))));

        let mut bytes = SuperBlock::new(Layout::plan(2055)).to_bytes();
        bytes[24] = 99;
        assert!(SuperBlock::from_bytes(&bytes).is_err());
    }
}
