//! Per-block checksums.
//!
//! Every block written through [`CheckedIO`] has its CRC stored in the
//! checksum region, two bytes per block, addressed by block number. The
//! region itself is written raw.

use crate::consts::{BlockPointer, BLOCK_SIZE, CHECKSUM_WIDTH};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::structure::layout::Layout;
use crate::util::error::{FsError, Result};

mod crc16;

pub use crc16::crc16;

const CHECKSUMS_PER_BLOCK: u64 = (BLOCK_SIZE / CHECKSUM_WIDTH) as u64;

pub(crate) struct CheckedIO<A: DeviceDriver> {
    io: IO<A>,
    region_start: BlockPointer,
    region_blocks: u64,
}

impl<A: DeviceDriver> CheckedIO<A> {
    pub fn new(io: IO<A>, layout: &Layout) -> CheckedIO<A> {
        CheckedIO { io, region_start: layout.checksum_start(), region_blocks: layout.checksum_blocks }
    }

    /// Zeroes the checksum region.
    pub fn clear_region(&mut self) -> Result<()> {
        let zero = vec![0; BLOCK_SIZE];
        for i in 0..self.region_blocks {
            let block = self.region_start + i;
            self.io
                .write_block(block, &zero)
                .map_err(|source| FsError::WriteFailed { block, source })?;
        }
        Ok(())
    }

    pub fn read_block(&self, index: BlockPointer) -> Result<Vec<u8>> {
        Ok(self.io.read_block(index)?)
    }

    /// Persists the block, then its checksum.
    pub fn write_block(&mut self, index: BlockPointer, block: &[u8]) -> Result<()> {
        self.io
            .write_block(index, block)
            .map_err(|source| FsError::WriteFailed { block: index, source })?;
        self.store_checksum(index, crc16(block))
    }

    pub fn verify_block(&self, index: BlockPointer) -> Result<()> {
        let block = self.io.read_block(index)?;
        let stored = self.stored_checksum(index)?;
        if crc16(&block) != stored {
            log::warn!("checksum mismatch in block {}", index);
            return Err(FsError::Corrupt { block: index });
        }
        Ok(())
    }

    pub fn stored_checksum(&self, index: BlockPointer) -> Result<u16> {
        let (block, offset) = self.locate(index)?;
        let data = self.io.read_block(block)?;
        Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
    }

    pub fn into_inner(self) -> IO<A> {
        self.io
    }

    fn store_checksum(&mut self, index: BlockPointer, checksum: u16) -> Result<()> {
        let (block, offset) = self.locate(index)?;
        let mut data = self
            .io
            .read_block(block)
            .map_err(|source| FsError::ChecksumWriteFailed { block: index, source })?;
        data[offset..offset + CHECKSUM_WIDTH].copy_from_slice(&checksum.to_le_bytes());
        self.io
            .write_block(block, &data)
            .map_err(|source| FsError::ChecksumWriteFailed { block: index, source })
    }

    #[inline]
    fn locate(&self, index: BlockPointer) -> Result<(BlockPointer, usize)> {
        let block = index / CHECKSUMS_PER_BLOCK;
        if block >= self.region_blocks {
            return Err(FsError::Inconsistent(format!("block {} has no checksum slot", index)));
        }
        let offset = (index % CHECKSUMS_PER_BLOCK) as usize * CHECKSUM_WIDTH;
        Ok((self.region_start + block, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory_drive::MemoryDrive;

    fn checked_io(blocks: u64) -> CheckedIO<MemoryDrive> {
        let io = IO::new(MemoryDrive::new(blocks as usize * BLOCK_SIZE, 512)).unwrap();
        let layout = Layout::plan(blocks);
        let mut disk = CheckedIO::new(io, &layout);
        disk.clear_region().unwrap();
        disk
    }

    #[test]
    fn write_stores_checksum() {
        let mut disk = checked_io(2100);
        let block = vec![0x61; BLOCK_SIZE];
        disk.write_block(2050, &block).unwrap();
        assert_eq!(disk.stored_checksum(2050).unwrap(), crc16(&block));
        disk.verify_block(2050).unwrap();

        // 2050 * 2 / 2048 = 2: third checksum block, byte 4
        let raw = disk.into_inner().read_block(5).unwrap();
        assert_eq!(u16::from_le_bytes([raw[4], raw[5]]), crc16(&block));
    }

    #[test]
    fn detects_raw_modification() {
        let mut disk = checked_io(200);
        disk.write_block(150, &vec![1; BLOCK_SIZE]).unwrap();
        disk.io.write_block(150, &vec![2; BLOCK_SIZE]).unwrap();
        assert!(matches!(disk.verify_block(150), Err(FsError::Corrupt { block: 150 })));
    }

    #[test]
    fn write_failure_is_reported() {
        let io = IO::new(MemoryDrive::new(200 * BLOCK_SIZE, 512)).unwrap();
        let mut drive = io.into_device();
        drive.set_read_only(true);
        let mut disk = CheckedIO::new(IO::new(drive).unwrap(), &Layout::plan(200));
        let err = disk.write_block(100, &vec![0; BLOCK_SIZE]).unwrap_err();
        assert!(matches!(err, FsError::WriteFailed { block: 100, .. }));
    }
}
