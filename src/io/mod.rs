use std::io;

use crate::consts::{BlockPointer, BLOCK_SIZE};
use crate::driver::DeviceDriver;
use crate::util::error::{FsError, Result};
use raw::{raw_read_block, raw_write_block};

mod raw;

/// Block-level access to a sector-addressed driver.
pub(crate) struct IO<A: DeviceDriver> {
    device: A,
    pub block_count: u64,
}

impl<A: DeviceDriver> IO<A> {
    pub fn new(device: A) -> Result<IO<A>> {
        let sector_size = device.get_sector_size();
        if sector_size == 0 || sector_size > BLOCK_SIZE || BLOCK_SIZE % sector_size != 0 {
            return Err(FsError::Inconsistent(format!(
                "sector size {} does not divide the block size {}",
                sector_size, BLOCK_SIZE
            )));
        }
        let block_count = device.get_size() / BLOCK_SIZE as u64;
        Ok(IO { device, block_count })
    }

    pub fn write_block(&mut self, index: BlockPointer, block: &[u8]) -> io::Result<()> {
        if block.len() != BLOCK_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block size mismatch - expected {}, got {}", BLOCK_SIZE, block.len()),
            ));
        }
        self.check_index(index)?;
        raw_write_block(&mut self.device, BLOCK_SIZE, block, index)
    }

    pub fn read_block(&self, index: BlockPointer) -> io::Result<Vec<u8>> {
        self.check_index(index)?;
        raw_read_block(&self.device, BLOCK_SIZE, index)
    }

    pub fn into_device(self) -> A {
        self.device
    }

    fn check_index(&self, index: BlockPointer) -> io::Result<()> {
        if index >= self.block_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {} out of range ({} blocks)", index, self.block_count),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::BLOCK_SIZE;
    use crate::driver::memory_drive::MemoryDrive;
    use crate::driver::DeviceDriver;

    #[test]
    fn read_write() {
        let drive = MemoryDrive::new(16 * BLOCK_SIZE, BLOCK_SIZE);
        let mut io = super::IO::new(drive).unwrap();

        let block = vec![42; BLOCK_SIZE];
        io.write_block(0, &block).unwrap();
        assert_eq!(io.read_block(0).unwrap(), block);
    }

    #[test]
    fn read_write_large_block() {
        let drive = MemoryDrive::new(16 * BLOCK_SIZE, 512);
        let mut io = super::IO::new(drive).unwrap();
        assert_eq!(io.block_count, 16);

        let block1 = vec![0x42; BLOCK_SIZE];
        io.write_block(3, &block1).unwrap();
        assert_eq!(io.read_block(3).unwrap(), block1);

        let block2 = vec![0x1; BLOCK_SIZE];
        io.write_block(4, &block2).unwrap();
        assert_eq!(io.read_block(4).unwrap(), block2);

        let block3 = vec![0x8; BLOCK_SIZE];
        io.write_block(3, &block3).unwrap();
        assert_eq!(io.read_block(3).unwrap(), block3);

        // block 3 spans sectors 12..16
        let drive = io.into_device();
        assert_eq!(drive.read_sector(12).unwrap(), vec![0x8; 512]);
        assert_eq!(drive.read_sector(16).unwrap(), vec![0x1; 512]);
    }

    #[test]
    fn rejects_bad_requests() {
        let mut io = super::IO::new(MemoryDrive::new(4 * BLOCK_SIZE, 512)).unwrap();
        assert!(io.read_block(4).is_err());
        assert!(io.write_block(0, &[0; 10]).is_err());
        assert!(super::IO::new(MemoryDrive::new(4 * BLOCK_SIZE, 3 * 256)).is_err());
    }
}
