use std::io;

use crate::driver::{check_sector, DeviceDriver};

/// Sectors kept in memory. Useful for tests and scratch volumes.
#[derive(Debug, Clone)]
pub struct MemoryDrive {
    data: Vec<u8>,
    sector_size: usize,
    read_only: bool,
}

impl MemoryDrive {
    pub fn new(bytes: usize, sector_size: usize) -> MemoryDrive {
        MemoryDrive { data: vec![0; bytes - bytes % sector_size], sector_size, read_only: false }
    }

    /// Raw contents, bypassing the file system.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// While set, every write fails with `PermissionDenied`.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

impl DeviceDriver for MemoryDrive {
    fn get_sector_count(&self) -> u64 {
        (self.data.len() / self.sector_size) as u64
    }

    fn get_sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>> {
        check_sector(index, self.get_sector_count())?;
        let start = index as usize * self.sector_size;
        Ok(self.data[start..start + self.sector_size].to_vec())
    }

    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()> {
        check_sector(index, self.get_sector_count())?;
        if self.read_only {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "drive is read-only"));
        }
        if data.len() != self.sector_size {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "sector size mismatch"));
        }
        let start = index as usize * self.sector_size;
        self.data[start..start + self.sector_size].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_rejects_writes() {
        let mut drive = MemoryDrive::new(8 * 512, 512);
        drive.write_sector(2, &[1; 512]).unwrap();
        drive.set_read_only(true);
        let err = drive.write_sector(2, &[2; 512]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(drive.read_sector(2).unwrap(), vec![1; 512]);
    }
}
