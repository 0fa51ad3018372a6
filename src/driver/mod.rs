use std::io;

pub mod file_drive;
pub mod memory_drive;

/// Sector-addressed storage underneath the file system.
pub trait DeviceDriver {
    fn get_sector_count(&self) -> u64;
    fn get_sector_size(&self) -> usize;
    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>>;
    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()>;

    fn get_size(&self) -> u64 {
        self.get_sector_count() * self.get_sector_size() as u64
    }
}

pub(crate) fn check_sector(index: u64, sector_count: u64) -> io::Result<()> {
    if index >= sector_count {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("sector {} out of range ({} sectors)", index, sector_count),
        ));
    }
    Ok(())
}
