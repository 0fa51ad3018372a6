use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::driver::{check_sector, DeviceDriver};

/// A disk image on the host file system.
#[derive(Debug)]
pub struct FileDrive {
    file: File,
    sector_count: u64,
    sector_size: usize,
}

impl FileDrive {
    /// Creates a new zero-filled image of `bytes` bytes. Fails if `path` exists.
    pub fn create<P: AsRef<Path>>(path: P, bytes: u64, sector_size: usize) -> io::Result<FileDrive> {
        check_sector_size(sector_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(bytes)?;
        Ok(FileDrive { file, sector_count: bytes / sector_size as u64, sector_size })
    }

    pub fn open<P: AsRef<Path>>(path: P, sector_size: usize) -> io::Result<FileDrive> {
        check_sector_size(sector_size)?;
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let bytes = file.metadata()?.len();
        Ok(FileDrive { file, sector_count: bytes / sector_size as u64, sector_size })
    }
}

fn check_sector_size(sector_size: usize) -> io::Result<()> {
    if sector_size == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "sector size must not be zero"));
    }
    Ok(())
}

impl DeviceDriver for FileDrive {
    fn get_sector_count(&self) -> u64 {
        self.sector_count
    }

    fn get_sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>> {
        check_sector(index, self.sector_count)?;
        let mut buffer = vec![0; self.sector_size];
        self.file.read_exact_at(&mut buffer, index * self.sector_size as u64)?;
        Ok(buffer)
    }

    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()> {
        check_sector(index, self.sector_count)?;
        if data.len() != self.sector_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sector size mismatch - expected {}, got {}", self.sector_size, data.len()),
            ));
        }
        self.file.write_all_at(data, index * self.sector_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_sectors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.img");
        let mut drive = FileDrive::create(&path, 1024 * 512, 512).unwrap();
        assert_eq!(drive.get_sector_count(), 1024);

        let sector0 = vec![0x42; 512];
        let sector1023 = vec![0x52; 512];
        drive.write_sector(0, &sector0).unwrap();
        drive.write_sector(1023, &sector1023).unwrap();

        assert_eq!(drive.read_sector(0).unwrap(), sector0);
        assert_eq!(drive.read_sector(1023).unwrap(), sector1023);
        assert_eq!(drive.read_sector(511).unwrap(), vec![0; 512]);
        assert!(drive.read_sector(1024).is_err());
        assert!(drive.write_sector(1, &[0; 10]).is_err());
    }

    #[test]
    fn reopen_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.img");
        {
            let mut drive = FileDrive::create(&path, 64 * 512, 512).unwrap();
            drive.write_sector(5, &vec![7; 512]).unwrap();
        }
        assert!(FileDrive::create(&path, 64 * 512, 512).is_err());

        let drive = FileDrive::open(&path, 512).unwrap();
        assert_eq!(drive.get_size(), 64 * 512);
        assert_eq!(drive.read_sector(5).unwrap(), vec![7; 512]);
    }
}
