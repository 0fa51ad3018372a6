use crate::consts::BlockPointer;
use crate::driver::DeviceDriver;
use crate::integrity::CheckedIO;
use crate::util::error::{FsError, Resource, Result};

/// One bitmap block tracking `capacity` items, first-fit.
///
/// Nothing is cached: every call reads the block, changes it and writes it
/// back through the checksummed IO.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockMap {
    index: BlockPointer,
    capacity: u64,
    resource: Resource,
}

struct MapData(Vec<u8>);

impl MapData {
    fn is_free(&self, index: u64) -> bool {
        self.0[(index / 8) as usize] & (1 << (index % 8)) == 0
    }

    fn mark_used_mem(&mut self, index: u64) {
        self.0[(index / 8) as usize] |= 1 << (index % 8);
    }

    fn mark_free_mem(&mut self, index: u64) {
        self.0[(index / 8) as usize] &= !(1 << (index % 8));
    }
}

impl BlockMap {
    pub fn new(index: BlockPointer, capacity: u64, resource: Resource) -> BlockMap {
        BlockMap { index, capacity, resource }
    }

    pub fn allocate<A: DeviceDriver>(&self, io: &mut CheckedIO<A>) -> Result<u64> {
        let mut data = self.read(io)?;
        let free = (0..self.capacity).find(|&i| data.is_free(i));
        match free {
            Some(index) => {
                data.mark_used_mem(index);
                self.write(io, &data)?;
                log::debug!("allocated {} #{}", self.resource, index);
                Ok(index)
            }
            None => Err(FsError::ResourceExhausted(self.resource)),
        }
    }

    pub fn free<A: DeviceDriver>(&self, io: &mut CheckedIO<A>, index: u64) -> Result<()> {
        self.free_all(io, &[index])
    }

    /// Clears several bits with a single write.
    pub fn free_all<A: DeviceDriver>(&self, io: &mut CheckedIO<A>, indices: &[u64]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        let mut data = self.read(io)?;
        for &index in indices {
            self.check(index)?;
            data.mark_free_mem(index);
        }
        self.write(io, &data)?;
        log::debug!("freed {} {:?}", self.resource, indices);
        Ok(())
    }

    pub fn is_used<A: DeviceDriver>(&self, io: &CheckedIO<A>, index: u64) -> Result<bool> {
        self.check(index)?;
        Ok(!self.read(io)?.is_free(index))
    }

    pub fn count_used<A: DeviceDriver>(&self, io: &CheckedIO<A>) -> Result<u64> {
        let data = self.read(io)?;
        Ok((0..self.capacity).filter(|&i| !data.is_free(i)).count() as u64)
    }

    fn check(&self, index: u64) -> Result<()> {
        if index >= self.capacity {
            return Err(FsError::Inconsistent(format!(
                "{} index {} out of range ({})",
                self.resource, index, self.capacity
            )));
        }
        Ok(())
    }

    fn read<A: DeviceDriver>(&self, io: &CheckedIO<A>) -> Result<MapData> {
        Ok(MapData(io.read_block(self.index)?))
    }

    fn write<A: DeviceDriver>(&self, io: &mut CheckedIO<A>, data: &MapData) -> Result<()> {
        io.write_block(self.index, &data.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BLOCK_SIZE, DATA_MAP_INDEX};
    use crate::driver::memory_drive::MemoryDrive;
    use crate::io::IO;
    use crate::structure::layout::Layout;

    fn checked_io() -> CheckedIO<MemoryDrive> {
        let io = IO::new(MemoryDrive::new(256 * BLOCK_SIZE, 512)).unwrap();
        let mut disk = CheckedIO::new(io, &Layout::plan(256));
        disk.clear_region().unwrap();
        disk
    }

    #[test]
    fn allocate_first_fit() {
        let mut io = checked_io();
        let map = BlockMap::new(DATA_MAP_INDEX, 20, Resource::DataBlock);
        assert_eq!(map.allocate(&mut io).unwrap(), 0);
        assert_eq!(map.allocate(&mut io).unwrap(), 1);
        assert_eq!(map.allocate(&mut io).unwrap(), 2);
        map.free(&mut io, 1).unwrap();
        assert_eq!(map.is_used(&io, 1).unwrap(), false);
        assert_eq!(map.allocate(&mut io).unwrap(), 1);
        assert_eq!(map.count_used(&io).unwrap(), 3);
        io.verify_block(DATA_MAP_INDEX).unwrap();
    }

    #[test]
    fn exhaustion() {
        let mut io = checked_io();
        let map = BlockMap::new(DATA_MAP_INDEX, 3, Resource::Inode);
        for _ in 0..3 {
            map.allocate(&mut io).unwrap();
        }
        assert!(matches!(map.allocate(&mut io), Err(FsError::ResourceExhausted(Resource::Inode))));
        map.free_all(&mut io, &[0, 2]).unwrap();
        assert_eq!(map.allocate(&mut io).unwrap(), 0);
        assert!(map.free(&mut io, 3).is_err());
    }

    #[test]
    fn bits_are_persisted() {
        let mut io = checked_io();
        let map = BlockMap::new(DATA_MAP_INDEX, 100, Resource::DataBlock);
        for _ in 0..10 {
            map.allocate(&mut io).unwrap();
        }
        let raw = io.read_block(DATA_MAP_INDEX).unwrap();
        assert_eq!(raw[0], 0xFF);
        assert_eq!(raw[1], 0x03);
        assert_eq!(raw[2], 0);
    }
}
