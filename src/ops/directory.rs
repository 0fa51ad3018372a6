use crate::consts::{BlockPointer, InodePointer};
use crate::driver::DeviceDriver;
use crate::ops::Volume;
use crate::structure::directory::FileName;
use crate::structure::inode::Inode;
use crate::util::error::{FsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub inode: InodePointer,
    pub size: u64,
    pub blocks: u64,
}

impl From<&Inode> for FileStat {
    fn from(inode: &Inode) -> Self {
        FileStat { inode: inode.id(), size: inode.size(), blocks: inode.block_count() as u64 }
    }
}

impl<A: DeviceDriver> Volume<A> {
    /// Creates an empty file and returns its inode.
    pub fn create(&mut self, name: &str) -> Result<InodePointer> {
        let file_name = FileName::new(name)?;
        let mut superblock = self.superblock()?;
        if superblock.directory.lookup(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let index = self.structure.inode_map.allocate(&mut self.disk)?;
        self.structure.inode_table.write_inode(&mut self.disk, &Inode::new(index))?;
        superblock.directory.insert(file_name, index)?;
        superblock.write(&mut self.disk)?;

        log::info!("created {:?} as inode {}", name, index);
        Ok(index)
    }

    /// Deletes a file. Its data blocks are released before its inode so that
    /// an interrupted removal never leaves an inode pointing at free blocks.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let mut superblock = self.superblock()?;
        let index = superblock.directory.lookup(name).ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let inode = self.structure.inode_table.read_inode(&self.disk, index)?;

        self.structure.data_map.free_all(&mut self.disk, inode.blocks())?;
        self.structure.inode_table.write_inode(&mut self.disk, &Inode::new(index))?;
        self.structure.inode_map.free(&mut self.disk, index)?;
        superblock.directory.tombstone(index)?;
        superblock.write(&mut self.disk)?;

        log::info!("removed {:?} (inode {}, {} blocks)", name, index, inode.block_count());
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<InodePointer> {
        self.superblock()?
            .directory
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    pub fn stat(&self, name: &str) -> Result<FileStat> {
        let index = self.lookup(name)?;
        Ok(FileStat::from(&self.structure.inode_table.read_inode(&self.disk, index)?))
    }

    /// Stat by inode index; fails with `NotFound` if the inode is not in use.
    pub fn stat_inode(&self, index: InodePointer) -> Result<FileStat> {
        if index >= self.structure.layout.max_inodes || !self.structure.inode_map.is_used(&self.disk, index)? {
            return Err(FsError::NotFound(format!("inode {}", index)));
        }
        Ok(FileStat::from(&self.structure.inode_table.read_inode(&self.disk, index)?))
    }

    /// All files with their inodes, in directory order.
    pub fn files(&self) -> Result<Vec<(String, InodePointer)>> {
        let superblock = self.superblock()?;
        Ok(superblock.directory.entries().map(|(name, index)| (name.to_string(), index)).collect())
    }

    /// Device blocks holding the file's data, in file order.
    pub fn file_blocks(&self, name: &str) -> Result<Vec<BlockPointer>> {
        let index = self.lookup(name)?;
        let inode = self.structure.inode_table.read_inode(&self.disk, index)?;
        Ok(inode.blocks().iter().map(|&pointer| self.data_block(pointer)).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::MAX_FILES;
    use crate::ops::tests::volume;
    use crate::util::error::{FsError, Resource};

    #[test]
    fn create_allocates_inode() {
        let mut volume = volume();
        let index = volume.create("test.txt").unwrap();
        assert_eq!(volume.lookup("test.txt").unwrap(), index);
        assert!(volume.structure.inode_map.is_used(&volume.disk, index).unwrap());
        assert_eq!(volume.stat("test.txt").unwrap().size, 0);
        assert!(matches!(volume.create("test.txt"), Err(FsError::AlreadyExists(_))));
        volume.verify().unwrap();
    }

    #[test]
    fn create_rejects_bad_names() {
        let mut volume = volume();
        assert!(matches!(volume.create(&"n".repeat(33)), Err(FsError::InvalidName(_))));
        assert!(matches!(volume.create(""), Err(FsError::InvalidName(_))));
        assert_eq!(volume.usage().unwrap().files, 0);
    }

    #[test]
    fn remove_frees_inode() {
        let mut volume = volume();
        let index = volume.create("test.txt").unwrap();
        volume.remove("test.txt").unwrap();
        assert!(!volume.structure.inode_map.is_used(&volume.disk, index).unwrap());
        assert!(matches!(volume.remove("test.txt"), Err(FsError::NotFound(_))));
        assert!(matches!(volume.lookup("test.txt"), Err(FsError::NotFound(_))));
        assert!(volume.stat_inode(index).is_err());
    }

    #[test]
    fn tombstones_are_skipped() {
        let mut volume = volume();
        volume.create("a").unwrap();
        volume.create("b").unwrap();
        volume.create("c").unwrap();
        volume.remove("a").unwrap();

        let names: Vec<_> = volume.files().unwrap().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(volume.lookup("c").unwrap(), 2);

        // the vacated slot is reused first
        assert_eq!(volume.create("d").unwrap(), 0);
    }

    #[test]
    fn inode_exhaustion() {
        let mut volume = volume();
        for i in 0..MAX_FILES {
            volume.create(&format!("file{}", i)).unwrap();
        }
        assert!(matches!(volume.create("overflow"), Err(FsError::ResourceExhausted(Resource::Inode))));
        volume.remove("file7").unwrap();
        assert_eq!(volume.create("overflow").unwrap(), 7);
    }
}
