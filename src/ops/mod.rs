use crate::consts::{BlockPointer, BLOCK_SIZE, DATA_MAP_INDEX, INODE_MAP_INDEX, SUPERBLOCK_INDEX};
use crate::driver::DeviceDriver;
use crate::integrity::CheckedIO;
use crate::io::IO;
use crate::structure::layout::Layout;
use crate::structure::superblock::SuperBlock;
use crate::structure::Structure;
use crate::util::error::{FsError, Result};
use crate::util::serializable::ByteSerializable;

mod directory;
mod file;
pub mod open_file_table;

pub use directory::FileStat;
pub use file::Whence;
pub use open_file_table::{Fd, OpenFile, OpenFileTable};

/// Allocation counters of a mounted volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub files: u64,
    pub max_files: u64,
    pub data_blocks: u64,
    pub max_data_blocks: u64,
}

/// A mounted volume. Every file operation goes through this handle.
pub struct Volume<A: DeviceDriver> {
    disk: CheckedIO<A>,
    structure: Structure,
}

impl<A: DeviceDriver> Volume<A> {
    /// Lays out a fresh file system over the first `capacity` bytes of
    /// `device` and mounts it.
    pub fn format(device: A, capacity: u64) -> Result<Volume<A>> {
        let io = IO::new(device)?;
        let block_count = capacity / BLOCK_SIZE as u64;
        if block_count > io.block_count {
            return Err(FsError::Inconsistent(format!(
                "capacity of {} blocks exceeds the device ({} blocks)",
                block_count, io.block_count
            )));
        }

        let layout = Layout::plan(block_count);
        if layout.max_inodes == 0 {
            return Err(FsError::DeviceTooSmall { blocks: block_count });
        }

        let structure = Structure::new(layout);
        let mut disk = CheckedIO::new(io, &layout);
        disk.clear_region()?;

        let zero = vec![0; BLOCK_SIZE];
        disk.write_block(INODE_MAP_INDEX, &zero)?;
        disk.write_block(DATA_MAP_INDEX, &zero)?;
        structure.inode_table.create(&mut disk)?;
        SuperBlock::new(layout).write(&mut disk)?;

        log::info!(
            "formatted {} blocks: {} checksum blocks, {} inodes, {} data blocks",
            layout.block_count,
            layout.checksum_blocks,
            layout.max_inodes,
            layout.max_data_blocks
        );
        Ok(Volume { disk, structure })
    }

    pub fn mount(device: A) -> Result<Volume<A>> {
        let io = IO::new(device)?;
        let superblock = SuperBlock::from_bytes(&io.read_block(SUPERBLOCK_INDEX)?)?;
        let layout = superblock.layout;

        if superblock.block_size != BLOCK_SIZE {
            return Err(FsError::Inconsistent(format!("unsupported block size {}", superblock.block_size)));
        }
        if layout != Layout::plan(layout.block_count) || !layout.is_consistent() {
            return Err(FsError::Inconsistent(format!("layout {:?} does not match its block count", layout)));
        }
        if layout.block_count > io.block_count {
            return Err(FsError::Inconsistent(format!(
                "volume of {} blocks on a device of {} blocks",
                layout.block_count, io.block_count
            )));
        }

        log::info!("mounted volume with {} of {} files", superblock.inodes_in_use(), layout.max_inodes);
        Ok(Volume { disk: CheckedIO::new(io, &layout), structure: Structure::new(layout) })
    }

    /// Releases the device. Descriptors of an open file table are not
    /// touched; they are meaningless after this.
    pub fn unmount(self) -> A {
        log::info!("unmounted volume");
        self.disk.into_inner().into_device()
    }

    pub fn layout(&self) -> Layout {
        self.structure.layout
    }

    pub fn usage(&self) -> Result<Usage> {
        let layout = self.structure.layout;
        Ok(Usage {
            files: self.structure.inode_map.count_used(&self.disk)?,
            max_files: layout.max_inodes,
            data_blocks: self.structure.data_map.count_used(&self.disk)?,
            max_data_blocks: layout.max_data_blocks,
        })
    }

    /// Checks the superblock, both bitmaps and the whole inode table.
    pub fn verify(&self) -> Result<()> {
        let metadata = [SUPERBLOCK_INDEX, INODE_MAP_INDEX, DATA_MAP_INDEX];
        for block in metadata.into_iter().chain(self.structure.inode_table.blocks()) {
            self.disk.verify_block(block)?;
        }
        Ok(())
    }

    /// Checks the inode record of `name` and every data block it owns.
    pub fn verify_file(&self, name: &str) -> Result<()> {
        let index = self.lookup(name)?;
        self.disk.verify_block(self.structure.inode_table.inode_block(index)?)?;
        let inode = self.structure.inode_table.read_inode(&self.disk, index)?;
        for &pointer in inode.blocks() {
            self.disk.verify_block(self.structure.data_block(pointer))?;
        }
        Ok(())
    }

    fn superblock(&self) -> Result<SuperBlock> {
        SuperBlock::read(&self.disk)
    }

    fn data_block(&self, pointer: BlockPointer) -> BlockPointer {
        self.structure.data_block(pointer)
    }
}
