use crate::consts::{BlockPointer, InodePointer};
use crate::driver::DeviceDriver;
use crate::integrity::CheckedIO;
use crate::structure::inode::Inode;
use crate::util::error::{FsError, Result};
use crate::util::serializable::ByteSerializable;

/// One inode per block, starting at `table_index`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InodeTable {
    table_index: BlockPointer,
    pub(crate) inode_count: u64,
}

impl InodeTable {
    pub fn new(table_index: BlockPointer, inode_count: u64) -> InodeTable {
        InodeTable { table_index, inode_count }
    }

    /// Writes an empty record into every slot.
    pub fn create<A: DeviceDriver>(&self, io: &mut CheckedIO<A>) -> Result<()> {
        for index in 0..self.inode_count {
            self.write_inode(io, &Inode::new(index))?;
        }
        Ok(())
    }

    pub fn read_inode<A: DeviceDriver>(&self, io: &CheckedIO<A>, index: InodePointer) -> Result<Inode> {
        let block = io.read_block(self.inode_block(index)?)?;
        Inode::from_block(index, &block)
    }

    pub fn write_inode<A: DeviceDriver>(&self, io: &mut CheckedIO<A>, inode: &Inode) -> Result<()> {
        io.write_block(self.inode_block(inode.id)?, &inode.to_bytes())
    }

    #[inline]
    pub fn inode_block(&self, index: InodePointer) -> Result<BlockPointer> {
        if index >= self.inode_count {
            return Err(FsError::Inconsistent(format!("inode {} out of range ({})", index, self.inode_count)));
        }
        Ok(self.table_index + index)
    }

    pub fn blocks(&self) -> std::ops::Range<BlockPointer> {
        self.table_index..self.table_index + self.inode_count
    }
}
