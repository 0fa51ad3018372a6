use crate::consts::{BlockPointer, DATA_MAP_INDEX, INODE_MAP_INDEX};
use crate::structure::blockmap::BlockMap;
use crate::structure::inode_table::InodeTable;
use crate::structure::layout::Layout;
use crate::util::error::Resource;

pub(crate) mod blockmap;
pub mod directory;
pub mod inode;
pub(crate) mod inode_table;
pub mod layout;
pub mod superblock;

/// On-disk structures of a mounted volume, located from its layout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Structure {
    pub layout: Layout,
    pub inode_map: BlockMap,
    pub data_map: BlockMap,
    pub inode_table: InodeTable,
}

impl Structure {
    pub fn new(layout: Layout) -> Structure {
        Structure {
            layout,
            inode_map: BlockMap::new(INODE_MAP_INDEX, layout.max_inodes, Resource::Inode),
            data_map: BlockMap::new(DATA_MAP_INDEX, layout.max_data_blocks, Resource::DataBlock),
            inode_table: InodeTable::new(layout.inode_table_start(), layout.max_inodes),
        }
    }

    /// Device block holding data block `pointer`.
    #[inline]
    pub fn data_block(&self, pointer: BlockPointer) -> BlockPointer {
        self.layout.data_start() + pointer
    }
}
