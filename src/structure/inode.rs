use std::mem::size_of;

use crate::consts::{BlockPointer, DirectPointers, InodePointer, BLOCK_SIZE, DIRECT_POINTERS, MAX_FILE_SIZE};
use crate::util::error::{FsError, Result};
use crate::util::serializable::ByteSerializable;

const NULL_POINTER: BlockPointer = 0;

/// Ordered, bounds-checked list of data block indices.
/// Logical block `k` of a file is `pointers[k]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockList {
    pointers: DirectPointers,
    used: usize,
}

impl BlockList {
    pub fn new() -> BlockList {
        BlockList { pointers: [NULL_POINTER; DIRECT_POINTERS], used: 0 }
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn get(&self, logical: usize) -> Option<BlockPointer> {
        self.as_slice().get(logical).copied()
    }

    pub fn as_slice(&self) -> &[BlockPointer] {
        &self.pointers[..self.used]
    }

    /// Drops every pointer from position `len` on and returns them.
    pub fn truncate(&mut self, len: usize) -> Vec<BlockPointer> {
        if len >= self.used {
            return Vec::new();
        }
        let dropped = self.pointers[len..self.used].to_vec();
        self.pointers[len..self.used].fill(NULL_POINTER);
        self.used = len;
        dropped
    }

    pub fn push(&mut self, pointer: BlockPointer) -> Result<()> {
        if self.used >= DIRECT_POINTERS {
            return Err(FsError::FileTooLarge { max: MAX_FILE_SIZE });
        }
        self.pointers[self.used] = pointer;
        self.used += 1;
        Ok(())
    }
}

impl Default for BlockList {
    fn default() -> Self {
        BlockList::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub(crate) id: InodePointer,
    pub(crate) size: u64,
    pub(crate) blocks: BlockList,
}

impl Inode {
    pub fn new(id: InodePointer) -> Inode {
        Inode { id, size: 0, blocks: BlockList::new() }
    }

    pub fn id(&self) -> InodePointer {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[BlockPointer] {
        self.blocks.as_slice()
    }

    /// Maps logical block `logical` to data block `pointer`. Positions are
    /// filled in order: overwriting is fine, skipping one is not.
    pub fn map_block(&mut self, logical: usize, pointer: BlockPointer) -> Result<()> {
        match logical.cmp(&self.blocks.len()) {
            std::cmp::Ordering::Less => {
                self.blocks.pointers[logical] = pointer;
                Ok(())
            }
            std::cmp::Ordering::Equal => self.blocks.push(pointer),
            std::cmp::Ordering::Greater => Err(FsError::Inconsistent(format!(
                "inode {} has {} blocks, cannot map logical block {}",
                self.id,
                self.blocks.len(),
                logical
            ))),
        }
    }

    pub fn grow_to(&mut self, size: u64) {
        self.size = self.size.max(size);
    }

    /// Shrinks the file to `size` bytes, keeping only the blocks still
    /// covered. Returns the released pointers.
    pub fn shrink_to(&mut self, size: u64) -> Vec<BlockPointer> {
        if size >= self.size {
            return Vec::new();
        }
        self.size = size;
        self.blocks.truncate(size.div_ceil(BLOCK_SIZE as u64) as usize)
    }

    #[inline]
    pub fn size_on_disk() -> usize {
        2 * size_of::<u64>() + size_of::<DirectPointers>()
    }

    pub(crate) fn from_block(id: InodePointer, bytes: &[u8]) -> Result<Inode> {
        let mut inode = Inode::from_bytes(bytes)?;
        inode.id = id;
        Ok(inode)
    }
}

impl ByteSerializable for Inode {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(BLOCK_SIZE);
        bytes.extend_from_slice(&self.size.to_le_bytes());
        bytes.extend_from_slice(&(self.blocks.len() as u64).to_le_bytes());
        for pointer in self.blocks.pointers {
            bytes.extend_from_slice(&pointer.to_le_bytes());
        }
        bytes.resize(BLOCK_SIZE, 0);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Inode::size_on_disk() {
            return Err(FsError::Inconsistent("inode record truncated".to_string()));
        }
        let word = |i: usize| u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap_or_default());

        let size = word(0);
        let used = word(1) as usize;
        if used > DIRECT_POINTERS || size > (used * BLOCK_SIZE) as u64 {
            return Err(FsError::Inconsistent(format!("inode claims {} bytes in {} blocks", size, used)));
        }

        let mut pointers = [NULL_POINTER; DIRECT_POINTERS];
        for (i, pointer) in pointers.iter_mut().enumerate() {
            *pointer = word(2 + i);
        }

        Ok(Inode { id: 0, size, blocks: BlockList { pointers, used } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_to_bytes() {
        let mut inode = Inode::new(42);
        for (i, pointer) in [7, 3, 9].into_iter().enumerate() {
            inode.map_block(i, pointer).unwrap();
        }
        inode.grow_to(2 * BLOCK_SIZE as u64 + 5);

        let bytes = inode.to_bytes();
        assert_eq!(bytes.len(), BLOCK_SIZE);
        assert_eq!(&bytes[8..16], &3u64.to_le_bytes());

        let read = Inode::from_block(42, &bytes).unwrap();
        assert_eq!(read, inode);
        assert_eq!(read.blocks(), &[7, 3, 9]);
    }

    #[test]
    fn zeroed_record_is_empty_file() {
        let inode = Inode::from_block(3, &vec![0; BLOCK_SIZE]).unwrap();
        assert_eq!(inode, Inode::new(3));
    }

    #[test]
    fn map_block_rules() {
        let mut inode = Inode::new(0);
        assert!(inode.map_block(1, 5).is_err());
        inode.map_block(0, 5).unwrap();
        inode.map_block(0, 6).unwrap();
        assert_eq!(inode.blocks(), &[6]);

        for i in 1..DIRECT_POINTERS {
            inode.map_block(i, i as u64).unwrap();
        }
        assert!(matches!(inode.map_block(DIRECT_POINTERS, 99), Err(FsError::FileTooLarge { .. })));
    }

    #[test]
    fn rejects_garbage() {
        let mut bytes = vec![0; BLOCK_SIZE];
        bytes[8] = 200;
        assert!(Inode::from_bytes(&bytes).is_err());

        let mut bytes = vec![0; BLOCK_SIZE];
        bytes[0] = 1;
        assert!(Inode::from_bytes(&bytes).is_err());
    }

    #[test]
    fn shrink_releases_trailing_blocks() {
        let mut inode = Inode::new(1);
        for (i, pointer) in [4, 8, 15].into_iter().enumerate() {
            inode.map_block(i, pointer).unwrap();
        }
        inode.grow_to(2 * BLOCK_SIZE as u64 + 1);

        assert!(inode.shrink_to(3 * BLOCK_SIZE as u64).is_empty());
        assert_eq!(inode.shrink_to(BLOCK_SIZE as u64 + 1), vec![15]);
        assert_eq!(inode.blocks(), &[4, 8]);
        assert_eq!(inode.shrink_to(0), vec![4, 8]);
        assert_eq!(inode, Inode::new(1));
    }

    #[test]
    fn grow_never_shrinks() {
        let mut inode = Inode::new(0);
        inode.grow_to(100);
        inode.grow_to(10);
        assert_eq!(inode.size(), 100);
    }
}
