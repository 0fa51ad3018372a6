use crate::consts::{InodePointer, MAX_OPEN_FILES};
use crate::util::error::{FsError, Resource, Result};

pub type Fd = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub inode: InodePointer,
    /// May point past the end of the file; reads and writes clamp it.
    pub offset: i64,
}

/// Descriptor table. A descriptor is the index of its slot.
///
/// Owned by the caller and handed to every file operation; there is no
/// locking, one caller at a time.
#[derive(Debug, Clone)]
pub struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
}

impl OpenFileTable {
    pub fn new() -> OpenFileTable {
        OpenFileTable::with_capacity(MAX_OPEN_FILES)
    }

    pub fn with_capacity(capacity: usize) -> OpenFileTable {
        OpenFileTable { slots: vec![None; capacity] }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the first free slot.
    pub fn insert(&mut self, inode: InodePointer) -> Result<Fd> {
        let fd = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::ResourceExhausted(Resource::FileDescriptor))?;
        self.slots[fd] = Some(OpenFile { inode, offset: 0 });
        Ok(fd)
    }

    pub fn get(&self, fd: Fd) -> Result<&OpenFile> {
        self.slots.get(fd).and_then(Option::as_ref).ok_or(FsError::InvalidDescriptor(fd))
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.slots.get_mut(fd).and_then(Option::as_mut).ok_or(FsError::InvalidDescriptor(fd))
    }

    pub fn remove(&mut self, fd: Fd) -> Result<OpenFile> {
        self.slots.get_mut(fd).and_then(Option::take).ok_or(FsError::InvalidDescriptor(fd))
    }
}

impl Default for OpenFileTable {
    fn default() -> Self {
        OpenFileTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut table = OpenFileTable::with_capacity(2);
        let a = table.insert(7).unwrap();
        let b = table.insert(7).unwrap();
        assert_ne!(a, b);
        assert!(matches!(table.insert(1), Err(FsError::ResourceExhausted(Resource::FileDescriptor))));

        table.get_mut(a).unwrap().offset = 40;
        assert_eq!(table.get(b).unwrap().offset, 0);

        assert_eq!(table.remove(a).unwrap(), OpenFile { inode: 7, offset: 40 });
        assert!(matches!(table.get(a), Err(FsError::InvalidDescriptor(_))));
        assert!(table.remove(a).is_err());
        assert_eq!(table.insert(3).unwrap(), a);
    }

    #[test]
    fn out_of_range_descriptor() {
        let mut table = OpenFileTable::new();
        assert_eq!(table.capacity(), MAX_OPEN_FILES);
        assert!(table.is_empty());
        assert!(matches!(table.get(MAX_OPEN_FILES + 3), Err(FsError::InvalidDescriptor(_))));
        assert!(table.remove(usize::MAX).is_err());
    }
}
