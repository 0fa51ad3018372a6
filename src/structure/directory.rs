use std::fmt;

use crate::consts::{InodePointer, DIRECTORY_ENTRY_SIZE, FILE_NAME_LENGTH, MAX_FILES};
use crate::util::error::{FsError, Result};

const VACANT: i64 = -1;

/// A validated file name: 1..=FILE_NAME_LENGTH bytes of UTF-8, no `/` or NUL.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileName {
    bytes: [u8; FILE_NAME_LENGTH],
    len: usize,
}

impl FileName {
    pub fn new(name: &str) -> Result<FileName> {
        if name.is_empty() || name.len() > FILE_NAME_LENGTH || name.contains(['/', '\0']) {
            return Err(FsError::InvalidName(name.to_string()));
        }
        let mut bytes = [0u8; FILE_NAME_LENGTH];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(FileName { bytes, len: name.len() })
    }

    pub fn as_str(&self) -> &str {
        // only ever built from a &str
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    fn from_raw(raw: &[u8]) -> Result<FileName> {
        let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let name = std::str::from_utf8(&raw[..len])
            .map_err(|_| FsError::Inconsistent("directory entry is not valid UTF-8".to_string()))?;
        FileName::new(name).map_err(|_| FsError::Inconsistent(format!("bad name in directory: {:?}", name)))
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    name: Option<FileName>,
}

/// The flat name → inode map. Slot `i` belongs to inode `i`; removing a file
/// leaves a vacant slot in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    slots: [Slot; MAX_FILES],
    in_use: u64,
}

impl Directory {
    pub fn new() -> Directory {
        Directory { slots: [Slot { name: None }; MAX_FILES], in_use: 0 }
    }

    pub fn len(&self) -> u64 {
        self.in_use
    }

    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    /// Live `(name, inode)` pairs in slot order. Stops after `in_use` entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, InodePointer)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.name.as_ref().map(|name| (name.as_str(), i as InodePointer)))
            .take(self.in_use as usize)
    }

    pub fn lookup(&self, name: &str) -> Option<InodePointer> {
        self.entries().find(|(entry, _)| *entry == name).map(|(_, inode)| inode)
    }

    pub fn insert(&mut self, name: FileName, inode: InodePointer) -> Result<()> {
        let slot = self.slot_mut(inode)?;
        if let Some(existing) = slot.name {
            return Err(FsError::Inconsistent(format!("directory slot {} already holds {:?}", inode, existing)));
        }
        slot.name = Some(name);
        self.in_use += 1;
        log::debug!("directory: {:?} -> inode {}", name, inode);
        Ok(())
    }

    pub fn tombstone(&mut self, inode: InodePointer) -> Result<()> {
        let slot = self.slot_mut(inode)?;
        if slot.name.take().is_none() {
            return Err(FsError::Inconsistent(format!("directory slot {} is already vacant", inode)));
        }
        self.in_use -= 1;
        log::debug!("directory: inode {} vacated", inode);
        Ok(())
    }

    fn slot_mut(&mut self, inode: InodePointer) -> Result<&mut Slot> {
        self.slots
            .get_mut(inode as usize)
            .ok_or_else(|| FsError::Inconsistent(format!("no directory slot for inode {}", inode)))
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(MAX_FILES * DIRECTORY_ENTRY_SIZE);
        for (i, slot) in self.slots.iter().enumerate() {
            match slot.name {
                Some(name) => {
                    bytes.extend_from_slice(&name.bytes);
                    bytes.extend_from_slice(&(i as i64).to_le_bytes());
                }
                None => {
                    bytes.extend_from_slice(&[0; FILE_NAME_LENGTH]);
                    bytes.extend_from_slice(&VACANT.to_le_bytes());
                }
            }
        }
        bytes
    }

    /// Decodes `MAX_FILES` entries; `in_use` must match the live entries found.
    pub(crate) fn from_bytes(bytes: &[u8], in_use: u64) -> Result<Directory> {
        if bytes.len() < MAX_FILES * DIRECTORY_ENTRY_SIZE {
            return Err(FsError::Inconsistent("directory truncated".to_string()));
        }
        let mut directory = Directory::new();
        for (i, entry) in bytes.chunks_exact(DIRECTORY_ENTRY_SIZE).take(MAX_FILES).enumerate() {
            let (name, index) = entry.split_at(FILE_NAME_LENGTH);
            let index = i64::from_le_bytes(index.try_into().unwrap_or_default());
            if index == VACANT {
                continue;
            }
            if index != i as i64 {
                return Err(FsError::Inconsistent(format!("directory slot {} points at inode {}", i, index)));
            }
            directory.slots[i].name = Some(FileName::from_raw(name)?);
            directory.in_use += 1;
        }
        if directory.in_use != in_use {
            return Err(FsError::Inconsistent(format!(
                "superblock counts {} files, directory holds {}",
                in_use, directory.in_use
            )));
        }
        Ok(directory)
    }
}

impl Default for Directory {
    fn default() -> Self {
        Directory::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> FileName {
        FileName::new(s).unwrap()
    }

    #[test]
    fn file_name_rules() {
        assert_eq!(name("test.txt").as_str(), "test.txt");
        assert_eq!(name(&"a".repeat(FILE_NAME_LENGTH)).as_str().len(), FILE_NAME_LENGTH);
        assert!(matches!(FileName::new(""), Err(FsError::InvalidName(_))));
        assert!(matches!(FileName::new(&"a".repeat(FILE_NAME_LENGTH + 1)), Err(FsError::InvalidName(_))));
        assert!(FileName::new("a/b").is_err());
        assert!(FileName::new("a\0b").is_err());
    }

    #[test]
    fn insert_lookup_tombstone() {
        let mut directory = Directory::new();
        directory.insert(name("a"), 0).unwrap();
        directory.insert(name("b"), 4).unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.lookup("b"), Some(4));

        directory.tombstone(0).unwrap();
        assert_eq!(directory.lookup("a"), None);
        assert_eq!(directory.lookup("b"), Some(4));
        assert_eq!(directory.entries().collect::<Vec<_>>(), vec![("b", 4)]);

        assert!(directory.tombstone(0).is_err());
        assert!(directory.insert(name("c"), 4).is_err());
        assert!(directory.insert(name("c"), MAX_FILES as u64).is_err());
    }

    #[test]
    fn encode_decode() {
        let mut directory = Directory::new();
        directory.insert(name("first"), 1).unwrap();
        directory.insert(name("second"), 7).unwrap();
        directory.tombstone(1).unwrap();

        let bytes = directory.to_bytes();
        assert_eq!(bytes.len(), MAX_FILES * DIRECTORY_ENTRY_SIZE);
        assert_eq!(&bytes[FILE_NAME_LENGTH..DIRECTORY_ENTRY_SIZE], &VACANT.to_le_bytes());

        let decoded = Directory::from_bytes(&bytes, 1).unwrap();
        assert_eq!(decoded, directory);
        assert!(Directory::from_bytes(&bytes, 2).is_err());
    }

    #[test]
    fn decode_rejects_misplaced_entry() {
        let mut directory = Directory::new();
        directory.insert(name("x"), 2).unwrap();
        let mut bytes = directory.to_bytes();
        let at = 2 * DIRECTORY_ENTRY_SIZE + FILE_NAME_LENGTH;
        bytes[at..at + 8].copy_from_slice(&5i64.to_le_bytes());
        assert!(Directory::from_bytes(&bytes, 1).is_err());
    }
}
