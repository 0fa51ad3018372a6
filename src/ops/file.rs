use crate::consts::{InodePointer, BLOCK_SIZE, MAX_FILE_SIZE};
use crate::driver::DeviceDriver;
use crate::ops::{Fd, OpenFileTable, Volume};
use crate::structure::inode::Inode;
use crate::util::error::{FsError, Result};

/// Base position for `seek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl<A: DeviceDriver> Volume<A> {
    pub fn open(&self, table: &mut OpenFileTable, name: &str) -> Result<Fd> {
        let index = self.lookup(name)?;
        let fd = table.insert(index)?;
        log::debug!("opened {:?} (inode {}) as fd {}", name, index, fd);
        Ok(fd)
    }

    pub fn close(&self, table: &mut OpenFileTable, fd: Fd) -> Result<()> {
        table.remove(fd)?;
        log::debug!("closed fd {}", fd);
        Ok(())
    }

    /// Reads from the descriptor's offset into `buffer` and returns the
    /// number of bytes read, 0 at or past end of file. The offset moves on by
    /// exactly that count.
    pub fn read(&self, table: &mut OpenFileTable, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        let file = *table.get(fd)?;
        let inode = self.open_inode(fd, file.inode)?;

        let size = inode.size();
        let start = clamp_offset(file.offset, size);
        let count = buffer.len().min((size - start) as usize);

        let mut done = 0;
        while done < count {
            let position = start as usize + done;
            let (logical, within) = (position / BLOCK_SIZE, position % BLOCK_SIZE);
            let pointer = inode.blocks.get(logical).ok_or_else(|| {
                FsError::Inconsistent(format!("inode {} has no block {} below its size", inode.id(), logical))
            })?;

            let block = self.disk.read_block(self.data_block(pointer))?;
            let chunk = (BLOCK_SIZE - within).min(count - done);
            buffer[done..done + chunk].copy_from_slice(&block[within..within + chunk]);
            done += chunk;
        }

        table.get_mut(fd)?.offset = file.offset.saturating_add(count as i64);
        Ok(count)
    }

    /// Writes `data` at the descriptor's offset, growing the file as needed.
    /// An offset outside the file is clamped to it, so files have no holes;
    /// the descriptor's offset still moves on by `data.len()` from where it
    /// was.
    ///
    /// If a block cannot be allocated or written halfway through, the inode
    /// is still persisted with everything written so far and the offset is
    /// left where it was.
    pub fn write(&mut self, table: &mut OpenFileTable, fd: Fd, data: &[u8]) -> Result<usize> {
        let file = *table.get(fd)?;
        let mut inode = self.open_inode(fd, file.inode)?;

        let start = clamp_offset(file.offset, inode.size());
        let end = start + data.len() as u64;
        if end > MAX_FILE_SIZE as u64 {
            return Err(FsError::FileTooLarge { max: MAX_FILE_SIZE });
        }

        let mut done = 0;
        let result = self.write_blocks(&mut inode, start, data, &mut done);
        inode.grow_to(start + done as u64);
        self.structure.inode_table.write_inode(&mut self.disk, &inode)?;
        result?;

        table.get_mut(fd)?.offset = file.offset.saturating_add(data.len() as i64);
        log::trace!("fd {}: wrote {} bytes at {}, size now {}", fd, data.len(), start, inode.size());
        Ok(data.len())
    }

    /// Moves the descriptor's offset. The result is not clamped; reads and
    /// writes clamp it later.
    pub fn seek(&self, table: &mut OpenFileTable, fd: Fd, offset: i64, whence: Whence) -> Result<i64> {
        let file = *table.get(fd)?;
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => file.offset,
            Whence::End => self.open_inode(fd, file.inode)?.size() as i64,
        };
        let position = base.checked_add(offset).ok_or(FsError::InvalidSeek)?;
        table.get_mut(fd)?.offset = position;
        Ok(position)
    }

    /// Sets the length of a file. Shrinking releases the blocks past the new
    /// end; growing fills the gap with zeros.
    pub fn set_len(&mut self, index: InodePointer, size: u64) -> Result<()> {
        if size > MAX_FILE_SIZE as u64 {
            return Err(FsError::FileTooLarge { max: MAX_FILE_SIZE });
        }
        let mut inode = self.live_inode(index)?.ok_or_else(|| FsError::NotFound(format!("inode {}", index)))?;
        let old_size = inode.size();

        if size <= old_size {
            let released = inode.shrink_to(size);
            self.structure.data_map.free_all(&mut self.disk, &released)?;
            self.structure.inode_table.write_inode(&mut self.disk, &inode)?;
            log::debug!("inode {} shrunk from {} to {} bytes", index, old_size, size);
            return Ok(());
        }

        let zeros = vec![0; (size - old_size) as usize];
        let mut done = 0;
        let result = self.write_blocks(&mut inode, old_size, &zeros, &mut done);
        inode.grow_to(old_size + done as u64);
        self.structure.inode_table.write_inode(&mut self.disk, &inode)?;
        result?;
        log::debug!("inode {} zero-filled from {} to {} bytes", index, old_size, size);
        Ok(())
    }

    fn write_blocks(&mut self, inode: &mut Inode, start: u64, data: &[u8], done: &mut usize) -> Result<()> {
        while *done < data.len() {
            let position = start as usize + *done;
            let (logical, within) = (position / BLOCK_SIZE, position % BLOCK_SIZE);
            let chunk = (BLOCK_SIZE - within).min(data.len() - *done);

            let (pointer, mut block) = match inode.blocks.get(logical) {
                Some(pointer) if chunk < BLOCK_SIZE => (pointer, self.disk.read_block(self.data_block(pointer))?),
                Some(pointer) => (pointer, vec![0; BLOCK_SIZE]),
                None => {
                    let pointer = self.structure.data_map.allocate(&mut self.disk)?;
                    inode.map_block(logical, pointer)?;
                    (pointer, vec![0; BLOCK_SIZE])
                }
            };

            block[within..within + chunk].copy_from_slice(&data[*done..*done + chunk]);
            let target = self.data_block(pointer);
            self.disk.write_block(target, &block)?;
            *done += chunk;
        }
        Ok(())
    }

    /// Inode behind an open descriptor; the file may have been removed since.
    fn open_inode(&self, fd: Fd, index: InodePointer) -> Result<Inode> {
        self.live_inode(index)?.ok_or(FsError::InvalidDescriptor(fd))
    }

    /// `None` if `index` is out of range or not allocated.
    fn live_inode(&self, index: InodePointer) -> Result<Option<Inode>> {
        if index >= self.structure.layout.max_inodes || !self.structure.inode_map.is_used(&self.disk, index)? {
            return Ok(None);
        }
        self.structure.inode_table.read_inode(&self.disk, index).map(Some)
    }
}

fn clamp_offset(offset: i64, size: u64) -> u64 {
    offset.max(0).min(size as i64) as u64
}
