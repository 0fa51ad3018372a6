use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};
use libc::c_int;

use crate::consts::{InodePointer, BLOCK_SIZE, FILE_NAME_LENGTH, MAX_FILE_SIZE};
use crate::driver::DeviceDriver;
use crate::ops::{Fd, FileStat, OpenFileTable, Volume, Whence};
use crate::util::error::FsError;

const TTL: Duration = Duration::from_secs(1);
const FILE_PERMISSIONS: u16 = 0o644;
const ROOT_PERMISSIONS: u16 = 0o755;

/// Inode numbers handed to the kernel: 1 is the root directory, files
/// start right after it.
const FIRST_FILE_INO: u64 = FUSE_ROOT_ID + 1;

/// One `readdir` entry: inode number, offset of the entry after it, kind, name.
type DirEntry = (u64, i64, FileType, String);

/// Serves a mounted volume as a single flat directory.
pub struct FuseDriver<A: DeviceDriver> {
    volume: Volume<A>,
    table: OpenFileTable,
}

impl<A: DeviceDriver> FuseDriver<A> {
    pub fn new(volume: Volume<A>) -> FuseDriver<A> {
        FuseDriver { volume, table: OpenFileTable::new() }
    }

    fn lookup_stat(&self, parent: u64, name: &OsStr) -> Result<FileStat, c_int> {
        let name = file_name(parent, name)?;
        self.volume.stat(name).map_err(|e| e.errno())
    }

    fn create_file(&mut self, parent: u64, name: &OsStr) -> Result<(FileStat, Fd), c_int> {
        let name = file_name(parent, name)?;
        self.volume.create(name).map_err(|e| e.errno())?;
        let fd = self.volume.open(&mut self.table, name).map_err(|e| e.errno())?;
        let stat = self.volume.stat(name).map_err(|e| e.errno())?;
        Ok((stat, fd))
    }

    /// Entries of the root directory from position `offset` on.
    fn dir_entries(&self, offset: i64) -> Result<Vec<DirEntry>, c_int> {
        let files = self.volume.files().map_err(|e| e.errno())?;
        let dots = [".", ".."].map(|name| (FUSE_ROOT_ID, FileType::Directory, name.to_string()));
        let entries = dots
            .into_iter()
            .chain(files.into_iter().map(|(name, index)| (to_ino(index), FileType::RegularFile, name)))
            .enumerate()
            .skip(offset.max(0) as usize)
            .map(|(i, (ino, kind, name))| (ino, i as i64 + 1, kind, name))
            .collect();
        Ok(entries)
    }

    fn resize(&mut self, ino: u64, size: Option<u64>) -> Result<FileStat, c_int> {
        let index = from_ino(ino)?;
        if let Some(size) = size {
            self.volume.set_len(index, size).map_err(|e| e.errno())?;
        }
        self.volume.stat_inode(index).map_err(|e| e.errno())
    }

    fn read_at(&mut self, fh: u64, offset: i64, size: u32) -> Result<Vec<u8>, c_int> {
        let fd = fh as Fd;
        self.volume.seek(&mut self.table, fd, offset, Whence::Start).map_err(|e| e.errno())?;
        let mut buffer = vec![0; size as usize];
        let n = self.volume.read(&mut self.table, fd, &mut buffer).map_err(|e| e.errno())?;
        buffer.truncate(n);
        Ok(buffer)
    }

    /// Positioned write. A gap between the end of the file and `offset` is
    /// zero-filled first, since the volume itself never leaves holes.
    fn write_at(&mut self, fh: u64, offset: i64, data: &[u8]) -> Result<usize, c_int> {
        let fd = fh as Fd;
        let index = self.table.get(fd).map_err(|e| e.errno())?.inode;
        let offset = u64::try_from(offset).map_err(|_| libc::EINVAL)?;
        if offset + data.len() as u64 > MAX_FILE_SIZE as u64 {
            return Err(libc::EFBIG);
        }

        let size = match self.volume.stat_inode(index) {
            Ok(stat) => stat.size,
            Err(FsError::NotFound(_)) => return Err(libc::EBADF),
            Err(e) => return Err(e.errno()),
        };
        if offset > size {
            self.volume.set_len(index, offset).map_err(|e| e.errno())?;
        }

        self.volume.seek(&mut self.table, fd, offset as i64, Whence::Start).map_err(|e| e.errno())?;
        self.volume.write(&mut self.table, fd, data).map_err(|e| e.errno())
    }
}

impl<A: DeviceDriver> Filesystem for FuseDriver<A> {
    fn destroy(&mut self) {
        log::info!("fuse session ended with {} open files", self.table.len());
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.lookup_stat(parent, name) {
            Ok(stat) => reply.entry(&TTL, &file_attr(req, &stat), 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        if ino == FUSE_ROOT_ID {
            reply.attr(&TTL, &root_attr(req));
            return;
        }
        match from_ino(ino).and_then(|index| self.volume.stat_inode(index).map_err(|e| e.errno())) {
            Ok(stat) => reply.attr(&TTL, &file_attr(req, &stat)),
            Err(errno) => reply.error(errno),
        }
    }

    /// Only the size can change; truncating `echo hi > file` goes through here.
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        if ino == FUSE_ROOT_ID {
            reply.attr(&TTL, &root_attr(req));
            return;
        }
        match self.resize(ino, size) {
            Ok(stat) => reply.attr(&TTL, &file_attr(req, &stat)),
            Err(errno) => reply.error(errno),
        }
    }

    fn readdir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        if ino != FUSE_ROOT_ID {
            reply.error(libc::ENOTDIR);
            return;
        }
        match self.dir_entries(offset) {
            Ok(entries) => {
                for (ino, next, kind, name) in entries {
                    if reply.add(ino, next, kind, name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(errno) => reply.error(errno),
        }
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        match self.create_file(parent, name) {
            Ok((stat, fd)) => reply.created(&TTL, &file_attr(req, &stat), 0, fd as u64, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match file_name(parent, name).and_then(|name| self.volume.remove(name).map_err(|e| e.errno())) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let opened = from_ino(ino).and_then(|index| {
            self.volume.stat_inode(index).map_err(|e| e.errno())?;
            self.table.insert(index).map_err(|e| e.errno())
        });
        match opened {
            Ok(fd) => reply.opened(fd as u64, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.volume.close(&mut self.table, fh as Fd) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_at(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(errno) => reply.error(errno),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.write_at(fh, offset, data) {
            Ok(n) => reply.written(n as u32),
            Err(errno) => reply.error(errno),
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match self.volume.usage() {
            Ok(usage) => {
                let free_blocks = usage.max_data_blocks - usage.data_blocks;
                reply.statfs(
                    usage.max_data_blocks,
                    free_blocks,
                    free_blocks,
                    usage.max_files,
                    usage.max_files - usage.files,
                    BLOCK_SIZE as u32,
                    FILE_NAME_LENGTH as u32,
                    BLOCK_SIZE as u32,
                )
            }
            Err(e) => reply.error(e.errno()),
        }
    }
}

/// Mounts `volume` at `mountpoint` and serves requests until it is unmounted.
pub fn mount<A: DeviceDriver>(volume: Volume<A>, mountpoint: &Path) -> io::Result<()> {
    let options = [MountOption::FSName("flatfs".to_string()), MountOption::DefaultPermissions];
    log::info!("mounting at {}", mountpoint.display());
    fuser::mount2(FuseDriver::new(volume), mountpoint, &options)
}

fn file_attr(req: &Request<'_>, stat: &FileStat) -> FileAttr {
    FileAttr {
        ino: to_ino(stat.inode),
        size: stat.size,
        blocks: stat.blocks * (BLOCK_SIZE as u64 / 512),
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind: FileType::RegularFile,
        perm: FILE_PERMISSIONS,
        nlink: 1,
        uid: req.uid(),
        gid: req.gid(),
        rdev: 0,
        flags: 0,
        blksize: BLOCK_SIZE as u32,
    }
}

fn root_attr(req: &Request<'_>) -> FileAttr {
    FileAttr {
        ino: FUSE_ROOT_ID,
        size: 0,
        blocks: 0,
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind: FileType::Directory,
        perm: ROOT_PERMISSIONS,
        nlink: 2,
        uid: req.uid(),
        gid: req.gid(),
        rdev: 0,
        flags: 0,
        blksize: BLOCK_SIZE as u32,
    }
}

fn to_ino(index: InodePointer) -> u64 {
    index + FIRST_FILE_INO
}

fn from_ino(ino: u64) -> Result<InodePointer, c_int> {
    ino.checked_sub(FIRST_FILE_INO).ok_or(libc::ENOENT)
}

fn file_name(parent: u64, name: &OsStr) -> Result<&str, c_int> {
    if parent != FUSE_ROOT_ID {
        return Err(libc::ENOENT);
    }
    name.to_str().ok_or(libc::EINVAL)
}
