use std::fmt;
use std::io;
use std::os::raw::c_int;

use thiserror::Error;

use crate::consts::BlockPointer;
use crate::ops::Fd;

type ErrorNum = c_int;

/// What ran out when an allocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Inode,
    DataBlock,
    FileDescriptor,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Inode => write!(f, "inodes"),
            Resource::DataBlock => write!(f, "data blocks"),
            Resource::FileDescriptor => write!(f, "file descriptors"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file: {0}")]
    NotFound(String),
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("no free {0} left")]
    ResourceExhausted(Resource),
    #[error("file descriptor {0} is not open")]
    InvalidDescriptor(Fd),
    #[error("file would exceed the maximum size of {max} bytes")]
    FileTooLarge { max: usize },
    #[error("seek position out of range")]
    InvalidSeek,
    #[error("checksum mismatch in block {block}")]
    Corrupt { block: BlockPointer },
    #[error("device of {blocks} blocks is too small to hold a single file")]
    DeviceTooSmall { blocks: u64 },
    #[error("inconsistent file system: {0}")]
    Inconsistent(String),
    #[error("failed to write block {block}")]
    WriteFailed {
        block: BlockPointer,
        #[source]
        source: io::Error,
    },
    #[error("failed to write checksum of block {block}")]
    ChecksumWriteFailed {
        block: BlockPointer,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FsError {
    /// The errno reported to the kernel when this error ends a FUSE request.
    pub fn errno(&self) -> ErrorNum {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::AlreadyExists(_) => libc::EEXIST,
            FsError::InvalidName(name) if name.len() > crate::consts::FILE_NAME_LENGTH => libc::ENAMETOOLONG,
            FsError::InvalidName(_) => libc::EINVAL,
            FsError::ResourceExhausted(Resource::FileDescriptor) => libc::EMFILE,
            FsError::ResourceExhausted(_) => libc::ENOSPC,
            FsError::InvalidDescriptor(_) => libc::EBADF,
            FsError::FileTooLarge { .. } => libc::EFBIG,
            FsError::InvalidSeek => libc::EINVAL,
            FsError::Corrupt { .. } | FsError::Inconsistent(_) => libc::EIO,
            FsError::DeviceTooSmall { .. } => libc::ENOSPC,
            FsError::WriteFailed { .. } | FsError::ChecksumWriteFailed { .. } => libc::EIO,
            FsError::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
