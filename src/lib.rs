//! flatfs: a single-directory file system on a block device.
//!
//! A volume is formatted over a [`DeviceDriver`], mounted into a [`Volume`]
//! and used through file descriptors kept in an [`OpenFileTable`] owned by
//! the caller. Every block written carries a CRC-16 so corruption can be
//! found per file or across the whole volume.

pub mod consts;
pub mod driver;
pub mod fuse;
pub(crate) mod integrity;
pub(crate) mod io;
pub mod ops;
pub mod structure;
pub mod util;

pub use driver::file_drive::FileDrive;
pub use driver::memory_drive::MemoryDrive;
pub use driver::DeviceDriver;
pub use integrity::crc16;
pub use ops::{Fd, FileStat, OpenFile, OpenFileTable, Usage, Volume, Whence};
pub use structure::layout::Layout;
pub use util::error::{FsError, Resource, Result};
