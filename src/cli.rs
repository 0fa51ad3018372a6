use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flatfs", version, about = "Flat single-directory file system images")]
pub struct Cli {
    /// Sector size of the image file
    #[arg(long, global = true, default_value_t = 512)]
    pub sector_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new image and format it
    Format {
        image: PathBuf,
        /// Image size in bytes
        #[arg(long, short)]
        size: u64,
    },
    /// Show layout and usage
    Info { image: PathBuf },
    /// List files with their sizes
    Ls { image: PathBuf },
    /// Verify checksums of the metadata, or of a single file
    Check {
        image: PathBuf,
        #[arg(long, short)]
        file: Option<String>,
    },
    /// Copy a host file into the image
    Put { image: PathBuf, name: String, host_file: PathBuf },
    /// Copy a file out of the image, to stdout unless --output is given
    Get {
        image: PathBuf,
        name: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Serve the image through FUSE until unmounted
    Mount { image: PathBuf, mountpoint: PathBuf },
}
