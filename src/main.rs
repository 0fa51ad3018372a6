mod cli;

use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use flatfs::consts::BLOCK_SIZE;
use flatfs::util::format::pretty_size_from_bytes;
use flatfs::{FileDrive, OpenFileTable, Result, Volume, Whence};

use cli::{Cli, Command};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("flatfs: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let sector_size = cli.sector_size;
    match cli.command {
        Command::Format { image, size } => {
            let volume = Volume::format(FileDrive::create(&image, size, sector_size)?, size)?;
            let layout = volume.layout();
            println!(
                "{}: {} blocks, {} files max, {} data",
                image.display(),
                layout.block_count,
                layout.max_inodes,
                pretty_size_from_bytes(layout.max_data_blocks * BLOCK_SIZE as u64)
            );
        }
        Command::Info { image } => {
            let volume = Volume::mount(FileDrive::open(&image, sector_size)?)?;
            let layout = volume.layout();
            let usage = volume.usage()?;
            println!("blocks:          {} of {}", layout.used_blocks(), layout.block_count);
            println!("checksum blocks: {} at {}", layout.checksum_blocks, layout.checksum_start());
            println!("inode table:     {} blocks at {}", layout.max_inodes, layout.inode_table_start());
            println!("data:            {} blocks at {}", layout.max_data_blocks, layout.data_start());
            println!("files:           {} of {}", usage.files, usage.max_files);
            println!(
                "space used:      {} of {}",
                pretty_size_from_bytes(usage.data_blocks * BLOCK_SIZE as u64),
                pretty_size_from_bytes(usage.max_data_blocks * BLOCK_SIZE as u64)
            );
        }
        Command::Ls { image } => {
            let volume = Volume::mount(FileDrive::open(&image, sector_size)?)?;
            for (name, _) in volume.files()? {
                let stat = volume.stat(&name)?;
                println!("{:>4} {:>10} {}", stat.inode, pretty_size_from_bytes(stat.size), name);
            }
        }
        Command::Check { image, file } => {
            let volume = Volume::mount(FileDrive::open(&image, sector_size)?)?;
            match file {
                Some(name) => volume.verify_file(&name)?,
                None => volume.verify()?,
            }
            println!("ok");
        }
        Command::Put { image, name, host_file } => {
            let data = fs::read(&host_file)?;
            let mut volume = Volume::mount(FileDrive::open(&image, sector_size)?)?;
            let mut table = OpenFileTable::new();
            volume.create(&name)?;
            let fd = volume.open(&mut table, &name)?;
            volume.write(&mut table, fd, &data)?;
            volume.close(&mut table, fd)?;
        }
        Command::Get { image, name, output } => {
            let volume = Volume::mount(FileDrive::open(&image, sector_size)?)?;
            let mut table = OpenFileTable::new();
            let fd = volume.open(&mut table, &name)?;
            let mut data = vec![0; volume.stat(&name)?.size as usize];
            volume.seek(&mut table, fd, 0, Whence::Start)?;
            let n = volume.read(&mut table, fd, &mut data)?;
            data.truncate(n);
            match output {
                Some(path) => fs::write(path, &data)?,
                None => io::stdout().write_all(&data)?,
            }
        }
        Command::Mount { image, mountpoint } => {
            let volume = Volume::mount(FileDrive::open(&image, sector_size)?)?;
            flatfs::fuse::mount(volume, &mountpoint)?;
        }
    }
    Ok(())
}
