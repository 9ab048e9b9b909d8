use std::{fs::File, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use tinyfs::{storage::FileDevice, tinyfs::TinyFs};

#[derive(Parser)]
struct Args {
    /// Disk image file
    disk_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let disk_file = File::options().read(true).open(args.disk_file)?;
    let device = FileDevice::from_file(disk_file)?;

    let fs = TinyFs::load(device)?;
    fs.check()?;

    let superblock = fs.superblock();
    println!(
        "clean: {} free blocks, {} free inodes, {} directories",
        superblock.free_block_count, superblock.free_inode_count, superblock.dir_inode_count
    );

    Ok(())
}
