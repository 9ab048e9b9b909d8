use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use tinyfs::shell::Shell;
use tinyfs::storage::FileDevice;
use tinyfs::tinyfs::TinyFs;

#[derive(Parser)]
struct Args {
    /// Disk image file, created if it does not exist
    disk_file: PathBuf,
    /// Reinitialize the volume even if it already holds a filesystem
    #[arg(long)]
    format: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let device = FileDevice::open(&args.disk_file).context("unable to open disk file")?;
    let fs = if args.format {
        TinyFs::format(device)?
    } else {
        TinyFs::mount(device)?
    };

    let mut shell = Shell::new(fs, io::stdout());

    let mut stdin = io::stdin().lock();
    let mut line = String::new();
    loop {
        print!("=> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let argv = line.split_whitespace().collect::<Vec<_>>();
        if argv.first() == Some(&"shutdown") {
            break;
        }

        shell.execute(&argv);
    }

    println!("Shutting down file system...");
    let (fs, _) = shell.into_inner();
    fs.close().context("shutdown error")?;

    Ok(())
}
