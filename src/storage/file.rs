use std::fs::File;
use std::os::unix::prelude::FileExt;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use log::info;

use crate::disk_format::block::{Block, DEVICE_BLOCK_SIZE, VOLUME_BLOCKS};
use crate::tinyfs::BlockNumber;

use super::block_device::BlockDevice;

/// A device backed by a disk image file.
pub struct FileDevice {
    file: File,
    num_blocks: usize,
}

impl FileDevice {
    /// Opens the image at `path` for reading and writing, creating it if it does not exist and
    /// growing it to a full volume if it is shorter.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("opening disk image {}", path.display()))?;

        let volume_len = (VOLUME_BLOCKS * DEVICE_BLOCK_SIZE) as u64;
        if file.metadata()?.len() < volume_len {
            info!("sizing {} to {volume_len} bytes", path.display());
            file.set_len(volume_len).context("sizing disk image")?;
        }

        Self::from_file(file)
    }

    /// Wraps an already-open image. Trailing bytes that do not fill a block are ignored.
    pub fn from_file(file: File) -> Result<Self> {
        let len = file.metadata().context("reading disk image metadata")?.len();
        let num_blocks = len as usize / DEVICE_BLOCK_SIZE;

        Ok(FileDevice { file, num_blocks })
    }

    fn check_bounds(&self, block_number: BlockNumber) -> Result<u64> {
        ensure!(
            block_number < self.num_blocks,
            "block number {block_number} out of bounds ({} blocks)",
            self.num_blocks
        );

        Ok((block_number * DEVICE_BLOCK_SIZE) as u64)
    }
}

impl BlockDevice for FileDevice {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_number: BlockNumber) -> Result<Block> {
        let position = self.check_bounds(block_number)?;
        let mut buf = [0; DEVICE_BLOCK_SIZE];

        self.file
            .read_exact_at(&mut buf, position)
            .with_context(|| format!("reading block {block_number}"))?;

        Ok(buf)
    }

    fn write_block(&self, block_number: BlockNumber, block: Block) -> Result<()> {
        let position = self.check_bounds(block_number)?;

        self.file
            .write_all_at(&block, position)
            .with_context(|| format!("writing block {block_number}"))?;

        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.file.sync_all().context("syncing disk image")
    }
}
