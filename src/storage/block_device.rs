use std::ops::Range;

use anyhow::{ensure, Result};

use crate::disk_format::block::{Block, DEVICE_BLOCK_SIZE};
use crate::tinyfs::BlockNumber;

/// A device of fixed-size blocks addressed by a zero-based index.
pub trait BlockDevice {
    /// The number of blocks on the device.
    fn num_blocks(&self) -> usize;

    fn read_block(&self, block_number: BlockNumber) -> Result<Block>;

    fn write_block(&self, block_number: BlockNumber, block: Block) -> Result<()>;

    /// Flushes outstanding writes. The device must not be used afterwards.
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Reads a run of consecutive blocks into one buffer.
    fn read_blocks(&self, blocks: Range<BlockNumber>) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(blocks.len() * DEVICE_BLOCK_SIZE);
        for block_number in blocks {
            data.extend_from_slice(&self.read_block(block_number)?);
        }

        Ok(data)
    }

    /// Writes `data` to consecutive blocks starting at `start`. `data` must be a whole number of
    /// blocks long.
    fn write_blocks(&self, start: BlockNumber, data: &[u8]) -> Result<()> {
        let chunks = data.chunks_exact(DEVICE_BLOCK_SIZE);
        ensure!(
            chunks.remainder().is_empty(),
            "data length {} is not a multiple of {DEVICE_BLOCK_SIZE}",
            data.len()
        );

        for (i, chunk) in chunks.enumerate() {
            let mut block = [0; DEVICE_BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.write_block(start + i, block)?;
        }

        Ok(())
    }
}
