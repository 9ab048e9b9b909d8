use std::cell::{Cell, RefCell};

use anyhow::{bail, Result};

use crate::{
    disk_format::block::{Block, DEVICE_BLOCK_SIZE, VOLUME_BLOCKS},
    tinyfs::BlockNumber,
};

use super::block_device::BlockDevice;

/// A device that keeps its blocks in memory.
pub struct MemoryDevice {
    blocks: RefCell<Vec<Block>>,
    fail_writes: Cell<bool>,
}

impl MemoryDevice {
    /// Constructs a zeroed device with `num_blocks` blocks.
    #[must_use]
    pub fn new(num_blocks: usize) -> Self {
        MemoryDevice {
            blocks: RefCell::new(vec![[0; DEVICE_BLOCK_SIZE]; num_blocks]),
            fail_writes: Cell::new(false),
        }
    }

    /// Constructs a zeroed device large enough for a full volume.
    #[must_use]
    pub fn volume() -> Self {
        Self::new(VOLUME_BLOCKS)
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

impl BlockDevice for MemoryDevice {
    fn num_blocks(&self) -> usize {
        self.blocks.borrow().len()
    }

    fn read_block(&self, block_number: BlockNumber) -> Result<Block> {
        match self.blocks.borrow().get(block_number) {
            Some(block) => Ok(*block),
            None => bail!("block number {block_number} out of bounds"),
        }
    }

    fn write_block(&self, block_number: BlockNumber, block: Block) -> Result<()> {
        if self.fail_writes.get() {
            bail!("write to block {block_number} failed");
        }

        match self.blocks.borrow_mut().get_mut(block_number) {
            Some(slot) => *slot = block,
            None => bail!("block number {block_number} out of bounds"),
        }

        Ok(())
    }
}
