//! Mapping of inode numbers and logical units to device blocks.

use std::ops::Range;

use anyhow::Result;

use crate::{
    disk_format::{
        block::{
            BLOCKS_PER_LOGICAL_BLOCK, FIRST_DATA_BLOCK, INODE_TABLE_START, NUM_LOGICAL_BLOCKS,
            SUPERBLOCK_BLOCKS, SUPERBLOCK_START,
        },
        inode::{INODES_PER_BLOCK, NUM_INODES},
    },
    error::FsError,
    tinyfs::{BlockNumber, DataBlockNumber, InodeNumber},
};

/// Where an inode lives in the inode table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InodeAddress {
    /// The device block holding the inode.
    pub block: BlockNumber,
    /// The index of the inode within that block.
    pub slot: usize,
}

pub fn inode_block_address(inum: InodeNumber) -> Result<InodeAddress> {
    let index = inum as usize;
    if index >= NUM_INODES {
        return Err(FsError::InodeOutOfRange(inum).into());
    }

    Ok(InodeAddress {
        block: INODE_TABLE_START + index / INODES_PER_BLOCK,
        slot: index % INODES_PER_BLOCK,
    })
}

/// The device blocks occupied by a logical unit of the data region.
pub fn data_block_address(block: DataBlockNumber) -> Result<Range<BlockNumber>> {
    let unit = block as usize;
    if !(FIRST_DATA_BLOCK..NUM_LOGICAL_BLOCKS).contains(&unit) {
        return Err(FsError::BlockOutOfRange(block).into());
    }

    let start = unit * BLOCKS_PER_LOGICAL_BLOCK;
    Ok(start..start + BLOCKS_PER_LOGICAL_BLOCK)
}

pub fn superblock_address() -> Range<BlockNumber> {
    SUPERBLOCK_START..SUPERBLOCK_START + SUPERBLOCK_BLOCKS
}
