use std::mem::size_of;

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use super::{
    block::{DEVICE_BLOCK_SIZE, NUM_LOGICAL_BLOCKS, SUPERBLOCK_BLOCKS},
    inode::NUM_INODES,
};

/// Identifies an initialized volume.
pub const MAGIC: u32 = 0x2020_1222;

/// The number of bytes occupied by the superblock record.
pub const SUPERBLOCK_SIZE: usize = 656;
const_assert!(size_of::<Superblock>() == SUPERBLOCK_SIZE);
const_assert!(SUPERBLOCK_SIZE <= SUPERBLOCK_BLOCKS * DEVICE_BLOCK_SIZE);

/// The number of 32-bit words in the block bitmap.
pub const BLOCK_MAP_WORDS: usize = NUM_LOGICAL_BLOCKS / 32;
const_assert!(NUM_LOGICAL_BLOCKS % 32 == 0);

/// The number of 32-bit words in the inode bitmap.
pub const INODE_MAP_WORDS: usize = NUM_INODES / 32;
const_assert!(NUM_INODES % 32 == 0);

/// The superblock.
///
/// In both bitmaps the most significant bit of a word stands for the lowest number in that word,
/// and a set bit means "allocated".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct Superblock {
    /// [`MAGIC`] once the volume has been initialized.
    pub magic: u32,
    /// The number of clear bits in `block_map`.
    pub free_block_count: i32,
    /// The number of clear bits in `inode_map`.
    pub free_inode_count: i32,
    /// The number of allocated directory inodes.
    pub dir_inode_count: i32,
    /// One bit per logical unit.
    #[serde(with = "BigArray")]
    pub block_map: [u32; BLOCK_MAP_WORDS],
    /// One bit per inode slot.
    pub inode_map: [u32; INODE_MAP_WORDS],
}

impl Superblock {
    /// An all-zero superblock, as found on a blank device.
    pub const fn blank() -> Self {
        Superblock {
            magic: 0,
            free_block_count: 0,
            free_inode_count: 0,
            dir_inode_count: 0,
            block_map: [0; BLOCK_MAP_WORDS],
            inode_map: [0; INODE_MAP_WORDS],
        }
    }
}
