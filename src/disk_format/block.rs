use std::mem::size_of;

/// size of a device block in bytes
pub const DEVICE_BLOCK_SIZE: usize = 512;

pub type Block = [u8; DEVICE_BLOCK_SIZE];
const_assert!(size_of::<Block>() == DEVICE_BLOCK_SIZE);

/// The number of device blocks that make up one logical unit.
pub const BLOCKS_PER_LOGICAL_BLOCK: usize = 2;

/// The size of a logical unit in bytes.
pub const LOGICAL_BLOCK_SIZE: usize = DEVICE_BLOCK_SIZE * BLOCKS_PER_LOGICAL_BLOCK;

/// The number of logical units on the volume. The block bitmap has one bit per unit.
pub const NUM_LOGICAL_BLOCKS: usize = 4096;

/// The total number of device blocks on the volume.
pub const VOLUME_BLOCKS: usize = NUM_LOGICAL_BLOCKS * BLOCKS_PER_LOGICAL_BLOCK;

/// The first device block of the superblock.
pub const SUPERBLOCK_START: usize = 0;

/// The number of device blocks occupied by the superblock.
pub const SUPERBLOCK_BLOCKS: usize = 2;

/// The first device block of the inode table.
pub const INODE_TABLE_START: usize = SUPERBLOCK_START + SUPERBLOCK_BLOCKS;

/// The number of device blocks occupied by the inode table.
pub const INODE_TABLE_BLOCKS: usize = 64;

/// The first device block of the data region.
pub const DATA_REGION_START: usize = INODE_TABLE_START + INODE_TABLE_BLOCKS;

const_assert!(DATA_REGION_START % BLOCKS_PER_LOGICAL_BLOCK == 0);
/// The first logical unit of the data region. Units below it hold the superblock and the inode
/// table and are reserved when the volume is initialized.
pub const FIRST_DATA_BLOCK: usize = DATA_REGION_START / BLOCKS_PER_LOGICAL_BLOCK;

/// The number of logical units in the data region.
pub const NUM_DATA_BLOCKS: usize = NUM_LOGICAL_BLOCKS - FIRST_DATA_BLOCK;
const_assert!(NUM_DATA_BLOCKS == 4063);
