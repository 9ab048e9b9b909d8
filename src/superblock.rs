//! The superblock manager: the single owner of the allocation bitmaps and counters.

use anyhow::{bail, ensure, Context, Result};
use bitvec::prelude::*;
use log::debug;

use crate::{
    addressing::superblock_address,
    disk_format::{
        block::{DEVICE_BLOCK_SIZE, FIRST_DATA_BLOCK, NUM_LOGICAL_BLOCKS},
        inode::{InodeType, NUM_INODES, ROOT_INODE},
        superblock::{Superblock, MAGIC},
    },
    error::FsError,
    storage::BlockDevice,
    tinyfs::{DataBlockNumber, InodeNumber},
};

/// The logical unit holding the root directory's entries.
pub const ROOT_DIRECTORY_BLOCK: DataBlockNumber = FIRST_DATA_BLOCK as DataBlockNumber;

/// The number of logical units allocated by [`SuperblockManager::initialize`]: the superblock,
/// the inode table and the root directory's block.
pub const INITIAL_ALLOCATED_BLOCKS: usize = FIRST_DATA_BLOCK + 1;

pub struct SuperblockManager {
    superblock: Superblock,
}

impl SuperblockManager {
    /// Reads the superblock from the device. The magic number is not checked.
    pub fn load<D: BlockDevice>(device: &D) -> Result<Self> {
        let bytes = device
            .read_blocks(superblock_address())
            .context("reading superblock")?;
        let superblock = bincode::deserialize(&bytes).context("parsing superblock")?;

        Ok(SuperblockManager { superblock })
    }

    pub fn is_initialized(&self) -> bool {
        self.superblock.magic == MAGIC
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Resets the bitmaps and counters for an empty volume: the metadata units, the root inode
    /// and the root directory's block are allocated. The result is persisted.
    pub fn initialize<D: BlockDevice>(&mut self, device: &D) -> Result<()> {
        let mut superblock = Superblock::blank();
        superblock.magic = MAGIC;

        superblock.block_map.view_bits_mut::<Msb0>()[..INITIAL_ALLOCATED_BLOCKS].fill(true);
        superblock
            .inode_map
            .view_bits_mut::<Msb0>()
            .set(ROOT_INODE as usize, true);

        superblock.free_block_count = (NUM_LOGICAL_BLOCKS - INITIAL_ALLOCATED_BLOCKS) as i32;
        superblock.free_inode_count = (NUM_INODES - 1) as i32;
        superblock.dir_inode_count = 1;

        self.superblock = superblock;
        self.persist(device)
    }

    /// Writes the superblock back to the device.
    pub fn persist<D: BlockDevice>(&self, device: &D) -> Result<()> {
        let mut bytes = bincode::serialize(&self.superblock).context("serializing superblock")?;
        bytes.resize(superblock_address().len() * DEVICE_BLOCK_SIZE, 0);

        device
            .write_blocks(superblock_address().start, &bytes)
            .context("writing superblock")
    }

    /// The lowest-numbered free inode. Nothing is allocated.
    pub fn find_free_inode(&self) -> Result<InodeNumber> {
        if self.superblock.free_inode_count <= 0 {
            bail!(FsError::NoFreeInode);
        }

        self.inode_bits()
            .first_zero()
            .map(|inum| inum as InodeNumber)
            .ok_or_else(|| FsError::NoFreeInode.into())
    }

    /// The lowest-numbered free logical unit. Only single-unit requests are supported. Nothing is
    /// allocated.
    pub fn find_free_block(&self, count: usize) -> Result<DataBlockNumber> {
        ensure!(count == 1, "cannot allocate {count} contiguous blocks");

        if self.superblock.free_block_count < count as i32 {
            bail!(FsError::NoFreeBlock);
        }

        // metadata units are never handed out, even if their bits were cleared
        self.block_bits()[FIRST_DATA_BLOCK..]
            .first_zero()
            .map(|index| (FIRST_DATA_BLOCK + index) as DataBlockNumber)
            .ok_or_else(|| FsError::NoFreeBlock.into())
    }

    /// Marks `inum` as allocated and persists the change.
    pub fn allocate_inode<D: BlockDevice>(
        &mut self,
        device: &D,
        inum: InodeNumber,
        type_: InodeType,
    ) -> Result<()> {
        let index = inode_index(inum)?;
        ensure!(!self.inode_bits()[index], "inode {inum} is already allocated");

        self.superblock
            .inode_map
            .view_bits_mut::<Msb0>()
            .set(index, true);
        self.superblock.free_inode_count -= 1;
        if type_ == InodeType::Directory {
            self.superblock.dir_inode_count += 1;
        }

        debug!("allocated inode {inum}");
        self.persist(device)
    }

    /// Marks `block` as allocated and persists the change.
    pub fn allocate_block<D: BlockDevice>(
        &mut self,
        device: &D,
        block: DataBlockNumber,
    ) -> Result<()> {
        let index = data_block_index(block)?;
        ensure!(!self.block_bits()[index], "block {block} is already allocated");

        self.superblock
            .block_map
            .view_bits_mut::<Msb0>()
            .set(index, true);
        self.superblock.free_block_count -= 1;

        debug!("allocated block {block}");
        self.persist(device)
    }

    /// Marks `inum` as free and persists the change.
    pub fn release_inode<D: BlockDevice>(
        &mut self,
        device: &D,
        inum: InodeNumber,
        type_: InodeType,
    ) -> Result<()> {
        let index = inode_index(inum)?;
        ensure!(inum != ROOT_INODE, "the root inode cannot be released");
        ensure!(self.inode_bits()[index], "inode {inum} is not allocated");

        self.superblock
            .inode_map
            .view_bits_mut::<Msb0>()
            .set(index, false);
        self.superblock.free_inode_count += 1;
        if type_ == InodeType::Directory {
            self.superblock.dir_inode_count -= 1;
        }

        debug!("released inode {inum}");
        self.persist(device)
    }

    /// Marks `block` as free and persists the change.
    pub fn release_block<D: BlockDevice>(
        &mut self,
        device: &D,
        block: DataBlockNumber,
    ) -> Result<()> {
        let index = data_block_index(block)?;
        ensure!(
            block != ROOT_DIRECTORY_BLOCK,
            "the root directory's block cannot be released"
        );
        ensure!(self.block_bits()[index], "block {block} is not allocated");

        self.superblock
            .block_map
            .view_bits_mut::<Msb0>()
            .set(index, false);
        self.superblock.free_block_count += 1;

        debug!("released block {block}");
        self.persist(device)
    }

    pub fn is_inode_allocated(&self, inum: InodeNumber) -> bool {
        self.inode_bits()
            .get(inum as usize)
            .is_some_and(|bit| *bit)
    }

    pub fn is_block_allocated(&self, block: DataBlockNumber) -> bool {
        self.block_bits()
            .get(block as usize)
            .is_some_and(|bit| *bit)
    }

    /// The allocated inode numbers, in ascending order.
    pub fn allocated_inodes(&self) -> impl Iterator<Item = InodeNumber> + '_ {
        self.inode_bits().iter_ones().map(|inum| inum as InodeNumber)
    }

    /// Checks that the counters agree with the bitmaps and that the metadata units are reserved.
    pub fn check(&self) -> Result<()> {
        ensure!(self.is_initialized(), "bad magic number");

        let free_blocks = self.block_bits().count_zeros();
        ensure!(
            self.superblock.free_block_count == free_blocks as i32,
            "free block count {} does not match the {free_blocks} clear bits in the block bitmap",
            self.superblock.free_block_count
        );

        let free_inodes = self.inode_bits().count_zeros();
        ensure!(
            self.superblock.free_inode_count == free_inodes as i32,
            "free inode count {} does not match the {free_inodes} clear bits in the inode bitmap",
            self.superblock.free_inode_count
        );

        ensure!(
            self.block_bits()[..FIRST_DATA_BLOCK].all(),
            "superblock and inode table blocks are not all allocated"
        );
        ensure!(
            self.is_inode_allocated(ROOT_INODE),
            "root inode is not allocated"
        );

        Ok(())
    }

    fn block_bits(&self) -> &BitSlice<u32, Msb0> {
        self.superblock.block_map.view_bits::<Msb0>()
    }

    fn inode_bits(&self) -> &BitSlice<u32, Msb0> {
        self.superblock.inode_map.view_bits::<Msb0>()
    }
}

fn inode_index(inum: InodeNumber) -> Result<usize> {
    if inum as usize >= NUM_INODES {
        bail!(FsError::InodeOutOfRange(inum));
    }

    Ok(inum as usize)
}

fn data_block_index(block: DataBlockNumber) -> Result<usize> {
    let index = block as usize;
    if !(FIRST_DATA_BLOCK..NUM_LOGICAL_BLOCKS).contains(&index) {
        bail!(FsError::BlockOutOfRange(block));
    }

    Ok(index)
}
