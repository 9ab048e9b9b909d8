//! Reading and writing the directory entries packed into a logical unit.
//!
//! A [`DirectoryBlock`] is an owned copy of one unit's entries. Writing consumes it, so an entry
//! can only be written back into a block that was read first, or into one that was freshly
//! allocated and is known to be empty.

use anyhow::{ensure, Context, Result};

use crate::{
    addressing::data_block_address,
    disk_format::directory_entry::{
        DirectoryEntry, DIRECTORY_ENTRIES_PER_BLOCK, DIRECTORY_ENTRY_SIZE, FREE_DIRECTORY_ENTRY,
    },
    disk_format::inode::Inode,
    storage::BlockDevice,
    tinyfs::DataBlockNumber,
};

#[derive(Debug)]
pub struct DirectoryBlock {
    number: DataBlockNumber,
    entries: [DirectoryEntry; DIRECTORY_ENTRIES_PER_BLOCK],
}

impl DirectoryBlock {
    pub fn read<D: BlockDevice>(device: &D, number: DataBlockNumber) -> Result<Self> {
        let bytes = device
            .read_blocks(data_block_address(number)?)
            .with_context(|| format!("reading directory block {number}"))?;

        let mut entries = [FREE_DIRECTORY_ENTRY; DIRECTORY_ENTRIES_PER_BLOCK];
        for (entry, chunk) in entries
            .iter_mut()
            .zip(bytes.chunks_exact(DIRECTORY_ENTRY_SIZE))
        {
            *entry = bincode::deserialize(chunk)
                .with_context(|| format!("parsing entry in directory block {number}"))?;
        }

        Ok(DirectoryBlock { number, entries })
    }

    /// A block of free entries, for a unit that was just allocated.
    pub fn empty(number: DataBlockNumber) -> Result<Self> {
        data_block_address(number)?;

        Ok(DirectoryBlock {
            number,
            entries: [FREE_DIRECTORY_ENTRY; DIRECTORY_ENTRIES_PER_BLOCK],
        })
    }

    pub fn number(&self) -> DataBlockNumber {
        self.number
    }

    /// All slots, including free ones.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn valid_entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter(|entry| entry.is_valid())
    }

    pub fn set_entry(&mut self, slot: usize, entry: DirectoryEntry) -> Result<()> {
        ensure!(
            slot < DIRECTORY_ENTRIES_PER_BLOCK,
            "directory slot {slot} out of range"
        );

        self.entries[slot] = entry;
        Ok(())
    }

    /// Writes every slot back to the unit the block was read from.
    pub fn write<D: BlockDevice>(self, device: &D) -> Result<()> {
        let range = data_block_address(self.number)?;

        let bytes = self
            .entries
            .iter()
            .map(|entry| bincode::serialize(entry).context("serializing directory entry"))
            .collect::<Result<Vec<_>>>()?
            .concat();

        device
            .write_blocks(range.start, &bytes)
            .with_context(|| format!("writing directory block {}", self.number))
    }
}

/// The valid entries of a directory, in block then slot order.
pub fn read_directory<D: BlockDevice>(device: &D, inode: &Inode) -> Result<Vec<DirectoryEntry>> {
    let mut entries = vec![];
    for number in inode.bound_blocks() {
        let block = DirectoryBlock::read(device, number)?;
        entries.extend(block.valid_entries().copied());
    }

    Ok(entries)
}
