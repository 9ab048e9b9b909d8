use std::collections::{HashMap, HashSet};
use std::fmt;

use anyhow::{bail, ensure, Result};
use log::{info, warn};

use crate::{
    directory_store::{read_directory, DirectoryBlock},
    disk_format::{
        block::{FIRST_DATA_BLOCK, NUM_LOGICAL_BLOCKS, VOLUME_BLOCKS},
        directory_entry::{DirectoryEntry, DirectoryEntryName, EntryType},
        inode::{Inode, InodeType, NUM_INODES, ROOT_INODE, UNBOUND},
        superblock::Superblock,
    },
    error::FsError,
    inode_store::{read_inode, update_inode, write_inode},
    path::{lookup, resolve_directory, resolve_parent},
    storage::BlockDevice,
    superblock::{SuperblockManager, ROOT_DIRECTORY_BLOCK},
};

// inode numbers are `u32`s on the disk, both in inodes' directory entries and in the bitmap
pub type InodeNumber = u32;

/// A logical unit number, as stored in inodes' direct pointers. Units are numbered from the start
/// of the volume, so unit 0 (the superblock) doubles as the "unbound" marker.
pub type DataBlockNumber = u32;

// device block numbers are never stored on disk; `usize` avoids littering the code with casts
pub type BlockNumber = usize;

/// One line of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub type_: EntryType,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.type_ {
            EntryType::Directory => write!(f, "[{}]", self.name),
            EntryType::File => write!(f, "{}", self.name),
        }
    }
}

pub struct TinyFs<D: BlockDevice> {
    device: D,
    superblock: SuperblockManager,
    /// Set once a write fails part-way through a change. No further changes are accepted.
    inconsistent: bool,
}

impl<D: BlockDevice> TinyFs<D> {
    /// Opens the volume on `device`, initializing it first if it carries no valid magic number.
    pub fn mount(device: D) -> Result<Self> {
        let mut fs = Self::open(device)?;

        if fs.superblock.is_initialized() {
            fs.log_counters();
        } else {
            info!("no filesystem found, initializing");
            fs.initialize()?;
        }

        Ok(fs)
    }

    /// Opens the volume on `device`, which must already be initialized.
    pub fn load(device: D) -> Result<Self> {
        let fs = Self::open(device)?;
        ensure!(
            fs.superblock.is_initialized(),
            "device does not contain a filesystem"
        );

        fs.log_counters();
        Ok(fs)
    }

    /// Initializes a fresh volume on `device`, discarding whatever it held.
    pub fn format(device: D) -> Result<Self> {
        let mut fs = Self::open(device)?;
        fs.initialize()?;

        Ok(fs)
    }

    fn open(device: D) -> Result<Self> {
        ensure!(
            device.num_blocks() >= VOLUME_BLOCKS,
            "device has {} blocks but a volume needs {VOLUME_BLOCKS}",
            device.num_blocks()
        );

        let superblock = SuperblockManager::load(&device)?;

        Ok(TinyFs {
            device,
            superblock,
            inconsistent: false,
        })
    }

    /// Resets the allocation state and writes an empty root directory holding only `.`.
    pub fn initialize(&mut self) -> Result<()> {
        self.superblock.initialize(&self.device)?;

        let mut root = Inode::new(InodeType::Directory);
        root.direct[0] = ROOT_DIRECTORY_BLOCK;
        root.size = 1;
        write_inode(&self.device, ROOT_INODE, &root)?;

        let mut block = DirectoryBlock::empty(ROOT_DIRECTORY_BLOCK)?;
        block.set_entry(
            0,
            DirectoryEntry::new(ROOT_INODE, ".", EntryType::Directory)?,
        )?;
        block.write(&self.device)?;

        self.inconsistent = false;
        info!("initialized filesystem");
        self.log_counters();

        Ok(())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn superblock(&self) -> &Superblock {
        self.superblock.superblock()
    }

    pub fn is_inconsistent(&self) -> bool {
        self.inconsistent
    }

    pub fn read_inode(&self, inum: InodeNumber) -> Result<Inode> {
        read_inode(&self.device, inum)
    }

    /// Flushes and closes the device.
    pub fn close(self) -> Result<()> {
        info!("closing device");
        self.device.close()
    }

    /// Lists the directory at `path`, or the root if there is none.
    pub fn list(&self, path: Option<&str>) -> Result<Vec<Listing>> {
        let inum = match path {
            Some(path) => resolve_directory(&self.device, path)?,
            None => ROOT_INODE,
        };

        let inode = self.read_inode(inum)?;
        Ok(read_directory(&self.device, &inode)?
            .into_iter()
            .filter(|entry| !entry.name.is_empty())
            .map(|entry| Listing {
                name: entry.name.to_string(),
                type_: entry.type_,
            })
            .collect())
    }

    pub fn make_directory(&mut self, path: &str) -> Result<InodeNumber> {
        self.create(path, InodeType::Directory)
    }

    pub fn make_file(&mut self, path: &str) -> Result<InodeNumber> {
        self.create(path, InodeType::File)
    }

    /// Creates an empty file at `destination` if `source` names an existing file. File contents
    /// are not copied.
    pub fn copy(&mut self, destination: &str, source: &str) -> Result<InodeNumber> {
        let resolved = resolve_parent(&self.device, source)?;
        if resolved.name.is_empty() {
            bail!(FsError::NotAFile(source.to_owned()));
        }

        match lookup(&self.device, resolved.parent, &resolved.name, false)? {
            Some(entry) if entry.type_ == EntryType::File => {}
            Some(_) => bail!(FsError::NotAFile(resolved.display())),
            None => bail!(FsError::NoSuchFile(resolved.display())),
        }

        self.make_file(destination)
    }

    fn create(&mut self, path: &str, type_: InodeType) -> Result<InodeNumber> {
        if self.inconsistent {
            bail!(FsError::Inconsistent);
        }

        let resolved = resolve_parent(&self.device, path)?;
        let name = resolved.name.as_str();
        if name.is_empty() || name == "." || name == ".." {
            bail!(FsError::InvalidName(name.to_owned()));
        }
        let name = DirectoryEntryName::try_from(name)?;

        let parent_inum = resolved.parent;
        let parent = self.read_inode(parent_inum)?;
        if lookup(&self.device, parent_inum, &resolved.name, false)?.is_some() {
            bail!(FsError::AlreadyExists(resolved.display()));
        }

        // slot 0 is never handed out; the root keeps its own first block there
        let slot = parent.direct[1..]
            .iter()
            .position(|b| *b == UNBOUND)
            .map(|i| i + 1)
            .ok_or(FsError::DirectoryFull)?;

        let block = self.superblock.find_free_block(1)?;
        let inum = self.superblock.find_free_inode()?;

        let entry = DirectoryEntry {
            inum,
            valid: 1,
            type_: type_.into(),
            name,
        };

        // nothing has been written up to here; from now on a failure may leave a half-made entry
        let result = self.commit_entry(parent_inum, slot, block, entry);
        if let Err(err) = &result {
            warn!("creating {} failed part-way: {err:#}", resolved.display());
            self.inconsistent = true;
        }
        result?;

        info!(
            "created {:?} {} (inode {inum}, block {block})",
            type_,
            resolved.display()
        );
        Ok(inum)
    }

    /// Allocates `block` and the entry's inode, then writes the new inode, the block holding the
    /// entry and the parent with `block` bound at `slot`.
    fn commit_entry(
        &mut self,
        parent_inum: InodeNumber,
        slot: usize,
        block: DataBlockNumber,
        entry: DirectoryEntry,
    ) -> Result<()> {
        let type_ = InodeType::from(entry.type_);

        self.superblock.allocate_block(&self.device, block)?;
        self.superblock.allocate_inode(&self.device, entry.inum, type_)?;

        write_inode(&self.device, entry.inum, &Inode::new(type_))?;

        let mut directory_block = DirectoryBlock::empty(block)?;
        directory_block.set_entry(0, entry)?;
        directory_block.write(&self.device)?;

        update_inode(&self.device, parent_inum, |parent| {
            parent.direct[slot] = block;
            parent.size += 1;
        })?;

        Ok(())
    }

    fn log_counters(&self) {
        let superblock = self.superblock.superblock();
        info!("{} free blocks", superblock.free_block_count);
        info!("{} free inodes", superblock.free_inode_count);
        info!("{} directories", superblock.dir_inode_count);
    }

    /// Checks the volume for consistency. Performs a depth-first traversal of the directory tree
    /// from the root and compares what it finds against the bitmaps.
    pub fn check(&self) -> Result<()> {
        self.superblock.check()?;

        let root = self.read_inode(ROOT_INODE)?;
        ensure!(root.is_directory(), "root inode does not represent a directory");
        ensure!(
            root.direct[0] == ROOT_DIRECTORY_BLOCK,
            "root directory does not start at block {ROOT_DIRECTORY_BLOCK}"
        );

        let root_block = DirectoryBlock::read(&self.device, ROOT_DIRECTORY_BLOCK)?;
        let first = root_block.entries()[0];
        ensure!(
            first.is_valid() && first.name == *"." && first.inum == ROOT_INODE,
            "root directory does not start with a '.' entry"
        );

        let mut queue = vec![ROOT_INODE];
        let mut seen_directories = HashSet::<InodeNumber>::new();
        let mut block_owners = HashMap::<DataBlockNumber, InodeNumber>::new();
        let mut reachable = HashSet::from([ROOT_INODE]);

        while let Some(inum) = queue.pop() {
            if !seen_directories.insert(inum) {
                bail!("directory tree includes a loop through inode {inum}");
            }

            let inode = self.read_inode(inum)?;
            let bound = inode.bound_blocks().collect::<Vec<_>>();
            ensure!(
                inode.size as usize == bound.len(),
                "directory inode {inum} has size {} but {} bound blocks",
                inode.size,
                bound.len()
            );

            for block in bound {
                ensure!(
                    (FIRST_DATA_BLOCK..NUM_LOGICAL_BLOCKS).contains(&(block as usize)),
                    "inode {inum} points outside the data region: {block}"
                );
                ensure!(
                    self.superblock.is_block_allocated(block),
                    "inode {inum} points to free block {block}"
                );
                if let Some(owner) = block_owners.insert(block, inum) {
                    bail!("block {block} is used by inodes {owner} and {inum}");
                }
            }

            let mut names = HashSet::new();
            for entry in read_directory(&self.device, &inode)? {
                ensure!(
                    (entry.inum as usize) < NUM_INODES,
                    "invalid inode number in directory entry: {}",
                    entry.inum
                );
                ensure!(!entry.name.is_empty(), "directory {inum} has an unnamed entry");
                ensure!(
                    names.insert(entry.name.to_string()),
                    "directory {inum} contains duplicate entry: {}",
                    entry.name
                );

                if entry.name == *"." {
                    ensure!(entry.inum == inum, "'.' entry doesn't point to self");
                    continue;
                }

                ensure!(
                    self.superblock.is_inode_allocated(entry.inum),
                    "entry {} names free inode {}",
                    entry.name,
                    entry.inum
                );

                let child = self.read_inode(entry.inum)?;
                ensure!(
                    EntryType::from(child.type_) == entry.type_,
                    "entry {} is tagged {:?} but inode {} is a {:?}",
                    entry.name,
                    entry.type_,
                    entry.inum,
                    child.type_
                );

                reachable.insert(entry.inum);
                if child.is_directory() {
                    queue.push(entry.inum);
                }
            }
        }

        let directories = seen_directories.len();
        ensure!(
            self.superblock.superblock().dir_inode_count as usize == directories,
            "directory count {} does not match the {directories} reachable directories",
            self.superblock.superblock().dir_inode_count
        );

        for inum in self.superblock.allocated_inodes() {
            if !reachable.contains(&inum) {
                warn!("inode {inum} is allocated but unreachable");
            }
        }

        Ok(())
    }
}
