use std::mem::size_of;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::tinyfs::{DataBlockNumber, InodeNumber};

use super::block::{DEVICE_BLOCK_SIZE, INODE_TABLE_BLOCKS};

pub const INODE_SIZE: usize = 32;
const_assert!(size_of::<Inode>() == INODE_SIZE);

/// The number of direct block pointers in an inode. There is no indirection.
pub const NUM_DIRECT: usize = 6;

const_assert!(DEVICE_BLOCK_SIZE % INODE_SIZE == 0);
pub const INODES_PER_BLOCK: usize = DEVICE_BLOCK_SIZE / INODE_SIZE;

/// The number of inode slots on the volume. The inode bitmap has one bit per slot.
pub const NUM_INODES: usize = 1024;
const_assert!(NUM_INODES == INODE_TABLE_BLOCKS * INODES_PER_BLOCK);

pub const ROOT_INODE: InodeNumber = 0;

/// Marks a direct pointer that does not refer to any block.
pub const UNBOUND: DataBlockNumber = 0;

/// An inode that has never been written.
pub const FREE_INODE: Inode = Inode {
    size: 0,
    type_: InodeType::File,
    link: 0,
    direct: [UNBOUND; NUM_DIRECT],
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct Inode {
    /// for directories, the number of bound direct pointers; for files, the content length in
    /// bytes (always 0 since nothing writes file content)
    pub size: u32,
    /// file type (directory or regular file)
    pub type_: InodeType,
    /// number of links to the inode
    pub link: u16,
    /// logical unit numbers of the inode's blocks, [`UNBOUND`] if unused
    pub direct: [DataBlockNumber; NUM_DIRECT],
}

impl Inode {
    /// Constructs an empty inode of the given type with every pointer unbound.
    pub fn new(type_: InodeType) -> Self {
        Inode { type_, ..FREE_INODE }
    }

    /// The bound direct pointers, in slot order.
    pub fn bound_blocks(&self) -> impl Iterator<Item = DataBlockNumber> + '_ {
        self.direct.iter().copied().filter(|b| *b != UNBOUND)
    }

    pub fn is_directory(&self) -> bool {
        self.type_ == InodeType::Directory
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u16)]
pub enum InodeType {
    /// This inode describes a regular file.
    File = 0,
    /// This inode describes a directory.
    Directory = 1,
}
