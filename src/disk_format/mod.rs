//! Constants and structures that define the on-disk format.
//!
//! The volume is laid out as follows, in 512-byte device blocks:
//!
//! | device blocks | contents                                     |
//! |---------------|----------------------------------------------|
//! | 0..2          | superblock                                   |
//! | 2..66         | inode table, 16 inodes per block             |
//! | 66..8192      | data region, in logical units of two blocks  |

/// Perform a const assertion.
macro_rules! const_assert {
    ($($tt:tt)*) => {
        const _: () = assert!($($tt)*);
    }
}

/// Device blocks and logical units.
pub mod block;
/// Directory entries and entry names.
pub mod directory_entry;
/// Inodes.
pub mod inode;
/// The superblock.
pub mod superblock;
