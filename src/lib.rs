pub mod addressing;
pub mod directory_store;
pub mod disk_format;
pub mod error;
pub mod inode_store;
pub mod path;
pub mod shell;
pub mod storage;
pub mod superblock;
pub mod tinyfs;
