use thiserror::Error;

use crate::tinyfs::{DataBlockNumber, InodeNumber};

/// Filesystem failures that callers may want to tell apart.
///
/// These travel inside [`anyhow::Error`]; use [`anyhow::Error::downcast_ref`] to inspect them.
/// Device failures are reported as the underlying I/O error with context instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("inode number {0} is out of range")]
    InodeOutOfRange(InodeNumber),
    #[error("block number {0} is outside the data region")]
    BlockOutOfRange(DataBlockNumber),
    #[error("no free inode")]
    NoFreeInode,
    #[error("no free block")]
    NoFreeBlock,
    #[error("directory full")]
    DirectoryFull,
    #[error("no such directory \"{0}\"")]
    NoSuchDirectory(String),
    #[error("\"{0}\" is not a directory")]
    NotADirectory(String),
    #[error("no such file \"{0}\"")]
    NoSuchFile(String),
    #[error("\"{0}\" is not a regular file")]
    NotAFile(String),
    #[error("\"{0}\" already exists")]
    AlreadyExists(String),
    #[error("invalid name \"{0}\"")]
    InvalidName(String),
    #[error("{0}")]
    Usage(&'static str),
    #[error("volume may be inconsistent after a failed write; reinitialize it first")]
    Inconsistent,
}
