use std::{
    fmt::{self, Debug},
    mem::size_of,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{error::FsError, tinyfs::InodeNumber};

use super::{block::LOGICAL_BLOCK_SIZE, inode::InodeType};

/// The number of bytes occupied by a directory entry.
pub const DIRECTORY_ENTRY_SIZE: usize = 128;
const_assert!(size_of::<DirectoryEntry>() == DIRECTORY_ENTRY_SIZE);

const_assert!(LOGICAL_BLOCK_SIZE % DIRECTORY_ENTRY_SIZE == 0);
/// The number of directory entries that fit in a logical unit.
pub const DIRECTORY_ENTRIES_PER_BLOCK: usize = LOGICAL_BLOCK_SIZE / DIRECTORY_ENTRY_SIZE;

/// The number of bytes reserved for a name, including the nul-terminator.
pub const NAME_CAPACITY: usize = 121;
const_assert!(size_of::<DirectoryEntryName>() == NAME_CAPACITY);

/// The maximum supported size of a file or directory name, excluding the nul-terminator.
pub const MAX_NAME_LEN: usize = NAME_CAPACITY - 1;

/// A free directory entry.
pub const FREE_DIRECTORY_ENTRY: DirectoryEntry = DirectoryEntry {
    inum: 0,
    valid: 0,
    type_: EntryType::File,
    name: DirectoryEntryName([0; NAME_CAPACITY]),
};

/// A directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct DirectoryEntry {
    /// The inode number.
    pub inum: InodeNumber,
    /// Non-zero if the entry is in use. Entries are never removed, only marked invalid.
    pub valid: u16,
    /// The type of the inode the entry names.
    pub type_: EntryType,
    /// The name of the entry.
    pub name: DirectoryEntryName,
}

impl DirectoryEntry {
    /// Constructs a new valid [`DirectoryEntry`] instance.
    pub fn new(inum: InodeNumber, name: &str, type_: EntryType) -> Result<DirectoryEntry> {
        Ok(DirectoryEntry {
            inum,
            valid: 1,
            type_,
            name: name.try_into()?,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.valid != 0
    }

    pub fn is_directory(&self) -> bool {
        self.type_ == EntryType::Directory
    }
}

/// The type tag carried by a directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum EntryType {
    File = 0,
    Directory = 1,
}

impl From<InodeType> for EntryType {
    fn from(value: InodeType) -> Self {
        match value {
            InodeType::File => EntryType::File,
            InodeType::Directory => EntryType::Directory,
        }
    }
}

impl From<EntryType> for InodeType {
    fn from(value: EntryType) -> Self {
        match value {
            EntryType::File => InodeType::File,
            EntryType::Directory => InodeType::Directory,
        }
    }
}

/// A name, as used in [`DirectoryEntry`].
///
/// Names of up to [`MAX_NAME_LEN`] bytes are supported. The unused tail is zeroed.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct DirectoryEntryName(
    #[serde(with = "BigArray")] [u8; NAME_CAPACITY],
);

impl DirectoryEntryName {
    /// The name's bytes, up to the first nul.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|b| *b == 0).unwrap_or(NAME_CAPACITY);
        &self.0[..len]
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl PartialEq<str> for DirectoryEntryName {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Debug for DirectoryEntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DirectoryEntryName")
            .field(&self.to_string())
            .finish()
    }
}

impl TryFrom<&str> for DirectoryEntryName {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_NAME_LEN || bytes.contains(&0) {
            return Err(FsError::InvalidName(value.to_owned()).into());
        }

        let mut converted = [0; NAME_CAPACITY];
        converted[0..bytes.len()].copy_from_slice(bytes);

        Ok(DirectoryEntryName(converted))
    }
}

impl fmt::Display for DirectoryEntryName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_size() {
        let entry = DirectoryEntry::new(7, "home", EntryType::Directory).unwrap();
        assert_eq!(bincode::serialize(&entry).unwrap().len(), DIRECTORY_ENTRY_SIZE);
        assert_eq!(DIRECTORY_ENTRIES_PER_BLOCK, 8);
    }

    #[test]
    fn test_field_layout() {
        let entry = DirectoryEntry::new(0x0102, ".", EntryType::Directory).unwrap();
        let bytes = bincode::serialize(&entry).unwrap();

        assert_eq!(bytes[0..4], [0x02, 0x01, 0, 0]);
        assert_eq!(bytes[4..6], [1, 0]);
        assert_eq!(bytes[6], 1);
        assert_eq!(bytes[7], b'.');
        assert!(bytes[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_zeroed_entry_is_free() {
        let entry: DirectoryEntry = bincode::deserialize(&[0; DIRECTORY_ENTRY_SIZE]).unwrap();
        assert_eq!(entry, FREE_DIRECTORY_ENTRY);
        assert!(!entry.is_valid());
        assert!(entry.name.is_empty());
    }

    #[test]
    fn test_name_round_trip() {
        let entry = DirectoryEntry::new(3, "notes.txt", EntryType::File).unwrap();
        let bytes = bincode::serialize(&entry).unwrap();
        let parsed: DirectoryEntry = bincode::deserialize(&bytes).unwrap();

        assert_eq!(parsed, entry);
        assert_eq!(parsed.name.to_string(), "notes.txt");
        assert!(parsed.name == *"notes.txt");
    }

    #[test]
    fn test_name_length_limit() {
        let longest = "x".repeat(MAX_NAME_LEN);
        assert!(DirectoryEntryName::try_from(longest.as_str()).is_ok());

        let too_long = "x".repeat(MAX_NAME_LEN + 1);
        let err = DirectoryEntryName::try_from(too_long.as_str()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FsError>(),
            Some(FsError::InvalidName(_))
        ));
    }

    #[test]
    fn test_name_rejects_nul() {
        assert!(DirectoryEntryName::try_from("a\0b").is_err());
    }

    #[test]
    fn test_unterminated_name_uses_full_capacity() {
        let name = DirectoryEntryName([b'z'; NAME_CAPACITY]);
        assert_eq!(name.as_bytes().len(), NAME_CAPACITY);
    }
}
