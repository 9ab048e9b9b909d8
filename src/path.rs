//! Path resolution from the root directory.
//!
//! Paths are `/`-separated. Empty segments are ignored and every path starts at the root, with
//! or without a leading `/`.

use anyhow::{bail, Result};

use crate::{
    directory_store::read_directory,
    disk_format::{directory_entry::DirectoryEntry, inode::ROOT_INODE},
    error::FsError,
    inode_store::read_inode,
    storage::BlockDevice,
    tinyfs::InodeNumber,
};

/// The directories walked through so far, outermost first.
#[derive(Debug, Default)]
pub struct PathStack {
    items: Vec<DirectoryEntry>,
}

impl PathStack {
    pub fn push(&mut self, entry: DirectoryEntry) {
        self.items.push(entry);
    }

    /// The inode of the innermost directory, the root if nothing has been pushed.
    pub fn current(&self) -> InodeNumber {
        self.items.last().map_or(ROOT_INODE, |entry| entry.inum)
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Renders the walked path with `name` appended, for diagnostics.
    pub fn join(&self, name: &str) -> String {
        let mut path = String::new();
        for entry in &self.items {
            path.push('/');
            path.push_str(&entry.name.to_string());
        }
        path.push('/');
        path.push_str(name);
        path
    }
}

/// A path split into the directory that holds its final component and that component's name.
#[derive(Debug)]
pub struct ResolvedPath {
    /// The inode of the directory holding the final component.
    pub parent: InodeNumber,
    /// The final component, empty for the root itself.
    pub name: String,
    pub stack: PathStack,
}

impl ResolvedPath {
    /// The full path, for diagnostics.
    pub fn display(&self) -> String {
        self.stack.join(&self.name)
    }
}

/// Walks every segment but the last, which is returned unresolved together with the inode of
/// the directory it belongs in.
pub fn resolve_parent<D: BlockDevice>(device: &D, path: &str) -> Result<ResolvedPath> {
    let mut segments = path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>();
    let name = segments.pop().unwrap_or_default().to_owned();

    let mut stack = PathStack::default();
    for segment in segments {
        let entry = lookup_directory(device, stack.current(), segment)
            .map_err(|err| rename_failure(err, stack.join(segment)))?;
        stack.push(entry);
    }

    Ok(ResolvedPath {
        parent: stack.current(),
        name,
        stack,
    })
}

/// Resolves a path that must name a directory.
pub fn resolve_directory<D: BlockDevice>(device: &D, path: &str) -> Result<InodeNumber> {
    let resolved = resolve_parent(device, path)?;
    if resolved.name.is_empty() {
        return Ok(resolved.parent);
    }

    let entry = lookup_directory(device, resolved.parent, &resolved.name)
        .map_err(|err| rename_failure(err, resolved.display()))?;
    Ok(entry.inum)
}

/// The valid entry called `name` in directory `dir`, if there is one.
///
/// An entry of the wanted type wins over an earlier one of the other type with the same name.
pub fn lookup<D: BlockDevice>(
    device: &D,
    dir: InodeNumber,
    name: &str,
    want_directory: bool,
) -> Result<Option<DirectoryEntry>> {
    let inode = read_inode(device, dir)?;
    if !inode.is_directory() {
        bail!(FsError::NotADirectory(format!("inode {dir}")));
    }

    let matches = read_directory(device, &inode)?
        .into_iter()
        .filter(|entry| entry.name == *name)
        .collect::<Vec<_>>();

    Ok(matches
        .iter()
        .find(|entry| entry.is_directory() == want_directory)
        .or(matches.first())
        .copied())
}

fn lookup_directory<D: BlockDevice>(
    device: &D,
    dir: InodeNumber,
    name: &str,
) -> Result<DirectoryEntry> {
    match lookup(device, dir, name, true)? {
        Some(entry) if entry.is_directory() => Ok(entry),
        Some(_) => bail!(FsError::NotADirectory(name.to_owned())),
        None => bail!(FsError::NoSuchDirectory(name.to_owned())),
    }
}

/// Replaces the bare segment name in a resolution failure with the path walked so far.
fn rename_failure(err: anyhow::Error, path: String) -> anyhow::Error {
    match err.downcast_ref::<FsError>() {
        Some(FsError::NoSuchDirectory(_)) => FsError::NoSuchDirectory(path).into(),
        Some(FsError::NotADirectory(_)) => FsError::NotADirectory(path).into(),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        directory_store::DirectoryBlock,
        disk_format::{
            directory_entry::EntryType,
            inode::{Inode, InodeType},
        },
        storage::MemoryDevice,
    };

    use super::*;

    /// Builds `/ {., etc/, notes} ; /etc {passwd, ssh/}` by hand.
    fn sample_tree() -> MemoryDevice {
        let device = MemoryDevice::volume();

        let mut root = Inode::new(InodeType::Directory);
        root.direct[0] = 33;
        root.direct[1] = 34;
        crate::inode_store::write_inode(&device, 0, &root).unwrap();

        let mut block = DirectoryBlock::empty(33).unwrap();
        block
            .set_entry(0, DirectoryEntry::new(0, ".", EntryType::Directory).unwrap())
            .unwrap();
        block.write(&device).unwrap();

        let mut block = DirectoryBlock::empty(34).unwrap();
        block
            .set_entry(0, DirectoryEntry::new(1, "etc", EntryType::Directory).unwrap())
            .unwrap();
        block
            .set_entry(1, DirectoryEntry::new(2, "notes", EntryType::File).unwrap())
            .unwrap();
        block.write(&device).unwrap();

        let mut etc = Inode::new(InodeType::Directory);
        etc.direct[1] = 35;
        crate::inode_store::write_inode(&device, 1, &etc).unwrap();
        crate::inode_store::write_inode(&device, 2, &Inode::new(InodeType::File)).unwrap();

        let mut block = DirectoryBlock::empty(35).unwrap();
        block
            .set_entry(0, DirectoryEntry::new(3, "passwd", EntryType::File).unwrap())
            .unwrap();
        block
            .set_entry(5, DirectoryEntry::new(4, "ssh", EntryType::Directory).unwrap())
            .unwrap();
        block.write(&device).unwrap();

        let ssh = Inode::new(InodeType::Directory);
        crate::inode_store::write_inode(&device, 4, &ssh).unwrap();

        device
    }

    fn failure(err: anyhow::Error) -> FsError {
        err.downcast_ref::<FsError>().cloned().unwrap()
    }

    #[test]
    fn test_root_alone() {
        let device = sample_tree();
        let resolved = resolve_parent(&device, "/").unwrap();

        assert_eq!(resolved.parent, ROOT_INODE);
        assert_eq!(resolved.name, "");
        assert_eq!(resolved.stack.depth(), 0);
    }

    #[test]
    fn test_root_child() {
        let device = sample_tree();
        let resolved = resolve_parent(&device, "/new").unwrap();

        assert_eq!(resolved.parent, ROOT_INODE);
        assert_eq!(resolved.name, "new");
    }

    #[test]
    fn test_last_segment_is_not_resolved() {
        let device = sample_tree();
        let resolved = resolve_parent(&device, "/etc/missing").unwrap();

        assert_eq!(resolved.parent, 1);
        assert_eq!(resolved.name, "missing");
        assert_eq!(resolved.display(), "/etc/missing");
    }

    #[test]
    fn test_nested_child() {
        let device = sample_tree();
        let resolved = resolve_parent(&device, "/etc/ssh/config").unwrap();

        assert_eq!(resolved.parent, 4);
        assert_eq!(resolved.name, "config");
        assert_eq!(resolved.stack.depth(), 2);
    }

    #[test]
    fn test_redundant_slashes() {
        let device = sample_tree();

        for path in ["etc/passwd", "//etc//passwd", "/etc/passwd/"] {
            let resolved = resolve_parent(&device, path).unwrap();
            assert_eq!(resolved.parent, 1, "{path}");
            assert_eq!(resolved.name, "passwd", "{path}");
        }
    }

    #[test]
    fn test_dot_in_root() {
        let device = sample_tree();
        let resolved = resolve_parent(&device, "/./etc/x").unwrap();

        assert_eq!(resolved.parent, 1);
    }

    #[test]
    fn test_missing_intermediate() {
        let device = sample_tree();
        let err = resolve_parent(&device, "/usr/lib/x").unwrap_err();

        assert_eq!(failure(err), FsError::NoSuchDirectory("/usr".to_owned()));
    }

    #[test]
    fn test_file_as_intermediate() {
        let device = sample_tree();
        let err = resolve_parent(&device, "/etc/passwd/x").unwrap_err();

        assert_eq!(failure(err), FsError::NotADirectory("/etc/passwd".to_owned()));
    }

    #[test]
    fn test_resolve_directory() {
        let device = sample_tree();

        assert_eq!(resolve_directory(&device, "/").unwrap(), ROOT_INODE);
        assert_eq!(resolve_directory(&device, "").unwrap(), ROOT_INODE);
        assert_eq!(resolve_directory(&device, "/etc").unwrap(), 1);
        assert_eq!(resolve_directory(&device, "/etc/ssh/").unwrap(), 4);
    }

    #[test]
    fn test_resolve_directory_failures() {
        let device = sample_tree();

        let err = resolve_directory(&device, "/notes").unwrap_err();
        assert_eq!(failure(err), FsError::NotADirectory("/notes".to_owned()));

        let err = resolve_directory(&device, "/etc/nope").unwrap_err();
        assert_eq!(failure(err), FsError::NoSuchDirectory("/etc/nope".to_owned()));
    }

    #[test]
    fn test_lookup_prefers_wanted_type() {
        let device = sample_tree();

        let mut block = DirectoryBlock::read(&device, 34).unwrap();
        block
            .set_entry(2, DirectoryEntry::new(7, "notes", EntryType::Directory).unwrap())
            .unwrap();
        block.write(&device).unwrap();

        assert_eq!(lookup(&device, 0, "notes", true).unwrap().unwrap().inum, 7);
        assert_eq!(lookup(&device, 0, "notes", false).unwrap().unwrap().inum, 2);
        assert!(lookup(&device, 0, "absent", false).unwrap().is_none());
    }

    #[test]
    fn test_lookup_in_file() {
        let device = sample_tree();
        let err = lookup(&device, 2, "x", false).unwrap_err();

        assert!(matches!(failure(err), FsError::NotADirectory(_)));
    }
}
