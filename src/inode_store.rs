//! Reading and writing inode records in the inode table.
//!
//! Writes only touch the record itself. Allocation is the superblock manager's business.

use anyhow::{Context, Result};

use crate::{
    addressing::inode_block_address,
    disk_format::inode::{Inode, INODE_SIZE},
    storage::BlockDevice,
    tinyfs::InodeNumber,
};

pub fn read_inode<D: BlockDevice>(device: &D, inum: InodeNumber) -> Result<Inode> {
    let address = inode_block_address(inum)?;
    let offset = address.slot * INODE_SIZE;

    let block = device
        .read_block(address.block)
        .with_context(|| format!("reading inode {inum}"))?;
    let inode = &block[offset..offset + INODE_SIZE];

    bincode::deserialize(inode).with_context(|| format!("parsing inode {inum}"))
}

pub fn write_inode<D: BlockDevice>(device: &D, inum: InodeNumber, inode: &Inode) -> Result<()> {
    let address = inode_block_address(inum)?;
    let offset = address.slot * INODE_SIZE;

    let inode_serialized = bincode::serialize(inode).context("serializing inode")?;

    // the other inodes sharing the block must survive the write
    let mut block = device
        .read_block(address.block)
        .with_context(|| format!("reading inode {inum}"))?;
    block[offset..offset + INODE_SIZE].copy_from_slice(&inode_serialized);

    device
        .write_block(address.block, block)
        .with_context(|| format!("writing inode {inum}"))
}

/// Reads an inode, applies `update` to it and writes it back.
pub fn update_inode<D, F>(device: &D, inum: InodeNumber, update: F) -> Result<Inode>
where
    D: BlockDevice,
    F: FnOnce(&mut Inode),
{
    let mut inode = read_inode(device, inum)?;
    update(&mut inode);
    write_inode(device, inum, &inode)?;

    Ok(inode)
}

#[cfg(test)]
mod tests {
    use crate::{
        disk_format::{
            block::DEVICE_BLOCK_SIZE,
            inode::{InodeType, FREE_INODE, NUM_INODES},
        },
        error::FsError,
        storage::MemoryDevice,
    };

    use super::*;

    fn directory_inode(first_block: u32) -> Inode {
        let mut inode = Inode::new(InodeType::Directory);
        inode.size = 1;
        inode.link = 3;
        inode.direct[0] = first_block;
        inode
    }

    #[test]
    fn test_blank_table_reads_free_inodes() {
        let device = MemoryDevice::volume();
        assert_eq!(read_inode(&device, 0).unwrap(), FREE_INODE);
        assert_eq!(read_inode(&device, 1023).unwrap(), FREE_INODE);
    }

    #[test]
    fn test_round_trip() {
        let device = MemoryDevice::volume();
        let inode = directory_inode(33);

        write_inode(&device, 17, &inode).unwrap();
        assert_eq!(read_inode(&device, 17).unwrap(), inode);
    }

    #[test]
    fn test_write_preserves_neighbours() {
        let device = MemoryDevice::volume();
        let first = directory_inode(40);
        let second = Inode::new(InodeType::File);
        let third = directory_inode(41);

        write_inode(&device, 16, &first).unwrap();
        write_inode(&device, 17, &second).unwrap();
        write_inode(&device, 31, &third).unwrap();

        assert_eq!(read_inode(&device, 16).unwrap(), first);
        assert_eq!(read_inode(&device, 17).unwrap(), second);
        assert_eq!(read_inode(&device, 31).unwrap(), third);
        assert_eq!(read_inode(&device, 18).unwrap(), FREE_INODE);
    }

    #[test]
    fn test_bytes_land_in_the_table() {
        let device = MemoryDevice::volume();
        write_inode(&device, 17, &directory_inode(33)).unwrap();

        let block = device.read_block(3).unwrap();
        let record = &block[INODE_SIZE..2 * INODE_SIZE];
        assert_eq!(record[0..4], [1, 0, 0, 0]);
        assert_eq!(record[8..12], [33, 0, 0, 0]);
        assert!(block[..INODE_SIZE].iter().all(|b| *b == 0));
        assert!(block[2 * INODE_SIZE..DEVICE_BLOCK_SIZE].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_update() {
        let device = MemoryDevice::volume();
        write_inode(&device, 2, &directory_inode(33)).unwrap();

        let updated = update_inode(&device, 2, |inode| {
            inode.direct[1] = 50;
            inode.size += 1;
        })
        .unwrap();

        assert_eq!(updated.size, 2);
        assert_eq!(read_inode(&device, 2).unwrap(), updated);
    }

    #[test]
    fn test_out_of_range() {
        let device = MemoryDevice::volume();
        let inum = NUM_INODES as InodeNumber;

        let err = read_inode(&device, inum).unwrap_err();
        assert_eq!(err.downcast_ref::<FsError>(), Some(&FsError::InodeOutOfRange(inum)));
        assert!(write_inode(&device, inum, &FREE_INODE).is_err());
    }

    #[test]
    fn test_device_failure() {
        let device = MemoryDevice::volume();
        device.set_fail_writes(true);

        assert!(write_inode(&device, 1, &directory_inode(33)).is_err());
    }
}
