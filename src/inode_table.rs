use zerocopy::{FromBytes, FromZeroes};

use crate::block::{BlockSize, BlockSource};
use crate::block_group::BlockGroupDescriptorTable;
use crate::error::VolumeError;
use crate::inode::Inode;
use crate::superblock::{BlockGroupIndex, InodeNumber, LocalInodeIndex, Superblock};

/// Every inode slot in the volume, indexed by global inode number.
///
/// Slot 0 holds a zeroed placeholder so that inode numbers index the table
/// directly; [`InodeTable::get`] never returns it.
#[derive(Debug)]
pub struct InodeTable {
    inodes: Vec<Inode>,
}

impl InodeTable {
    /// Decodes every inode record of every block group.
    pub fn read<S: BlockSource>(
        source: &S,
        superblock: &Superblock,
        block_group_descriptors: &BlockGroupDescriptorTable,
        block_size: BlockSize,
    ) -> Result<Self, VolumeError> {
        let record_size = superblock.inode_record_size();
        if usize::from(record_size) < core::mem::size_of::<Inode>() {
            return Err(VolumeError::InvalidInodeSize(record_size));
        }

        let inodes_per_group = superblock.inodes_per_group;
        let tables_len = u64::from(record_size)
            .checked_mul(u64::from(inodes_per_group))
            .and_then(|len| len.checked_mul(block_group_descriptors.len() as u64));
        if !tables_len.is_some_and(|len| len <= source.volume_len()) {
            return Err(VolumeError::InvalidGeometry(
                "inode tables are larger than the volume",
            ));
        }

        let capacity = block_group_descriptors.len() * inodes_per_group as usize + 1;
        let mut inodes = Vec::with_capacity(capacity);
        inodes.push(Inode::new_zeroed());

        for (group, descriptor) in block_group_descriptors.iter().enumerate() {
            // The whole group's table is read at once; each record is then
            // decoded from `inode_table * block_size + record_size * index`.
            let table_offset = superblock.inode_offset(
                descriptor.inode_table,
                LocalInodeIndex(0),
                block_size,
            );
            let table_len = usize::from(record_size) * inodes_per_group as usize;
            let buf = source.read_num_bytes(table_offset, table_len)?;

            for local in 0..inodes_per_group {
                let start = usize::from(record_size) * local as usize;
                let inode = Inode::read_from_prefix(&buf[start..])
                    .ok_or(VolumeError::InvalidInodeSize(record_size))?;
                debug_assert_eq!(
                    superblock.inode_number(BlockGroupIndex(group as u32), LocalInodeIndex(local)),
                    InodeNumber(inodes.len() as u32)
                );
                inodes.push(inode);
            }
        }

        log::debug!(
            "read {} inodes from {} block groups",
            inodes.len() - 1,
            block_group_descriptors.len()
        );
        Ok(Self { inodes })
    }

    pub fn get(&self, inode_number: InodeNumber) -> Option<&Inode> {
        if !inode_number.is_valid() {
            return None;
        }
        self.inodes.get(inode_number.0 as usize)
    }

    /// Number of inode slots, not counting the reserved slot 0.
    pub fn len(&self) -> usize {
        self.inodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::block::MemoryBlockSource;
    use crate::test_image::{ImageBuilder, INODES_PER_GROUP};

    fn read_table(image: Vec<u8>) -> Result<InodeTable, VolumeError> {
        let source = MemoryBlockSource::new(image);
        let superblock: Superblock = source.read_bytes(Superblock::OFFSET_BYTES)?;
        let descriptors =
            BlockGroupDescriptorTable::read(&source, &superblock, BlockSize::DEFAULT)?;
        InodeTable::read(&source, &superblock, &descriptors, BlockSize::DEFAULT)
    }

    #[test]
    fn one_slot_per_inode() {
        let image = ImageBuilder::new(64).build();
        let table = read_table(image).unwrap();
        assert_eq!(table.len(), INODES_PER_GROUP as usize);
        assert!(table.get(InodeNumber::INVALID).is_none());
        assert!(table.get(InodeNumber(INODES_PER_GROUP)).is_some());
        assert!(table.get(InodeNumber(INODES_PER_GROUP + 1)).is_none());
    }

    #[test]
    fn inodes_land_at_their_numbers() {
        let mut builder = ImageBuilder::new(64);
        builder.inode(InodeNumber(7)).mode(0o100600).size(42).uid(501);
        let table = read_table(builder.build()).unwrap();

        let inode = table.get(InodeNumber(7)).unwrap();
        assert!(inode.is_file());
        assert_eq!(inode.size(), 42);
        assert_eq!(inode.uid(), 501);

        let root = table.get(crate::superblock::ROOT_DIRECTORY).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn truncated_inode_table_fails() {
        let mut image = ImageBuilder::new(64).build();
        image.truncate(6 * 1024);
        assert!(matches!(
            read_table(image),
            Err(VolumeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn oversized_inode_tables_are_rejected_before_reading() {
        let mut image = ImageBuilder::new(64).build();
        image[1024 + 0x28..1024 + 0x2C].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            read_table(image),
            Err(VolumeError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn rejects_tiny_inode_records() {
        let mut builder = ImageBuilder::new(64);
        builder.inode_record_size(64);
        assert!(matches!(
            read_table(builder.build()),
            Err(VolumeError::InvalidInodeSize(64))
        ));
    }
}
