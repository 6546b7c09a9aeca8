use zerocopy::{FromBytes, FromZeroes};

use crate::block::{BlockSize, BlockSource};
use crate::error::VolumeError;
use crate::superblock::{BlockAddress, Superblock};

/// See <https://www.nongnu.org/ext2-doc/ext2.html#block-group-descriptor-structure>
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromZeroes, FromBytes)]
pub struct BlockGroupDescriptor {
    pub block_bitmap: BlockAddress,
    pub inode_bitmap: BlockAddress,
    pub inode_table: InodeTableBlockAddress,
    pub free_blocks_count: u16,
    pub free_inodes_count: u16,
    pub used_dirs_count: u16,
    _pad: u16,
    _reserved: [u8; 12],
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, FromZeroes, FromBytes)]
pub struct InodeTableBlockAddress(pub BlockAddress);

/// The descriptors of every block group, in group order.
#[derive(Debug)]
pub struct BlockGroupDescriptorTable {
    descriptors: Vec<BlockGroupDescriptor>,
}

impl BlockGroupDescriptorTable {
    /// Reads one descriptor per block group from the table that follows the
    /// superblock.
    pub fn read<S: BlockSource>(
        source: &S,
        superblock: &Superblock,
        block_size: BlockSize,
    ) -> Result<Self, VolumeError> {
        let num_block_groups = superblock.num_block_groups() as usize;
        let descriptor_size = core::mem::size_of::<BlockGroupDescriptor>();
        let table_offset = Superblock::block_descriptor_table_offset(block_size);
        let buf = source.read_num_bytes(table_offset, num_block_groups.saturating_mul(descriptor_size))?;

        let descriptors = buf
            .chunks_exact(descriptor_size)
            .filter_map(BlockGroupDescriptor::read_from)
            .collect::<Vec<_>>();
        debug_assert_eq!(descriptors.len(), num_block_groups);

        Ok(Self { descriptors })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockGroupDescriptor> {
        self.descriptors.iter()
    }
}
