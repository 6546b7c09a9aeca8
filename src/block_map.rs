//! Resolution of an inode's block pointers into the physical blocks that hold
//! its data.
//!
//! See <https://www.nongnu.org/ext2-doc/ext2.html#i-block>

use crate::block::{BlockSize, BlockSource};
use crate::error::VolumeError;
use crate::inode::Inode;
use crate::superblock::BlockAddress;

/// Index of a block within a file, counting from the start of the file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileBlockIndex(pub u64);

/// One allocated block of a file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockMapping {
    pub logical: FileBlockIndex,
    pub physical: BlockAddress,
}

/// The allocated blocks of one inode, in file order.
///
/// Holes (zero pointers) have no mapping, so `mappings().len()` can be smaller
/// than the number of blocks the file logically spans.
#[derive(Debug, Clone)]
pub struct BlockMap {
    mappings: Vec<BlockMapping>,
    logical_blocks: u64,
    block_size: BlockSize,
}

impl BlockMap {
    /// Walks the direct, singly, doubly and triply indirect pointers of
    /// `inode` until the inode's size is covered.
    pub fn build<S: BlockSource>(
        source: &S,
        inode: &Inode,
        block_size: BlockSize,
    ) -> Result<Self, VolumeError> {
        let mut builder = BlockMapBuilder {
            source,
            block_size,
            declared_size: inode.size(),
            logical: 0,
            mappings: Vec::new(),
        };

        for pointer in inode.direct_blocks().iter() {
            if builder.covered() {
                break;
            }
            builder.push(pointer);
        }

        builder.walk_indirect(inode.singly_indirect_block, 1)?;
        builder.walk_indirect(inode.doubly_indirect_block, 2)?;
        builder.walk_indirect(inode.triply_indirect_block, 3)?;

        log::trace!(
            "block map: {} of {} logical blocks allocated",
            builder.mappings.len(),
            builder.logical
        );
        Ok(Self {
            mappings: builder.mappings,
            logical_blocks: builder.logical,
            block_size,
        })
    }

    pub fn mappings(&self) -> &[BlockMapping] {
        &self.mappings
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockMapping> {
        self.mappings.iter()
    }

    /// Physical block backing `logical`, or `None` for a hole or a block past
    /// the end of the file.
    pub fn physical(&self, logical: FileBlockIndex) -> Option<BlockAddress> {
        // Mappings are built in strictly increasing logical order.
        self.mappings
            .binary_search_by_key(&logical, |mapping| mapping.logical)
            .ok()
            .map(|index| self.mappings[index].physical)
    }

    /// Number of logical blocks accounted for while walking the pointers,
    /// holes included.
    pub fn logical_blocks(&self) -> u64 {
        self.logical_blocks
    }

    /// Number of blocks that are actually allocated.
    pub fn materialized_blocks(&self) -> u64 {
        self.mappings.len() as u64
    }

    /// Byte length of the allocated blocks. For sparse files this differs from
    /// the inode's size.
    pub fn materialized_len(&self) -> u64 {
        self.materialized_blocks() * self.block_size.bytes()
    }
}

struct BlockMapBuilder<'a, S> {
    source: &'a S,
    block_size: BlockSize,
    declared_size: u64,
    logical: u64,
    mappings: Vec<BlockMapping>,
}

impl<S: BlockSource> BlockMapBuilder<'_, S> {
    /// True once enough logical blocks have been seen to hold the inode's size.
    fn covered(&self) -> bool {
        self.logical.saturating_mul(self.block_size.bytes()) >= self.declared_size
    }

    fn push(&mut self, pointer: BlockAddress) {
        if !pointer.is_null() {
            self.mappings.push(BlockMapping {
                logical: FileBlockIndex(self.logical),
                physical: pointer,
            });
        }
        self.logical += 1;
    }

    /// Blocks addressed by one pointer at the given indirection level.
    fn span(&self, level: u32) -> u64 {
        self.block_size.pointers_per_block().pow(level)
    }

    /// Walks the pointer tree below `pointer`. A null pointer stands for a
    /// hole spanning everything it could have addressed.
    fn walk_indirect(&mut self, pointer: BlockAddress, level: u32) -> Result<(), VolumeError> {
        if self.covered() {
            return Ok(());
        }
        if pointer.is_null() {
            self.logical += self.span(level);
            return Ok(());
        }

        let block = self
            .source
            .read_num_bytes(pointer.offset(self.block_size), self.block_size.as_usize())?;
        let entries = block
            .chunks_exact(4)
            .map(|bytes| BlockAddress(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])));

        for entry in entries {
            if self.covered() {
                break;
            }
            if level == 1 {
                self.push(entry);
            } else {
                self.walk_indirect(entry, level - 1)?;
            }
        }
        Ok(())
    }
}
