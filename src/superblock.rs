use core::fmt;
use core::ops::Add;

use bitflags::bitflags;
use zerocopy::{FromBytes, FromZeroes};

use crate::block::BlockSize;
use crate::block_group::InodeTableBlockAddress;
use crate::strings::CStringBytes;

/// See <https://www.nongnu.org/ext2-doc/ext2.html#superblock>
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromZeroes, FromBytes)]
pub struct Superblock {
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub reserved_blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub first_data_block: BlockAddress,
    pub log_block_size: u32,
    pub log_frag_size: u32,
    pub blocks_per_group: u32,
    pub frags_per_group: u32,
    pub inodes_per_group: u32,
    pub mount_time: u32,
    pub write_time: u32,
    pub mount_count: u16,
    pub max_mount_count: u16,
    pub magic: u16,
    pub state: u16,
    pub errors: u16,
    pub minor_rev_level: u16,
    pub lastcheck: u32,
    pub checkinterval: u32,
    pub creator_os: u32,
    pub rev_level: u32,
    pub def_resuid: u16,
    pub def_resgid: u16,

    // EXT2_DYNAMIC_REV Specific
    pub first_ino: u32,
    pub inode_size: u16,
    pub block_group_nr: u16,
    pub feature_compat: FeatureCompatFlags,
    pub feature_incompat: FeatureIncompatFlags,
    pub feature_ro_compat: FeatureReadOnlyCompatFlags,
    pub uuid: UUID,
    pub volume_name: CStringBytes<[u8; 16]>,
    pub last_mounted: CStringBytes<[u8; 64]>,
    pub algo_bitmap: u32,

    // Performance Hints
    pub prealloc_blocks: u8,
    pub prealloc_dir_blocks: u8,
    pub padding1: u16,

    // Journaling Support
    pub journal_uuid: UUID,
    pub journal_inum: u32,
    pub journal_dev: u32,
    pub last_orphan: u32,

    // Directory Indexing Support
    pub hash_seed: [u32; 4],
    pub def_hash_version: u8,
    pub padding2: [u8; 3],

    // Other options
    pub default_mount_options: u32,
    pub first_meta_bg: u32,
}

impl Superblock {
    /// The superblock is always located at byte offset 1024 from the beginning of
    /// the file, block device or partition formatted with Ext2 and later variants
    /// (Ext3, Ext4).
    pub const OFFSET_BYTES: OffsetBytes = OffsetBytes(1024);

    /// 16bit value identifying the file system as Ext2. The value is currently
    /// fixed to EXT2_SUPER_MAGIC of value 0xEF53.
    /// <https://www.nongnu.org/ext2-doc/ext2.html#s-magic>
    pub const MAGIC: u16 = 0xEF53;

    /// Revision 0 volumes have no `inode_size` field; their inodes are always
    /// 128 bytes.
    pub const GOOD_OLD_INODE_SIZE: u16 = 128;

    pub fn magic_valid(&self) -> bool {
        self.magic == Self::MAGIC
    }

    /// The block size the superblock itself claims:
    ///
    /// ```text
    /// block size = 1024 << s_log_block_size;
    /// ```
    ///
    /// Only reported; block arithmetic uses the configured block size.
    pub fn declared_block_size(&self) -> Option<u64> {
        1024_u64.checked_shl(self.log_block_size)
    }

    /// The block group descriptor table occupies the block right after the
    /// one holding the superblock.
    pub fn block_descriptor_table_offset(block_size: BlockSize) -> OffsetBytes {
        let superblock_block = Self::OFFSET_BYTES.0 / block_size.bytes();
        OffsetBytes((superblock_block + 1) * block_size.bytes())
    }

    pub fn num_block_groups(&self) -> u32 {
        if self.blocks_per_group == 0 {
            return 0;
        }
        self.blocks_count.div_ceil(self.blocks_per_group)
    }

    /// Size of one record in the inode table.
    pub fn inode_record_size(&self) -> u16 {
        if self.rev_level == 0 {
            return Self::GOOD_OLD_INODE_SIZE;
        }
        self.inode_size
    }

    pub fn volume_name(&self) -> &str {
        self.volume_name.as_str()
    }

    /// Index for the block group containing the inode.
    pub fn inode_location(&self, inode_number: InodeNumber) -> (BlockGroupIndex, LocalInodeIndex) {
        let inode_index = inode_number.0 - 1;
        let block_group_index = BlockGroupIndex(inode_index / self.inodes_per_group);
        let local_inode_index = LocalInodeIndex(inode_index % self.inodes_per_group);
        (block_group_index, local_inode_index)
    }

    /// Convert from local inode index to global inode number.
    pub fn inode_number(
        &self,
        block_group_index: BlockGroupIndex,
        local_inode_index: LocalInodeIndex,
    ) -> InodeNumber {
        let inode_index = block_group_index.0 * self.inodes_per_group + local_inode_index.0;
        InodeNumber(inode_index + 1)
    }

    /// See <https://www.nongnu.org/ext2-doc/ext2.html#inode-table>
    ///
    /// Absolute byte offset of an inode record:
    /// `inode_table_block * block_size + inode_record_size * local_index`.
    pub fn inode_offset(
        &self,
        table_address: InodeTableBlockAddress,
        local_inode_index: LocalInodeIndex,
        block_size: BlockSize,
    ) -> OffsetBytes {
        let table_offset = table_address.0.offset(block_size);
        let record_offset =
            u64::from(self.inode_record_size()) * u64::from(local_inode_index.0);
        table_offset + OffsetBytes(record_offset)
    }
}

/// Address of a block in the filesystem.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, FromZeroes, FromBytes, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockAddress(pub u32);

impl BlockAddress {
    /// A zero block pointer marks a hole.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self, block_size: BlockSize) -> OffsetBytes {
        OffsetBytes(u64::from(self.0) * block_size.bytes())
    }
}

impl Add<u32> for BlockAddress {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// Address in bytes from the start of the disk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OffsetBytes(pub u64);

impl Add<Self> for OffsetBytes {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

/// "Global" inode number within the filesystem.
#[derive(Debug, Copy, Clone, FromZeroes, FromBytes, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct InodeNumber(pub u32);

impl InodeNumber {
    /// Inode numbers start at 1, so 0 never names an inode. Lookups return it
    /// when nothing matched.
    pub const INVALID: Self = Self(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The root directory of the filesystem is always inode 2.
pub const ROOT_DIRECTORY: InodeNumber = InodeNumber(2);

/// A `LocalInodeIndex` is an inode's index within a block group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocalInodeIndex(pub u32);

/// Index for a given block group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockGroupIndex(pub u32);

/// <https://www.nongnu.org/ext2-doc/ext2.html#s-feature-compat>
#[derive(Debug, Copy, Clone, FromZeroes, FromBytes)]
#[repr(transparent)]
pub struct FeatureCompatFlags(u32);

bitflags! {
    impl FeatureCompatFlags: u32 {
        /// Block pre-allocation for new directories
        const DIR_PREALLOC = 0x0001;

        const IMAGIC_INODES = 0x0002;

        /// An Ext3 journal exists
        const HAS_JOURNAL = 0x0004;

        /// Extended inode attributes are present
        const EXT_ATTR = 0x0008;

        /// Non-standard inode size used
        const RESIZE_INODE = 0x0010;

        /// Directory indexing (HTree)
        const DIR_INDEX = 0x0020;
    }
}

#[derive(Debug, Copy, Clone, FromZeroes, FromBytes)]
#[repr(transparent)]
/// <https://www.nongnu.org/ext2-doc/ext2.html#s-feature-incompat>
pub struct FeatureIncompatFlags(u32);

bitflags! {
    impl FeatureIncompatFlags: u32 {
        /// Disk/File compression is used
        const COMPRESSION = 0x0001;
        const FILETYPE = 0x0002;
        const RECOVER = 0x0004;
        const JOURNAL_DEV = 0x0008;
        const META_BG = 0x0010;
    }
}

#[derive(Debug, Copy, Clone, FromZeroes, FromBytes)]
#[repr(transparent)]
/// <https://www.nongnu.org/ext2-doc/ext2.html#s-feature-ro-compat>
pub struct FeatureReadOnlyCompatFlags(u32);

bitflags! {
    impl FeatureReadOnlyCompatFlags: u32 {
        /// Sparse Superblock
        const SPARSE_SUPER = 0x0001;

        /// Filesystem uses a 64bit file size
        const LARGE_FILE = 0x0002;

        /// Binary tree sorted directory files
        const BTREE_DIR = 0x0004;
    }
}

#[derive(Copy, Clone, FromZeroes, FromBytes)]
#[repr(transparent)]
pub struct UUID(pub [u8; 16]);

impl fmt::Debug for UUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_bytes = |f: &mut fmt::Formatter<'_>, start: usize, end: usize| -> fmt::Result {
            for i in start..=end {
                write!(f, "{:02x}", self.0[i])?;
            }
            Ok(())
        };

        write!(f, "UUID(")?;
        write_bytes(f, 0, 3)?;
        write!(f, "-")?;
        write_bytes(f, 4, 5)?;
        write!(f, "-")?;
        write_bytes(f, 6, 7)?;
        write!(f, "-")?;
        write_bytes(f, 8, 9)?;
        write!(f, "-")?;
        write_bytes(f, 10, 15)?;
        write!(f, ")")
    }
}
