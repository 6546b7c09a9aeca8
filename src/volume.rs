use std::path::Path;

use crate::block::{BlockSize, BlockSource, FileBlockSource};
use crate::block_group::BlockGroupDescriptorTable;
use crate::block_map::BlockMap;
use crate::directory::{read_directory, DirectoryEntry, DirectoryEntryFileType};
use crate::error::{Error, Result, VolumeError};
use crate::file::FileHandle;
use crate::inode::Inode;
use crate::inode_table::InodeTable;
use crate::listing::Listing;
use crate::path::{split_file_path, DirectoryHandle, PathCursor};
use crate::superblock::{BlockAddress, InodeNumber, Superblock};

/// Knobs for opening a volume.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct VolumeOptions {
    /// Block size used for all block arithmetic. The superblock's own
    /// `log_block_size` is only reported.
    pub block_size: BlockSize,
}

/// Opens the ext2 image at `path` with default options.
pub fn open_volume<P: AsRef<Path>>(path: P) -> Result<Volume<FileBlockSource>, VolumeError> {
    let path = path.as_ref();
    log::debug!("opening volume image {}", path.display());
    Volume::open(FileBlockSource::open(path)?)
}

/// An opened ext2 volume: its decoded metadata plus the image it came from.
///
/// Everything is read eagerly at open time. Afterwards the volume is never
/// mutated, so any number of cursors and file handles can borrow it at once.
#[derive(Debug)]
pub struct Volume<S> {
    source: S,
    options: VolumeOptions,
    superblock: Superblock,
    block_groups: BlockGroupDescriptorTable,
    inode_table: InodeTable,
}

impl<S: BlockSource> Volume<S> {
    pub fn open(source: S) -> Result<Self, VolumeError> {
        Self::open_with_options(source, VolumeOptions::default())
    }

    pub fn open_with_options(source: S, options: VolumeOptions) -> Result<Self, VolumeError> {
        let block_size = options.block_size;
        if block_size.bytes() < 1024 || !block_size.bytes().is_power_of_two() {
            return Err(VolumeError::InvalidGeometry(
                "block size must be a power of two of at least 1024 bytes",
            ));
        }

        let superblock: Superblock = source.read_bytes(Superblock::OFFSET_BYTES)?;
        if !superblock.magic_valid() {
            return Err(VolumeError::BadMagic {
                found: superblock.magic,
            });
        }
        if superblock.blocks_per_group == 0 {
            return Err(VolumeError::InvalidGeometry("zero blocks per group"));
        }
        if superblock.inodes_per_group == 0 {
            return Err(VolumeError::InvalidGeometry("zero inodes per group"));
        }
        if superblock.declared_block_size() != Some(block_size.bytes()) {
            log::warn!(
                "superblock declares a block size of {:?} but {} bytes is configured",
                superblock.declared_block_size(),
                block_size.bytes()
            );
        }

        let block_groups = BlockGroupDescriptorTable::read(&source, &superblock, block_size)?;
        let inode_table = InodeTable::read(&source, &superblock, &block_groups, block_size)?;

        log::info!(
            "opened ext2 volume {:?}: {} blocks, {} inodes, {} block groups",
            superblock.volume_name(),
            { superblock.blocks_count },
            { superblock.inodes_count },
            block_groups.len()
        );

        Ok(Self {
            source,
            options,
            superblock,
            block_groups,
            inode_table,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> VolumeOptions {
        self.options
    }

    pub fn block_size(&self) -> BlockSize {
        self.options.block_size
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn block_groups(&self) -> &BlockGroupDescriptorTable {
        &self.block_groups
    }

    pub fn inode_table(&self) -> &InodeTable {
        &self.inode_table
    }

    pub fn label(&self) -> &str {
        self.superblock.volume_name()
    }

    pub fn inode(&self, inode_number: InodeNumber) -> Result<&Inode> {
        self.inode_table
            .get(inode_number)
            .ok_or(Error::InvalidInode(inode_number.0))
    }

    pub fn block_map(&self, inode_number: InodeNumber) -> Result<BlockMap> {
        let inode = self.inode(inode_number)?;
        let block_map = BlockMap::build(&self.source, inode, self.block_size())?;
        log::debug!(
            "inode {inode_number}: {} bytes in {} allocated blocks",
            inode.size(),
            block_map.materialized_blocks()
        );
        Ok(block_map)
    }

    /// Raw contents of one physical block.
    pub fn read_block(&self, block: BlockAddress) -> Result<Vec<u8>, VolumeError> {
        self.source
            .read_num_bytes(block.offset(self.block_size()), self.block_size().as_usize())
    }

    pub fn directory_entries(&self, directory: InodeNumber) -> Result<Vec<DirectoryEntry>> {
        let block_map = self.block_map(directory)?;
        Ok(read_directory(&self.source, &block_map, self.block_size())?)
    }

    /// An entry names a directory when its type hint says so, or when the
    /// inode it points at is a directory.
    pub(crate) fn is_directory_entry(&self, entry: &DirectoryEntry) -> bool {
        entry.file_type == DirectoryEntryFileType::Directory
            || self
                .inode_table
                .get(entry.inode)
                .is_some_and(Inode::is_dir)
    }

    /// The subdirectory of `directory` called `name`, if there is one.
    pub(crate) fn find_directory(
        &self,
        directory: InodeNumber,
        name: &str,
    ) -> Result<Option<InodeNumber>> {
        Ok(self
            .directory_entries(directory)?
            .into_iter()
            .find(|entry| entry.name == name && self.is_directory_entry(entry))
            .map(|entry| entry.inode))
    }

    /// Finds the non-directory entry called `name` in `directory`.
    ///
    /// A missing file is not an error: it is logged and reported as
    /// [`InodeNumber::INVALID`].
    pub fn lookup_file(&self, directory: InodeNumber, name: &str) -> Result<InodeNumber> {
        let found = self
            .directory_entries(directory)?
            .into_iter()
            .find(|entry| entry.name == name && !self.is_directory_entry(entry));
        match found {
            Some(entry) => Ok(entry.inode),
            None => {
                log::warn!("Failed to find file {name}");
                Ok(InodeNumber::INVALID)
            }
        }
    }

    /// A cursor positioned at the root directory.
    pub fn cursor(&self) -> PathCursor<'_, S> {
        PathCursor::new(self)
    }

    pub fn resolve_directory(&self, path: &str) -> Result<DirectoryHandle<'_, S>> {
        let mut cursor = self.cursor();
        cursor.resolve(path)?;
        Ok(cursor.directory())
    }

    pub fn list(&self, path: &str) -> Result<Listing> {
        self.resolve_directory(path)?.list()
    }

    /// Opens the regular file at `path`, relative to the root directory.
    pub fn open_file(&self, path: &str) -> Result<FileHandle<'_, S>> {
        let (directory, name) = split_file_path(path);
        let not_found = || Error::FileNotFound {
            path: path.to_owned(),
        };

        let directory = match self.resolve_directory(directory) {
            Ok(handle) => handle,
            Err(Error::PathNotFound { .. }) => return Err(not_found()),
            Err(err) => return Err(err),
        };
        match directory.lookup_file(name)? {
            inode_number if inode_number.is_valid() => FileHandle::open(self, inode_number),
            _ => Err(not_found()),
        }
    }
}
