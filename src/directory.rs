use zerocopy::{FromBytes, FromZeroes};

use crate::block::{BlockSize, BlockSource};
use crate::block_map::BlockMap;
use crate::error::VolumeError;
use crate::superblock::InodeNumber;

/// See <https://www.nongnu.org/ext2-doc/ext2.html#linked-directories>
#[derive(Debug, Clone)]
pub struct DirectoryBlock<'a>(pub &'a [u8]);

impl DirectoryBlock<'_> {
    pub fn iter(&self) -> DirectoryBlockIterator<'_> {
        DirectoryBlockIterator {
            block: self.0,
            offset: 0,
        }
    }
}

/// Walks the records of one directory block, skipping deleted entries and
/// padding.
///
/// Iteration stops early at a record whose length is too small to hold a
/// header or runs past the end of the block, since nothing after it can be
/// located.
pub struct DirectoryBlockIterator<'a> {
    block: &'a [u8],
    offset: usize,
}

impl Iterator for DirectoryBlockIterator<'_> {
    type Item = DirectoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.block.get(self.offset..)?;
            let header = DirectoryEntryHeader::read_from_prefix(record)?;

            let rec_len = usize::from(header.rec_len);
            if rec_len < DirectoryEntryHeader::SIZE || rec_len > record.len() {
                log::debug!(
                    "directory record at offset {} has bad length {rec_len}",
                    self.offset
                );
                self.offset = self.block.len();
                return None;
            }
            self.offset += rec_len;

            let inode = header.inode;
            let name_len = usize::from(header.name_len);
            if !inode.is_valid() || name_len == 0 {
                continue;
            }

            let name_end = DirectoryEntryHeader::SIZE + name_len;
            let Some(name) = record[..rec_len].get(DirectoryEntryHeader::SIZE..name_end) else {
                log::debug!("directory entry for inode {inode} overruns its record");
                continue;
            };

            return Some(DirectoryEntry {
                inode,
                rec_len: header.rec_len,
                file_type: DirectoryEntryFileType::from(header.file_type),
                name: String::from_utf8_lossy(name).into_owned(),
            });
        }
    }
}

/// A live directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub inode: InodeNumber,
    pub rec_len: u16,
    /// Only a hint: volumes without the `FILETYPE` feature leave it zero.
    pub file_type: DirectoryEntryFileType,
    pub name: String,
}

impl DirectoryEntry {
    pub fn name_len(&self) -> usize {
        self.name.len()
    }
}

/// See <https://www.nongnu.org/ext2-doc/ext2.html#linked-directory-entry-structure>
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromZeroes, FromBytes)]
pub struct DirectoryEntryHeader {
    pub inode: InodeNumber,
    pub rec_len: u16,
    pub name_len: u8,
    pub file_type: u8,
}

impl DirectoryEntryHeader {
    const SIZE: usize = core::mem::size_of::<Self>();
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DirectoryEntryFileType {
    Unknown,
    RegularFile,
    Directory,
    CharacterDevice,
    BlockDevice,
    Fifo,
    Socket,
    SymbolicLink,
}

impl From<u8> for DirectoryEntryFileType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::RegularFile,
            2 => Self::Directory,
            3 => Self::CharacterDevice,
            4 => Self::BlockDevice,
            5 => Self::Fifo,
            6 => Self::Socket,
            7 => Self::SymbolicLink,
            _ => Self::Unknown,
        }
    }
}

/// Reads every live entry of a directory, block by block in file order.
pub fn read_directory<S: BlockSource>(
    source: &S,
    block_map: &BlockMap,
    block_size: BlockSize,
) -> Result<Vec<DirectoryEntry>, VolumeError> {
    let mut entries = Vec::new();
    for mapping in block_map.iter() {
        let block = source.read_num_bytes(mapping.physical.offset(block_size), block_size.as_usize())?;
        let before = entries.len();
        entries.extend(DirectoryBlock(&block).iter());
        log::trace!(
            "directory block {} (logical {}): {} entries",
            mapping.physical.0,
            mapping.logical.0,
            entries.len() - before
        );
    }
    Ok(entries)
}
