use std::io::Write;

use crate::block::BlockSource;
use crate::block_map::{BlockMap, FileBlockIndex};
use crate::error::{Error, Result};
use crate::inode::Inode;
use crate::superblock::{InodeNumber, OffsetBytes};
use crate::volume::Volume;

/// Random access to the contents of one inode.
///
/// Reads never change the position: `read` always starts at the last `seek`.
#[derive(Debug)]
pub struct FileHandle<'a, S> {
    volume: &'a Volume<S>,
    inode_number: InodeNumber,
    inode: &'a Inode,
    block_map: BlockMap,
    position: u64,
}

impl<'a, S: BlockSource> FileHandle<'a, S> {
    pub fn open(volume: &'a Volume<S>, inode_number: InodeNumber) -> Result<Self> {
        let inode = volume.inode(inode_number)?;
        let block_map = volume.block_map(inode_number)?;
        Ok(Self {
            volume,
            inode_number,
            inode,
            block_map,
            position: 0,
        })
    }

    pub fn inode_number(&self) -> InodeNumber {
        self.inode_number
    }

    pub fn inode(&self) -> &'a Inode {
        self.inode
    }

    pub fn block_map(&self) -> &BlockMap {
        &self.block_map
    }

    /// Size in bytes as recorded in the inode.
    pub fn size(&self) -> u64 {
        self.inode.size()
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.check_position(position)?;
        self.position = position;
        Ok(())
    }

    /// Reads up to `length` bytes at the current position.
    pub fn read(&self, length: u64) -> Result<Vec<u8>> {
        self.read_at(self.position, length)
    }

    /// Reads up to `length` bytes starting at `offset`.
    ///
    /// The read is cut short at the end of the file, so reading at
    /// `offset == size()` yields nothing. Holes read as zeros.
    pub fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.check_position(offset)?;
        let length = length.min(self.size() - offset);
        if length > isize::MAX as u64 {
            return Err(Error::LengthTooLarge { length });
        }

        let block_size = self.volume.block_size().bytes();
        let mut buf = Vec::new();
        buf.try_reserve_exact(length as usize)
            .map_err(|_| Error::LengthTooLarge { length })?;
        buf.resize(length as usize, 0);
        let mut filled = 0;
        while filled < buf.len() {
            let position = offset + filled as u64;
            let within_block = position % block_size;
            let chunk_len = (block_size - within_block).min((buf.len() - filled) as u64) as usize;
            let chunk = &mut buf[filled..filled + chunk_len];

            if let Some(block) = self.block_map.physical(FileBlockIndex(position / block_size)) {
                let block_offset = block.offset(self.volume.block_size());
                self.volume
                    .source()
                    .read_exact_at(block_offset + OffsetBytes(within_block), chunk)?;
            }
            filled += chunk_len;
        }
        Ok(buf)
    }

    /// Writes every allocated block of the file to `out`, one block at a time
    /// with trailing whitespace and NUL padding trimmed from each, followed by
    /// a newline.
    ///
    /// This follows the block map rather than the inode size: holes are
    /// skipped and a partial final block is written in full (minus padding).
    pub fn dump_contents<W: Write>(&self, out: &mut W) -> Result<()> {
        for mapping in self.block_map.iter() {
            let block = self.volume.read_block(mapping.physical)?;
            out.write_all(trim_trailing_padding(&block))
                .map_err(Error::Output)?;
        }
        out.write_all(b"\n").map_err(Error::Output)?;
        out.flush().map_err(Error::Output)
    }

    fn check_position(&self, position: u64) -> Result<()> {
        if position > self.size() {
            return Err(Error::OutOfRange {
                position,
                size: self.size(),
            });
        }
        Ok(())
    }
}

fn trim_trailing_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b > b' ')
        .map_or(0, |index| index + 1);
    &bytes[..end]
}
