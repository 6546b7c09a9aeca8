use std::fs::File;
use std::path::Path;

use zerocopy::FromBytes;

use crate::error::VolumeError;
use crate::superblock::OffsetBytes;

/// Size of a filesystem block in bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockSize(u16);

impl BlockSize {
    /// ext2's minimum block size. Block arithmetic uses a configured block
    /// size rather than the superblock's `log_block_size`.
    pub const DEFAULT: Self = Self(1024);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub fn bytes(self) -> u64 {
        u64::from(self.0)
    }

    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    /// Number of 32-bit block pointers that fit in one indirect block.
    pub fn pointers_per_block(self) -> u64 {
        self.bytes() / 4
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Something that serves byte ranges of a volume image at absolute offsets.
///
/// Reads carry their own offset and never share a cursor, so any number of
/// readers may use the same source at once.
pub trait BlockSource {
    /// Total size of the volume image in bytes.
    fn volume_len(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`. Fails with
    /// [`VolumeError::OutOfRange`] if the range runs past the end of the
    /// volume.
    fn read_exact_at(&self, offset: OffsetBytes, buf: &mut [u8]) -> Result<(), VolumeError>;

    fn read_num_bytes(&self, offset: OffsetBytes, num_bytes: usize) -> Result<Vec<u8>, VolumeError> {
        // Sizes come from on-disk fields, so check them before allocating.
        check_range(offset, num_bytes, self.volume_len())?;
        let mut buf = vec![0; num_bytes];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Decode an on-disk record located at `offset`.
    fn read_bytes<T: FromBytes>(&self, offset: OffsetBytes) -> Result<T, VolumeError>
    where
        Self: Sized,
    {
        let num_bytes = core::mem::size_of::<T>();
        let buf = self.read_num_bytes(offset, num_bytes)?;
        T::read_from(buf.as_slice()).ok_or(VolumeError::OutOfRange {
            offset: offset.0,
            len: num_bytes,
            volume_len: self.volume_len(),
        })
    }
}

fn check_range(offset: OffsetBytes, len: usize, volume_len: u64) -> Result<(), VolumeError> {
    let end = offset.0.checked_add(len as u64);
    match end {
        Some(end) if end <= volume_len => Ok(()),
        _ => Err(VolumeError::OutOfRange {
            offset: offset.0,
            len,
            volume_len,
        }),
    }
}

/// A volume image backed by a file (or block device node) on the host.
#[derive(Debug)]
pub struct FileBlockSource {
    file: File,
    len: u64,
}

impl FileBlockSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VolumeError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl BlockSource for FileBlockSource {
    fn volume_len(&self) -> u64 {
        self.len
    }

    #[cfg(unix)]
    fn read_exact_at(&self, offset: OffsetBytes, buf: &mut [u8]) -> Result<(), VolumeError> {
        use std::os::unix::fs::FileExt;

        check_range(offset, buf.len(), self.len)?;
        self.file.read_exact_at(buf, offset.0)?;
        Ok(())
    }

    #[cfg(windows)]
    fn read_exact_at(&self, offset: OffsetBytes, buf: &mut [u8]) -> Result<(), VolumeError> {
        use std::os::windows::fs::FileExt;

        check_range(offset, buf.len(), self.len)?;
        let mut filled = 0;
        while filled < buf.len() {
            let read = self
                .file
                .seek_read(&mut buf[filled..], offset.0 + filled as u64)?;
            if read == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            filled += read;
        }
        Ok(())
    }
}

/// A volume image held in memory.
#[derive(Debug, Clone)]
pub struct MemoryBlockSource<B> {
    bytes: B,
}

impl<B: AsRef<[u8]>> MemoryBlockSource<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }
}

impl<B: AsRef<[u8]>> BlockSource for MemoryBlockSource<B> {
    fn volume_len(&self) -> u64 {
        self.bytes.as_ref().len() as u64
    }

    fn read_exact_at(&self, offset: OffsetBytes, buf: &mut [u8]) -> Result<(), VolumeError> {
        check_range(offset, buf.len(), self.volume_len())?;
        let start = offset.0 as usize;
        buf.copy_from_slice(&self.bytes.as_ref()[start..start + buf.len()]);
        Ok(())
    }
}
