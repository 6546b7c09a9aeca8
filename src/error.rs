use thiserror::Error;

/// Failures while opening or reading the raw volume image.
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an ext2 volume: bad superblock magic {found:#06X}")]
    BadMagic { found: u16 },

    #[error("read of {len} bytes at offset {offset} is outside the {volume_len} byte volume")]
    OutOfRange {
        offset: u64,
        len: usize,
        volume_len: u64,
    },

    #[error("invalid volume geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("inode record size {0} is smaller than an inode")]
    InvalidInodeSize(u16),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Volume(#[from] VolumeError),

    #[error("position {position} is outside the file (size {size})")]
    OutOfRange { position: u64, size: u64 },

    #[error("cannot read {length} bytes into a single buffer")]
    LengthTooLarge { length: u64 },

    #[error("failed to find directory {path}")]
    PathNotFound { path: String },

    #[error("failed to find file {path}")]
    FileNotFound { path: String },

    #[error("inode {0} is outside the inode table")]
    InvalidInode(u32),

    #[error("failed to write file contents: {0}")]
    Output(#[source] std::io::Error),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
