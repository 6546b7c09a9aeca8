use core::fmt;

use bitflags::bitflags;
use zerocopy::{FromBytes, FromZeroes};

use crate::superblock::BlockAddress;

/// See <https://www.nongnu.org/ext2-doc/ext2.html#inode-table>
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromZeroes, FromBytes)]
pub struct Inode {
    pub mode: InodeMode,
    pub uid: u16,
    pub size_low: u32,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub dtime: u32,
    pub gid: u16,
    pub links_count: u16,
    pub blocks: u32,
    pub flags: u32,
    pub osd1: u32,
    pub direct_blocks: InodeDirectBlocks,
    pub singly_indirect_block: BlockAddress,
    pub doubly_indirect_block: BlockAddress,
    pub triply_indirect_block: BlockAddress,
    pub generation: u32,
    pub file_acl: u32,
    /// High 32 bits of file size. This is dir_acl in revision 0.
    pub size_high: u32,
    pub faddr: u32,
    pub osd2: [u8; 12],
}

impl Inode {
    pub fn file_type(&self) -> InodeFileType {
        let mode = self.mode;
        mode.file_type()
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == InodeFileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == InodeFileType::RegularFile
    }

    /// Logical size in bytes, combining the low and high 32-bit halves.
    pub fn size(&self) -> u64 {
        (u64::from(self.size_high) << 32) | u64::from(self.size_low)
    }

    pub fn uid(&self) -> u16 {
        self.uid
    }

    pub fn gid(&self) -> u16 {
        self.gid
    }

    pub fn links_count(&self) -> u16 {
        self.links_count
    }

    /// Seconds since the Unix epoch.
    pub fn access_time(&self) -> u32 {
        self.atime
    }

    pub fn creation_time(&self) -> u32 {
        self.ctime
    }

    pub fn modified_time(&self) -> u32 {
        self.mtime
    }

    pub fn deletion_time(&self) -> u32 {
        self.dtime
    }

    pub fn direct_blocks(&self) -> InodeDirectBlocks {
        self.direct_blocks
    }

    /// `ls -l` style mode, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let mode = self.mode;
        mode.to_mode_string()
    }
}

/// The file format stored in the top four bits of `i_mode`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InodeFileType {
    Fifo,
    CharacterDevice,
    Directory,
    BlockDevice,
    RegularFile,
    SymbolicLink,
    Socket,
    Unknown,
}

impl InodeFileType {
    fn mode_char(self) -> char {
        match self {
            Self::Fifo => 'p',
            Self::CharacterDevice => 'c',
            Self::Directory => 'd',
            Self::BlockDevice => 'b',
            Self::RegularFile | Self::Unknown => '-',
            Self::SymbolicLink => 'l',
            Self::Socket => 's',
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, FromZeroes, FromBytes)]
#[repr(transparent)]
/// <https://www.nongnu.org/ext2-doc/ext2.html#i-mode>
pub struct InodeMode(u16);

bitflags! {
    impl InodeMode: u16 {
        // Access rights

        /// Others execute
        const IXOTH = 0x001;

        /// Others write
        const IWOTH = 0x002;

        /// Others read
        const IROTH = 0x004;

        /// Group execute
        const IXGRP = 0x008;

        /// Group write
        const IWGRP = 0x010;

        /// Group read
        const IRGRP = 0x020;

        /// User execute
        const IXUSR = 0x040;

        /// User write
        const IWUSR = 0x080;

        /// User read
        const IRUSR = 0x100;

        // Process execution user/group override

        /// Sticky bit
        const ISVTX = 0x200;

        /// Set process group id
        const ISGID = 0x400;

        /// Set process user id
        const ISUID = 0x800;

        // File format

        /// FIFO
        const IFIFO = 0x1000;

        /// Character device
        const IFCHR = 0x2000;

        /// Directory
        const IFDIR = 0x4000;

        /// Block device
        const IFBLK = 0x6000;

        /// Regular file
        const IFREG = 0x8000;

        /// Symbolic link
        const IFLNK = 0xA000;

        /// Socket
        const IFSOCK = 0xC000;
    }
}

impl InodeMode {
    /// The format values share bits (IFBLK is IFCHR | IFDIR), so the format
    /// nibble has to be compared as a whole.
    const FORMAT_MASK: u16 = 0xF000;

    pub fn file_type(self) -> InodeFileType {
        match self.bits() & Self::FORMAT_MASK {
            bits if bits == Self::IFIFO.bits() => InodeFileType::Fifo,
            bits if bits == Self::IFCHR.bits() => InodeFileType::CharacterDevice,
            bits if bits == Self::IFDIR.bits() => InodeFileType::Directory,
            bits if bits == Self::IFBLK.bits() => InodeFileType::BlockDevice,
            bits if bits == Self::IFREG.bits() => InodeFileType::RegularFile,
            bits if bits == Self::IFLNK.bits() => InodeFileType::SymbolicLink,
            bits if bits == Self::IFSOCK.bits() => InodeFileType::Socket,
            _ => InodeFileType::Unknown,
        }
    }

    fn to_mode_string(self) -> String {
        const PERMISSIONS: [(InodeMode, char); 9] = [
            (InodeMode::IRUSR, 'r'),
            (InodeMode::IWUSR, 'w'),
            (InodeMode::IXUSR, 'x'),
            (InodeMode::IRGRP, 'r'),
            (InodeMode::IWGRP, 'w'),
            (InodeMode::IXGRP, 'x'),
            (InodeMode::IROTH, 'r'),
            (InodeMode::IWOTH, 'w'),
            (InodeMode::IXOTH, 'x'),
        ];

        let mut mode = String::with_capacity(10);
        mode.push(self.file_type().mode_char());
        for (flag, c) in PERMISSIONS {
            mode.push(if self.contains(flag) { c } else { '-' });
        }
        mode
    }
}

impl fmt::Debug for InodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InodeMode({:#o})", self.bits())
    }
}

/// The twelve direct block pointers of an inode. Zero entries are holes.
#[derive(Clone, Copy, FromZeroes, FromBytes)]
#[repr(transparent)]
pub struct InodeDirectBlocks(pub [BlockAddress; 12]);

impl InodeDirectBlocks {
    pub fn iter(&self) -> impl Iterator<Item = BlockAddress> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Debug for InodeDirectBlocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|block| block.0)).finish()
    }
}
