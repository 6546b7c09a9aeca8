//! Path resolution over the directory tree.

use crate::block::BlockSource;
use crate::block_map::BlockMap;
use crate::directory::DirectoryEntry;
use crate::error::{Error, Result};
use crate::file::FileHandle;
use crate::inode::Inode;
use crate::listing::{Listing, ListingEntry};
use crate::superblock::{InodeNumber, ROOT_DIRECTORY};
use crate::volume::Volume;

const SEPARATOR: char = '/';

/// One resolved path component.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    inode: InodeNumber,
    name: String,
}

impl Frame {
    fn root() -> Self {
        Self {
            inode: ROOT_DIRECTORY,
            name: String::new(),
        }
    }
}

/// A current working directory on a volume.
///
/// The cursor keeps the chain of directories from the root down to where it
/// stands, so `..` is a pop and the root is the bottom of the stack. A
/// resolution works on a copy of that chain and only replaces it on success:
/// a failed `resolve` leaves the cursor where it was.
#[derive(Debug)]
pub struct PathCursor<'a, S> {
    volume: &'a Volume<S>,
    frames: Vec<Frame>,
}

impl<S> Clone for PathCursor<'_, S> {
    fn clone(&self) -> Self {
        Self {
            volume: self.volume,
            frames: self.frames.clone(),
        }
    }
}

impl<'a, S: BlockSource> PathCursor<'a, S> {
    pub fn new(volume: &'a Volume<S>) -> Self {
        Self {
            volume,
            frames: vec![Frame::root()],
        }
    }

    /// Absolute path of the current directory, always ending in `/`.
    pub fn current_path(&self) -> String {
        path_of(&self.frames)
    }

    pub fn inode_number(&self) -> InodeNumber {
        current_inode(&self.frames)
    }

    pub fn inode(&self) -> Result<&'a Inode> {
        self.volume.inode(self.inode_number())
    }

    pub fn block_map(&self) -> Result<BlockMap> {
        self.volume.block_map(self.inode_number())
    }

    /// Moves the cursor to the directory at `path`.
    ///
    /// Paths starting with `/` are absolute, anything else is relative to the
    /// current directory. `.` stays put and `..` goes up one level, stopping
    /// at the root. Components after `.` and `..` are still resolved, so
    /// `./nested` descends into `nested` rather than stopping at `.`.
    pub fn resolve(&mut self, path: &str) -> Result<()> {
        self.frames = self.walk(path)?;
        log::debug!("now at {}", self.current_path());
        Ok(())
    }

    /// Handle on the directory the cursor stands in.
    pub fn directory(&self) -> DirectoryHandle<'a, S> {
        DirectoryHandle {
            volume: self.volume,
            path: self.current_path(),
            inode_number: self.inode_number(),
        }
    }

    /// Lists the directory at `path` without moving the cursor.
    pub fn list(&self, path: &str) -> Result<Listing> {
        let mut target = self.clone();
        target.resolve(path)?;
        target.directory().list()
    }

    /// Opens a file relative to the cursor. A bare name is looked up in the
    /// current directory.
    pub fn open_file(&self, path: &str) -> Result<FileHandle<'a, S>> {
        let (directory, name) = split_file_path(path);
        let not_found = || Error::FileNotFound {
            path: path.to_owned(),
        };

        let mut target = self.clone();
        match target.resolve(directory) {
            Ok(()) => {}
            Err(Error::PathNotFound { .. }) => return Err(not_found()),
            Err(err) => return Err(err),
        }
        match target.directory().lookup_file(name)? {
            inode_number if inode_number.is_valid() => FileHandle::open(self.volume, inode_number),
            _ => Err(not_found()),
        }
    }

    fn walk(&self, path: &str) -> Result<Vec<Frame>> {
        let mut frames = if path.starts_with(SEPARATOR) {
            vec![Frame::root()]
        } else {
            self.frames.clone()
        };

        for component in path.split(SEPARATOR).filter(|c| !c.is_empty()) {
            match component {
                "." => {}
                ".." => {
                    if frames.len() > 1 {
                        frames.pop();
                    }
                }
                name => {
                    let parent = current_inode(&frames);
                    let Some(inode) = self.volume.find_directory(parent, name)? else {
                        log::warn!("Failed to find directory {path}");
                        return Err(Error::PathNotFound {
                            path: path.to_owned(),
                        });
                    };
                    frames.push(Frame {
                        inode,
                        name: name.to_owned(),
                    });
                }
            }
        }
        Ok(frames)
    }
}

fn current_inode(frames: &[Frame]) -> InodeNumber {
    frames.last().map_or(ROOT_DIRECTORY, |frame| frame.inode)
}

fn path_of(frames: &[Frame]) -> String {
    let mut path = String::from(SEPARATOR);
    for frame in frames.iter().skip(1) {
        path.push_str(&frame.name);
        path.push(SEPARATOR);
    }
    path
}

/// Splits `path` into its directory part (keeping the trailing `/`) and the
/// final name.
pub(crate) fn split_file_path(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(index) => (&path[..=index], &path[index + 1..]),
        None => ("", path),
    }
}

/// A resolved directory.
#[derive(Debug)]
pub struct DirectoryHandle<'a, S> {
    volume: &'a Volume<S>,
    path: String,
    inode_number: InodeNumber,
}

impl<'a, S: BlockSource> DirectoryHandle<'a, S> {
    /// Absolute path, ending in `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn inode_number(&self) -> InodeNumber {
        self.inode_number
    }

    pub fn inode(&self) -> Result<&'a Inode> {
        self.volume.inode(self.inode_number)
    }

    pub fn block_map(&self) -> Result<BlockMap> {
        self.volume.block_map(self.inode_number)
    }

    pub fn entries(&self) -> Result<Vec<DirectoryEntry>> {
        self.volume.directory_entries(self.inode_number)
    }

    /// See [`Volume::lookup_file`].
    pub fn lookup_file(&self, name: &str) -> Result<InodeNumber> {
        self.volume.lookup_file(self.inode_number, name)
    }

    pub fn list(&self) -> Result<Listing> {
        let rows = self
            .entries()?
            .into_iter()
            .map(|entry| {
                let inode = self.volume.inode(entry.inode)?;
                Ok(ListingEntry::new(entry, inode))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Listing::new(rows))
    }
}
