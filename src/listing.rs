//! `ls -l` style directory listings.

use core::fmt;

use chrono::{DateTime, Utc};

use crate::directory::DirectoryEntry;
use crate::inode::Inode;
use crate::superblock::InodeNumber;

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub inode: InodeNumber,
    pub mode: String,
    pub links_count: u16,
    pub uid: u16,
    pub gid: u16,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub modified: u32,
    pub name: String,
}

impl ListingEntry {
    pub fn new(entry: DirectoryEntry, inode: &Inode) -> Self {
        Self {
            inode: entry.inode,
            mode: inode.mode_string(),
            links_count: inode.links_count(),
            uid: inode.uid(),
            gid: inode.gid(),
            size: inode.size(),
            modified: inode.modified_time(),
            name: entry.name,
        }
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.modified), 0)
    }
}

/// The rows of one directory, in on-disk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn new(entries: Vec<ListingEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn size_width(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.size.to_string().len())
            .max()
            .unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a Listing {
    type Item = &'a ListingEntry;
    type IntoIter = core::slice::Iter<'a, ListingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One line per entry, with the size column right-aligned to the widest size
/// in the directory.
impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size_width = self.size_width();
        for entry in self {
            let modified = entry.modified_at().map_or_else(
                || entry.modified.to_string(),
                |time| time.format("%b %d %H:%M").to_string(),
            );
            writeln!(
                f,
                "{} {} {} {} {:>size_width$} {} {}",
                entry.mode,
                entry.links_count,
                entry.uid,
                entry.gid,
                entry.size,
                modified,
                entry.name,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::block::MemoryBlockSource;
    use crate::superblock::ROOT_DIRECTORY;
    use crate::test_image::{sample_image, ImageBuilder, HELLO};
    use crate::volume::Volume;

    #[test]
    fn minimal_root_listing() {
        let image = ImageBuilder::new(64).build();
        let volume = Volume::open(MemoryBlockSource::new(image)).unwrap();
        let listing = volume.list("/").unwrap();

        assert_eq!(listing.len(), 2);
        let rows = listing.entries();
        assert_eq!(rows[0].name, ".");
        assert_eq!(rows[0].inode, ROOT_DIRECTORY);
        assert_eq!(rows[1].name, "..");
        for row in rows {
            assert!(row.mode.starts_with('d'), "{}", row.mode);
        }
    }

    #[test]
    fn rows_carry_inode_metadata() {
        let volume = Volume::open(MemoryBlockSource::new(sample_image())).unwrap();
        let listing = volume.list("/").unwrap();
        let hello = listing
            .entries()
            .iter()
            .find(|row| row.name == "hello.txt")
            .unwrap();

        assert_eq!(hello.inode, HELLO);
        assert_eq!(hello.mode, "-rw-r--r--");
        assert_eq!(hello.links_count, 1);
        assert_eq!(hello.uid, 1000);
        assert_eq!(hello.gid, 100);
        assert_eq!(hello.size, 13);
        assert_eq!(hello.modified, 1_700_000_000);
    }

    #[test]
    fn display_pads_the_size_column() {
        let volume = Volume::open(MemoryBlockSource::new(sample_image())).unwrap();
        let text = volume.list("/").unwrap().to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "drwxr-xr-x 3 0 0  1024 Jan 01 00:00 .");
        assert_eq!(lines[3], "-rw-r--r-- 1 1000 100    13 Nov 14 22:13 hello.txt");
        assert_eq!(lines[4], "-rw-r--r-- 1 0 0 12388 Jan 01 00:00 big.bin");
    }

    #[test]
    fn empty_listing_displays_nothing() {
        assert_eq!(Listing::default().to_string(), "");
    }
}
