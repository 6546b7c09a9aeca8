//! Read-only access to ext2 volume images: superblock and block group
//! metadata, inodes and their block pointer chains, directories, paths and
//! file contents.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let volume = ext2_reader::open_volume("disk.img")?;
//! print!("{}", volume.list("/")?);
//!
//! let file = volume.open_file("/etc/motd")?;
//! let head = file.read_at(0, 64)?;
//! assert!(head.len() <= 64);
//! # Ok(())
//! # }
//! ```
//!
//! # Resources
//!
//! - <https://wiki.osdev.org/Ext2>
//! - <https://www.nongnu.org/ext2-doc/ext2.html>
//! - <https://en.wikipedia.org/wiki/Ext2>
//! - <https://git.kernel.org/pub/scm/utils/util-linux/util-linux.git/tree/libblkid/src/superblocks/ext.c>

#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cargo_common_metadata,
    clippy::doc_markdown,
    clippy::implicit_hasher,
    clippy::implicit_return,
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::redundant_pub_crate,
    clippy::suboptimal_flops,
    clippy::wildcard_imports
)]

// On-disk records are decoded by reinterpreting little-endian bytes in place.
#[cfg(target_endian = "big")]
compile_error!("ext2-reader only supports little-endian targets");

pub mod block;
pub mod block_group;
pub mod block_map;
pub mod directory;
pub mod error;
pub mod file;
pub mod inode;
pub mod inode_table;
pub mod listing;
pub mod path;
mod strings;
pub mod superblock;
pub mod volume;

#[cfg(test)]
mod test_image;

pub use block::*;
pub use block_group::*;
pub use block_map::*;
pub use directory::*;
pub use error::*;
pub use file::*;
pub use inode::*;
pub use inode_table::*;
pub use listing::*;
pub use path::*;
pub use strings::CStringBytes;
pub use superblock::*;
pub use volume::*;
