//! Builds small ext2 images in memory for tests.
//!
//! Layout with 1 KiB blocks and a single block group:
//!
//! ```text
//! block 0     boot block
//! block 1     superblock
//! block 2     block group descriptor table
//! block 3-4   block and inode bitmaps (left empty)
//! block 5-8   inode table (32 inodes * 128 bytes)
//! block 9     root directory
//! block 10+   free for tests
//! ```

use crate::superblock::{InodeNumber, ROOT_DIRECTORY};

pub(crate) const BLOCK_SIZE: usize = 1024;
pub(crate) const INODES_PER_GROUP: u32 = 32;
pub(crate) const INODE_TABLE_BLOCK: u32 = 5;
pub(crate) const ROOT_DIRECTORY_BLOCK: u32 = 9;
pub(crate) const LABEL: &str = "testvol";

pub(crate) const FT_REG_FILE: u8 = 1;
pub(crate) const FT_DIR: u8 = 2;

const INODE_SIZE: usize = 128;

pub(crate) struct ImageBuilder {
    image: Vec<u8>,
}

impl ImageBuilder {
    /// A volume of `total_blocks` blocks whose root directory holds only `.`
    /// and `..`.
    pub(crate) fn new(total_blocks: u32) -> Self {
        let mut builder = Self {
            image: vec![0; total_blocks as usize * BLOCK_SIZE],
        };

        let sb = BLOCK_SIZE;
        builder.put_u32(sb, INODES_PER_GROUP);
        builder.put_u32(sb + 0x04, total_blocks);
        builder.put_u32(sb + 0x14, 1); // first_data_block
        builder.put_u32(sb + 0x18, 0); // log_block_size
        builder.put_u32(sb + 0x20, 8192); // blocks_per_group
        builder.put_u32(sb + 0x28, INODES_PER_GROUP);
        builder.put_u16(sb + 0x38, 0xEF53);
        builder.put_u32(sb + 0x4C, 1); // rev_level
        builder.put_u16(sb + 0x58, INODE_SIZE as u16);
        builder.image[sb + 0x78..sb + 0x78 + LABEL.len()].copy_from_slice(LABEL.as_bytes());

        let gdt = 2 * BLOCK_SIZE;
        builder.put_u32(gdt, 3);
        builder.put_u32(gdt + 0x04, 4);
        builder.put_u32(gdt + 0x08, INODE_TABLE_BLOCK);

        builder.directory(
            ROOT_DIRECTORY,
            ROOT_DIRECTORY_BLOCK,
            &[(ROOT_DIRECTORY.0, ".", FT_DIR), (ROOT_DIRECTORY.0, "..", FT_DIR)],
        );
        builder
    }

    pub(crate) fn build(self) -> Vec<u8> {
        self.image
    }

    pub(crate) fn inode_record_size(&mut self, size: u16) -> &mut Self {
        self.put_u16(BLOCK_SIZE + 0x58, size);
        self
    }

    pub(crate) fn inode(&mut self, inode_number: InodeNumber) -> InodeBuilder<'_> {
        let offset = INODE_TABLE_BLOCK as usize * BLOCK_SIZE
            + (inode_number.0 as usize - 1) * INODE_SIZE;
        InodeBuilder {
            image: &mut self.image,
            offset,
        }
    }

    pub(crate) fn write_block(&mut self, block: u32, data: &[u8]) -> &mut Self {
        assert!(data.len() <= BLOCK_SIZE);
        let start = block as usize * BLOCK_SIZE;
        self.image[start..start + data.len()].copy_from_slice(data);
        self
    }

    /// Fills an indirect block with the given pointers.
    pub(crate) fn write_pointers(&mut self, block: u32, pointers: &[u32]) -> &mut Self {
        let data: Vec<u8> = pointers.iter().flat_map(|p| p.to_le_bytes()).collect();
        self.write_block(block, &data)
    }

    /// Writes a one-block directory. The last entry's `rec_len` runs to the
    /// end of the block.
    pub(crate) fn directory(
        &mut self,
        inode_number: InodeNumber,
        block: u32,
        entries: &[(u32, &str, u8)],
    ) -> &mut Self {
        let mut data = vec![0u8; BLOCK_SIZE];
        let mut offset = 0;
        for (i, &(inode, name, file_type)) in entries.iter().enumerate() {
            let rec_len = if i + 1 == entries.len() {
                BLOCK_SIZE - offset
            } else {
                (8 + name.len()).next_multiple_of(4)
            };
            write_dir_entry(&mut data[offset..], inode, rec_len as u16, name, file_type);
            offset += rec_len;
        }
        self.write_block(block, &data);
        self.inode(inode_number)
            .mode(0o040755)
            .size(BLOCK_SIZE as u64)
            .links(2)
            .block(0, block);
        self
    }

    /// Writes `contents` into consecutive blocks starting at `first_block`,
    /// using the singly indirect block once the direct pointers run out.
    /// Returns the next unused block.
    pub(crate) fn file(
        &mut self,
        inode_number: InodeNumber,
        contents: &[u8],
        first_block: u32,
    ) -> u32 {
        let mut next_block = first_block;
        let mut indirect_pointers = Vec::new();
        let mut indirect_block = 0;
        for (i, chunk) in contents.chunks(BLOCK_SIZE).enumerate() {
            if i == 12 {
                indirect_block = next_block;
                next_block += 1;
            }
            self.write_block(next_block, chunk);
            if i < 12 {
                self.inode(inode_number).block(i, next_block);
            } else {
                indirect_pointers.push(next_block);
            }
            next_block += 1;
        }
        if indirect_block != 0 {
            assert!(indirect_pointers.len() <= BLOCK_SIZE / 4);
            self.write_pointers(indirect_block, &indirect_pointers);
            self.inode(inode_number).singly_indirect(indirect_block);
        }
        self.inode(inode_number)
            .mode(0o100644)
            .size(contents.len() as u64)
            .links(1);
        next_block
    }

    fn put_u16(&mut self, offset: usize, value: u16) {
        self.image[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, offset: usize, value: u32) {
        self.image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

pub(crate) struct InodeBuilder<'a> {
    image: &'a mut Vec<u8>,
    offset: usize,
}

impl InodeBuilder<'_> {
    pub(crate) fn mode(&mut self, mode: u16) -> &mut Self {
        self.put(0x00, &mode.to_le_bytes())
    }

    pub(crate) fn uid(&mut self, uid: u16) -> &mut Self {
        self.put(0x02, &uid.to_le_bytes())
    }

    pub(crate) fn size(&mut self, size: u64) -> &mut Self {
        self.put(0x04, &(size as u32).to_le_bytes());
        self.put(0x6C, &((size >> 32) as u32).to_le_bytes())
    }

    pub(crate) fn mtime(&mut self, mtime: u32) -> &mut Self {
        self.put(0x10, &mtime.to_le_bytes())
    }

    pub(crate) fn gid(&mut self, gid: u16) -> &mut Self {
        self.put(0x18, &gid.to_le_bytes())
    }

    pub(crate) fn links(&mut self, links: u16) -> &mut Self {
        self.put(0x1A, &links.to_le_bytes())
    }

    pub(crate) fn block(&mut self, index: usize, block: u32) -> &mut Self {
        assert!(index < 12);
        self.put(0x28 + index * 4, &block.to_le_bytes())
    }

    pub(crate) fn singly_indirect(&mut self, block: u32) -> &mut Self {
        self.put(0x58, &block.to_le_bytes())
    }

    pub(crate) fn doubly_indirect(&mut self, block: u32) -> &mut Self {
        self.put(0x5C, &block.to_le_bytes())
    }

    pub(crate) fn triply_indirect(&mut self, block: u32) -> &mut Self {
        self.put(0x60, &block.to_le_bytes())
    }

    fn put(&mut self, field: usize, bytes: &[u8]) -> &mut Self {
        let start = self.offset + field;
        self.image[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }
}

pub(crate) fn write_dir_entry(buf: &mut [u8], inode: u32, rec_len: u16, name: &str, file_type: u8) {
    buf[0..4].copy_from_slice(&inode.to_le_bytes());
    buf[4..6].copy_from_slice(&rec_len.to_le_bytes());
    buf[6] = name.len() as u8;
    buf[7] = file_type;
    buf[8..8 + name.len()].copy_from_slice(name.as_bytes());
}

pub(crate) const DOCS: InodeNumber = InodeNumber(11);
pub(crate) const HELLO: InodeNumber = InodeNumber(12);
pub(crate) const BIG: InodeNumber = InodeNumber(13);
pub(crate) const README: InodeNumber = InodeNumber(14);
pub(crate) const NESTED: InodeNumber = InodeNumber(15);

pub(crate) const HELLO_CONTENTS: &[u8] = b"Hello, ext2!\n";
pub(crate) const README_CONTENTS: &[u8] = b"read me\n";

/// Twelve direct blocks plus 100 bytes reached through the indirect block.
pub(crate) fn big_contents() -> Vec<u8> {
    (0..12 * BLOCK_SIZE + 100).map(|i| (i % 251) as u8).collect()
}

/// ```text
/// /
/// ├── docs/
/// │   ├── nested/
/// │   └── readme
/// ├── hello.txt
/// └── big.bin
/// ```
pub(crate) fn sample_image() -> Vec<u8> {
    let mut builder = ImageBuilder::new(64);
    builder.directory(
        ROOT_DIRECTORY,
        ROOT_DIRECTORY_BLOCK,
        &[
            (ROOT_DIRECTORY.0, ".", FT_DIR),
            (ROOT_DIRECTORY.0, "..", FT_DIR),
            (DOCS.0, "docs", FT_DIR),
            (HELLO.0, "hello.txt", FT_REG_FILE),
            (BIG.0, "big.bin", FT_REG_FILE),
        ],
    );
    builder.inode(ROOT_DIRECTORY).links(3);
    builder.directory(
        DOCS,
        10,
        &[
            (DOCS.0, ".", FT_DIR),
            (ROOT_DIRECTORY.0, "..", FT_DIR),
            (README.0, "readme", FT_REG_FILE),
            (NESTED.0, "nested", FT_DIR),
        ],
    );
    builder.inode(DOCS).links(3);
    builder.directory(
        NESTED,
        11,
        &[(NESTED.0, ".", FT_DIR), (DOCS.0, "..", FT_DIR)],
    );
    builder.file(HELLO, HELLO_CONTENTS, 12);
    builder
        .inode(HELLO)
        .uid(1000)
        .gid(100)
        .mtime(1_700_000_000);
    builder.file(README, README_CONTENTS, 13);
    builder.file(BIG, &big_contents(), 20);
    builder.build()
}
