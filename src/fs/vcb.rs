//! Volume Control Block: the persistent record at block 0 that
//! identifies a formatted volume and locates its bitmap and root
//! directory.
//!
//! Grounded on the original source's `vcb` struct (`fsInit.c`'s
//! `initVCB`) and the teacher's `Superblock` (`fs/superblock.rs`),
//! generalized from a single raw `ptr::read` into a `zerocopy`
//! `AsBytes`/`FromBytes` record.

use zerocopy::byteorder::{LittleEndian, U32, U64};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::param::MAGIC;

/// On-disk volume control block. Occupies block 0 (and, in principle,
/// however many additional blocks `vcb_block_count` reports, though in
/// practice it always fits in one).
#[derive(Clone, Copy, AsBytes, FromBytes, FromZeroes, Debug)]
#[repr(C)]
pub struct Vcb {
    pub magic: [u8; 8],
    pub block_size: U64<LittleEndian>,
    pub number_of_blocks: U64<LittleEndian>,
    pub vcb_block_count: U32<LittleEndian>,
    pub freespace_block_count: U32<LittleEndian>,
    pub first_free_block_index: U64<LittleEndian>,
    pub root_dir_location: U64<LittleEndian>,
}

impl Vcb {
    pub fn is_formatted(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn block_size(&self) -> u64 {
        self.block_size.get()
    }

    pub fn number_of_blocks(&self) -> u64 {
        self.number_of_blocks.get()
    }

    pub fn vcb_block_count(&self) -> u64 {
        self.vcb_block_count.get() as u64
    }

    pub fn freespace_block_count(&self) -> u64 {
        self.freespace_block_count.get() as u64
    }

    pub fn first_free_block_index(&self) -> u64 {
        self.first_free_block_index.get()
    }

    pub fn set_first_free_block_index(&mut self, i: u64) {
        self.first_free_block_index = U64::new(i);
    }

    pub fn root_dir_location(&self) -> u64 {
        self.root_dir_location.get()
    }

    /// Number of blocks needed to hold `size` bytes at this volume's
    /// block size, rounding up.
    pub fn block_count_for(&self, size: u64) -> u64 {
        let bs = self.block_size();
        (size + bs - 1) / bs
    }

    /// Builds a fresh VCB for a volume of `block_count` blocks of
    /// `block_size` bytes, with geometry fields filled in but
    /// `first_free_block_index`/`root_dir_location` left at zero —
    /// the caller (format) still needs to reserve the VCB+bitmap
    /// prefix and place the root directory.
    pub fn new(block_size: u64, block_count: u64) -> Self {
        let vcb_bytes = core::mem::size_of::<Vcb>() as u64;
        let vcb_blocks = (vcb_bytes + block_size - 1) / block_size;

        let bitmap_bytes = (block_count + 7) / 8;
        let freespace_blocks = (bitmap_bytes + block_size - 1) / block_size;

        Vcb {
            magic: MAGIC,
            block_size: U64::new(block_size),
            number_of_blocks: U64::new(block_count),
            vcb_block_count: U32::new(vcb_blocks as u32),
            freespace_block_count: U32::new(freespace_blocks as u32),
            first_free_block_index: U64::new(0),
            root_dir_location: U64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_vcb_has_magic_and_geometry() {
        let vcb = Vcb::new(512, 2048);
        assert!(vcb.is_formatted());
        assert_eq!(vcb.block_size(), 512);
        assert_eq!(vcb.number_of_blocks(), 2048);
        // sizeof(Vcb) == 48 bytes, fits in one 512-byte block.
        assert_eq!(vcb.vcb_block_count(), 1);
        // 2048 bits == 256 bytes, fits in one 512-byte block.
        assert_eq!(vcb.freespace_block_count(), 1);
    }

    #[test]
    fn mismatched_magic_is_not_formatted() {
        let mut vcb = Vcb::new(512, 2048);
        vcb.magic = *b"GARBAGE!";
        assert!(!vcb.is_formatted());
    }
}
