//! On-disk directory record: a fixed-capacity entry table with self
//! (`.`) and parent (`..`) slots, padded to whole blocks.
//!
//! Grounded on the original source's `fdDir`/`fs_diriteminfo` (`mfs.h`,
//! referenced from `mfs.c`'s `createDirectory`) and the teacher's
//! `Dinode`/`Dirent` on-disk layout in `fs/ufs/inode.rs`, which uses
//! `zerocopy::{AsBytes, FromBytes}` plus `static_assertions` to pin
//! struct sizes instead of raw pointer casts.

use static_assertions::const_assert;
use zerocopy::byteorder::{LittleEndian, U16, U32, U64};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::param::{MAX_ENTRIES, MAX_NAME};

pub const SPACE_FREE: u8 = 0;
pub const SPACE_USED: u8 = 1;

pub const TYPE_DIR: i8 = -1;
pub const TYPE_FILE: i8 = 1;

/// One slot in a directory's entry table.
#[derive(Clone, Copy, AsBytes, FromBytes, FromZeroes, Debug)]
#[repr(C)]
pub struct DirEntry {
    pub d_reclen: U16<LittleEndian>,
    pub file_type: i8,
    pub space: u8,
    pub entry_start_location: U64<LittleEndian>,
    pub size: U64<LittleEndian>,
    pub d_name: [u8; MAX_NAME],
}

const_assert!(
    core::mem::size_of::<DirEntry>()
        == 2 + 1 + 1 + 8 + 8 + MAX_NAME
);

impl DirEntry {
    pub fn free() -> Self {
        Self::new_zeroed()
    }

    pub fn is_used(&self) -> bool {
        self.space == SPACE_USED
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == TYPE_DIR
    }

    pub fn is_file(&self) -> bool {
        self.file_type == TYPE_FILE
    }

    pub fn name(&self) -> &str {
        let len = self.d_name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME);
        core::str::from_utf8(&self.d_name[..len]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        self.d_name = [0u8; MAX_NAME];
        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_NAME - 1);
        self.d_name[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn start(&self) -> u64 {
        self.entry_start_location.get()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size.get()
    }
}

/// Fixed-layout directory record. Occupies
/// `ceil(size_of::<Directory>() / block_size)` contiguous blocks.
#[derive(Clone, Copy, AsBytes, FromBytes, FromZeroes, Debug)]
#[repr(C)]
pub struct Directory {
    pub dir_name: [u8; MAX_NAME],
    pub directory_start_location: U64<LittleEndian>,
    pub d_reclen: U32<LittleEndian>,
    pub dir_entry_amount: U32<LittleEndian>,
    pub entry_list: [DirEntry; MAX_ENTRIES],
}

const_assert!(
    core::mem::size_of::<Directory>()
        == MAX_NAME + 8 + 4 + 4 + MAX_ENTRIES * core::mem::size_of::<DirEntry>()
);

impl Directory {
    pub fn name(&self) -> &str {
        let len = self.dir_name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME);
        core::str::from_utf8(&self.dir_name[..len]).unwrap_or("")
    }

    pub fn start(&self) -> u64 {
        self.directory_start_location.get()
    }

    pub fn entry_count(&self) -> u32 {
        self.dir_entry_amount.get()
    }

    /// Index of `.` is always 0, `..` is always 1.
    pub fn dot(&self) -> &DirEntry {
        &self.entry_list[0]
    }

    pub fn dotdot(&self) -> &DirEntry {
        &self.entry_list[1]
    }

    pub fn is_full(&self) -> bool {
        self.entry_count() as usize >= MAX_ENTRIES
    }

    /// Finds the first `USED` entry by exact name match.
    pub fn find_used(&self, name: &str) -> Option<usize> {
        self.entry_list
            .iter()
            .position(|e| e.is_used() && e.name() == name)
    }

    /// Finds the first `FREE` slot at or beyond `from`.
    pub fn find_free_from(&self, from: usize) -> Option<usize> {
        self.entry_list[from..]
            .iter()
            .position(|e| !e.is_used())
            .map(|i| i + from)
    }

    /// Builds a new directory record allocated at `start_block`.
    ///
    /// `parent` is the `..` entry to copy in; pass `None` to mark this
    /// directory as root (`..` self-references).
    pub fn create(start_block: u64, name: &str, parent: Option<&DirEntry>) -> Self {
        let mut dir = Directory::new_zeroed();
        dir.directory_start_location = U64::new(start_block);
        dir.d_reclen = U32::new(core::mem::size_of::<Directory>() as u32);
        dir.dir_entry_amount = U32::new(2);

        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_NAME - 1);
        dir.dir_name = [0u8; MAX_NAME];
        dir.dir_name[..len].copy_from_slice(&bytes[..len]);

        dir.entry_list[0] = DirEntry {
            d_reclen: U16::new(core::mem::size_of::<DirEntry>() as u16),
            file_type: TYPE_DIR,
            space: SPACE_USED,
            entry_start_location: U64::new(start_block),
            size: U64::new(core::mem::size_of::<Directory>() as u64),
            d_name: {
                let mut n = [0u8; MAX_NAME];
                n[0] = b'.';
                n
            },
        };

        let dotdot_source = parent.copied().unwrap_or(dir.entry_list[0]);
        dir.entry_list[1] = dotdot_source;
        dir.entry_list[1].set_name("..");

        for slot in dir.entry_list[2..].iter_mut() {
            slot.space = SPACE_FREE;
        }

        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_directory_self_references_dotdot() {
        let dir = Directory::create(7, "/", None);
        assert_eq!(dir.name(), "/");
        assert_eq!(dir.dot().start(), 7);
        assert_eq!(dir.dotdot().start(), 7);
        assert_eq!(dir.dotdot().name(), "..");
        assert_eq!(dir.entry_count(), 2);
    }

    #[test]
    fn child_directory_parent_points_back() {
        let root = Directory::create(0, "/", None);
        let child = Directory::create(9, "foo", Some(root.dot()));
        assert_eq!(child.dotdot().start(), 0);
        assert_eq!(child.name(), "foo");
    }

    #[test]
    fn name_truncates_to_max_name_minus_one() {
        let long = "x".repeat(MAX_NAME + 10);
        let dir = Directory::create(0, &long, None);
        assert_eq!(dir.name().len(), MAX_NAME - 1);
    }

    #[test]
    fn find_used_and_find_free_from() {
        let mut dir = Directory::create(0, "/", None);
        assert_eq!(dir.find_used("."), Some(0));
        assert_eq!(dir.find_used("bar"), None);
        assert_eq!(dir.find_free_from(2), Some(2));
        dir.entry_list[2].space = SPACE_USED;
        dir.entry_list[2].set_name("bar");
        assert_eq!(dir.find_free_from(2), Some(3));
        assert_eq!(dir.find_used("bar"), Some(2));
    }
}
