//! Directory operations: mkdir, rmdir (recursive), delete, readdir,
//! stat, cwd get/set, isDir/isFile.
//!
//! Grounded on the original source's `mfs.c` (`fs_mkdir`, `fs_rmdir`,
//! `fs_delete`, `fs_opendir`/`fs_readdir`/`fs_closedir`, `fs_stat`,
//! `fs_getcwd`/`fs_setcwd`, `fs_isDir`/`fs_isFile`), recast onto the
//! `Directory`/`DirEntry` records and the `Filesystem` context instead
//! of globals, per the design notes.

use arrayvec::ArrayVec;
use zerocopy::byteorder::{U16, U32};

use crate::error::{FsError, Result};
use crate::fs::allocator;
use crate::fs::directory::{Directory, DirEntry, SPACE_FREE, SPACE_USED, TYPE_DIR};
use crate::fs::path;
use crate::fs::Filesystem;
use crate::param::MAX_ENTRIES;

/// The subset of a file's metadata `fs_stat` reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub block_size: u64,
    pub size: u64,
    pub block_count: u64,
}

impl Filesystem {
    /// Creates a new, empty directory at `path`. Rejects a name
    /// collision with any USED entry in the parent (which also blocks
    /// manually creating `.` or `..`, since those are always present)
    /// and a full parent.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let (parent_path, name) = path::split_last_slash(path);
        if name.is_empty() {
            return Err(FsError::InvalidArgument("empty directory name"));
        }
        let mut parent = self.resolve_dir(parent_path)?;

        if parent.find_used(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        if parent.is_full() {
            return Err(FsError::Capacity);
        }

        let block_count = self.vcb.block_count_for(core::mem::size_of::<Directory>() as u64);
        let start = allocator::allocate(self.device.as_mut(), &mut self.vcb, &mut self.bitmap, block_count)?;
        let child = Directory::create(start, name, Some(parent.dot()));
        self.update_directory(&child)?;

        let slot = parent.find_free_from(2).ok_or(FsError::Capacity)?;
        let mut entry = DirEntry::free();
        entry.set_name(name);
        entry.file_type = TYPE_DIR;
        entry.space = SPACE_USED;
        entry.d_reclen = U16::new(core::mem::size_of::<DirEntry>() as u16);
        entry.entry_start_location = zerocopy::byteorder::U64::new(start);
        entry.size = zerocopy::byteorder::U64::new(core::mem::size_of::<Directory>() as u64);
        parent.entry_list[slot] = entry;
        parent.dir_entry_amount = U32::new(parent.entry_count() + 1);
        self.update_directory(&parent)
    }

    /// Removes the (possibly non-empty) directory at `path`. Refuses to
    /// remove root. Recursively destroys contents first (subdirectories
    /// via the same dispatch, files via [`Self::delete_entry`]),
    /// retargeting `cwd` to the parent at every level it is found
    /// inside the subtree being removed, then frees the parent's entry
    /// and finally the directory's own block run.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let target = self.resolve_dir(path)?;

        if target.start() == self.vcb.root_dir_location() {
            return Err(FsError::InvalidArgument("cannot remove the root directory"));
        }

        let mut parent = self.load_directory_at(target.dotdot().start())?;
        let idx = parent.entry_list[2..]
            .iter()
            .position(|e| e.is_used() && e.is_dir() && e.start() == target.start())
            .map(|i| i + 2)
            .ok_or(FsError::Internal("directory entry not found in parent"))?;

        self.destroy_contents(&target)?;
        self.retarget_cwd_if_inside(&target)?;

        parent.entry_list[idx].space = SPACE_FREE;
        parent.dir_entry_amount = U32::new(parent.entry_count() - 1);
        self.update_directory(&parent)?;

        let block_count = self.vcb.block_count_for(core::mem::size_of::<Directory>() as u64);
        allocator::release(self.device.as_mut(), &mut self.vcb, &mut self.bitmap, target.start(), block_count)
    }

    /// Recursively releases every USED entry beyond `.`/`..` in `dir`.
    /// Does not touch `dir`'s own parent entry or block run — the
    /// caller owns that.
    fn destroy_contents(&mut self, dir: &Directory) -> Result<()> {
        let live_entries: ArrayVec<DirEntry, MAX_ENTRIES> = dir.entry_list[2..]
            .iter()
            .copied()
            .filter(|e| e.is_used())
            .collect();

        for entry in live_entries {
            if entry.is_dir() {
                let child = self.load_directory_at(entry.start())?;
                self.destroy_contents(&child)?;
                self.retarget_cwd_if_inside(&child)?;

                let block_count = self.vcb.block_count_for(core::mem::size_of::<Directory>() as u64);
                allocator::release(self.device.as_mut(), &mut self.vcb, &mut self.bitmap, child.start(), block_count)?;
            } else if entry.is_file() {
                self.release_file(&entry)?;
            } else {
                return Err(FsError::Internal("directory entry has unknown type"));
            }
        }
        Ok(())
    }

    /// If `cwd` is exactly `dir` (about to be removed), retargets it to
    /// `dir`'s parent.
    fn retarget_cwd_if_inside(&mut self, dir: &Directory) -> Result<()> {
        if dir.start() == self.cwd.start() {
            self.cwd = self.load_directory_at(dir.dotdot().start())?;
        }
        Ok(())
    }

    fn release_file(&mut self, entry: &DirEntry) -> Result<()> {
        let block_count = self.vcb.block_count_for(entry.size_bytes()).max(1);
        allocator::release(self.device.as_mut(), &mut self.vcb, &mut self.bitmap, entry.start(), block_count)
    }

    /// Removes the file entry at `path` and releases its block run.
    pub fn delete(&mut self, path: &str) -> Result<()> {
        let (parent_path, name) = path::split_last_slash(path);
        let mut parent = self.resolve_dir(parent_path)?;
        let idx = parent
            .find_used(name)
            .filter(|&i| parent.entry_list[i].is_file())
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        let entry = parent.entry_list[idx];

        parent.entry_list[idx].space = SPACE_FREE;
        parent.dir_entry_amount = U32::new(parent.entry_count() - 1);
        self.update_directory(&parent)?;

        self.release_file(&entry)
    }

    /// Resolves `path` and stores it as the process-wide opened
    /// directory, resetting the iteration index.
    pub fn opendir(&mut self, path: &str) -> Result<()> {
        let dir = self.resolve_dir(path)?;
        self.opened_dir = Some(dir);
        self.opened_dir_index = 0;
        Ok(())
    }

    /// Returns the next USED entry from the opened directory, or `None`
    /// once exhausted.
    pub fn readdir(&mut self) -> Result<Option<DirEntry>> {
        let dir = self
            .opened_dir
            .ok_or(FsError::InvalidArgument("no directory is open"))?;
        for i in self.opened_dir_index..dir.entry_list.len() {
            if dir.entry_list[i].is_used() {
                self.opened_dir_index = i + 1;
                return Ok(Some(dir.entry_list[i]));
            }
        }
        self.opened_dir_index = dir.entry_list.len();
        Ok(None)
    }

    /// Clears the opened-directory slot.
    pub fn closedir(&mut self) -> Result<()> {
        self.opened_dir = None;
        self.opened_dir_index = 0;
        Ok(())
    }

    /// Looks up `name` within the currently opened directory.
    pub fn stat(&self, name: &str) -> Result<FileStat> {
        let dir = self
            .opened_dir
            .as_ref()
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let idx = dir.find_used(name).ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let entry = &dir.entry_list[idx];
        let block_size = self.vcb.block_size();
        Ok(FileStat {
            block_size,
            size: entry.size_bytes(),
            block_count: (entry.size_bytes() + block_size - 1) / block_size,
        })
    }

    /// Walks from `cwd` up `..` links to root, building a `.`-rooted
    /// path string (e.g. `./a/b`, or `./` at root).
    pub fn getcwd(&mut self) -> Result<String> {
        let mut acc = String::new();
        let mut current = self.cwd;
        while current.start() != self.vcb.root_dir_location() {
            acc = format!("/{}{}", current.name(), acc);
            let parent_start = current.dotdot().start();
            current = self.load_directory_at(parent_start)?;
        }
        if acc.is_empty() {
            Ok("./".to_string())
        } else {
            Ok(format!(".{}", acc))
        }
    }

    /// Resolves `path` and replaces the in-memory `cwd`.
    pub fn setcwd(&mut self, path: &str) -> Result<()> {
        self.cwd = self.resolve_dir(path)?;
        Ok(())
    }

    /// True if `path` resolves to a directory. Resolves relative to the
    /// opened directory instead of `cwd` while a readdir iteration is
    /// in progress, so relative names from a listing resolve correctly.
    pub fn is_dir(&mut self, path: &str) -> bool {
        let base = self.opened_dir.unwrap_or(self.cwd);
        self.resolve_from(base, path).is_ok()
    }

    /// True if `path` names a USED file entry in its parent directory.
    /// Same opened-directory substitution as [`Self::is_dir`].
    pub fn is_file(&mut self, path: &str) -> bool {
        let base = self.opened_dir.unwrap_or(self.cwd);
        let (parent_path, name) = path::split_last_slash(path);
        match self.resolve_from(base, parent_path) {
            Ok(dir) => dir.entry_list.iter().any(|e| e.is_used() && e.is_file() && e.name() == name),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemBlockDevice;
    use crate::fs::io::OpenFlags;

    fn fresh_fs() -> Filesystem {
        let dev = Box::new(MemBlockDevice::new(512, 512));
        Filesystem::format(dev, 512, 512).unwrap()
    }

    #[test]
    fn format_then_mount_leaves_only_dot_and_dotdot() {
        let mut fs = fresh_fs();
        fs.opendir(".").unwrap();
        let mut names = Vec::new();
        while let Some(e) = fs.readdir().unwrap() {
            names.push(e.name().to_string());
        }
        assert_eq!(names, vec![".", ".."]);
        assert_eq!(fs.getcwd().unwrap(), "./");
    }

    #[test]
    fn mkdir_twice_is_already_exists_and_readdir_lists_it() {
        let mut fs = fresh_fs();
        fs.mkdir("foo").unwrap();
        assert!(matches!(fs.mkdir("foo"), Err(FsError::AlreadyExists(_))));

        fs.opendir(".").unwrap();
        let mut names = Vec::new();
        while let Some(e) = fs.readdir().unwrap() {
            names.push(e.name().to_string());
        }
        assert!(names.contains(&"foo".to_string()));
    }

    #[test]
    fn mkdir_nested_then_setcwd_and_getcwd_round_trip() {
        let mut fs = fresh_fs();
        assert!(fs.mkdir("a/b").is_err());
        fs.mkdir("a").unwrap();
        fs.mkdir("a/b").unwrap();
        fs.setcwd("a/b").unwrap();
        assert_eq!(fs.getcwd().unwrap(), "./a/b");
    }

    #[test]
    fn rmdir_retargets_cwd_up_to_root() {
        let mut fs = fresh_fs();
        fs.mkdir("a").unwrap();
        fs.setcwd("a").unwrap();
        fs.mkdir("b").unwrap();
        fs.setcwd("b").unwrap();
        assert_eq!(fs.getcwd().unwrap(), "./a/b");

        fs.setcwd("/").unwrap();
        fs.rmdir("a").unwrap();
        assert_eq!(fs.getcwd().unwrap(), "./");
        assert!(!fs.is_dir("a"));
    }

    #[test]
    fn is_dir_and_is_file_distinguish_entry_types() {
        let mut fs = fresh_fs();
        fs.mkdir("adir").unwrap();
        let fd = fs.open("afile", OpenFlags::empty()).unwrap();
        fs.write(fd, b"x").unwrap();
        fs.close(fd).unwrap();

        assert!(fs.is_dir("adir"));
        assert!(!fs.is_file("adir"));
        assert!(fs.is_file("afile"));
        assert!(!fs.is_dir("afile"));
    }

    #[test]
    fn delete_removes_entry_and_frees_space() {
        let mut fs = fresh_fs();
        let fd = fs.open("f", OpenFlags::empty()).unwrap();
        fs.write(fd, b"hello").unwrap();
        fs.close(fd).unwrap();
        assert!(fs.is_file("f"));

        fs.delete("f").unwrap();
        assert!(!fs.is_file("f"));
    }

    #[test]
    fn stat_reports_size_of_opened_directory_entry() {
        let mut fs = fresh_fs();
        let fd = fs.open("f", OpenFlags::empty()).unwrap();
        fs.write(fd, b"hello").unwrap();
        fs.close(fd).unwrap();

        fs.opendir(".").unwrap();
        let st = fs.stat("f").unwrap();
        assert_eq!(st.size, 5);
        assert_eq!(st.block_count, 1);
    }

    #[test]
    fn cannot_remove_root() {
        let mut fs = fresh_fs();
        assert!(matches!(fs.rmdir("/"), Err(FsError::InvalidArgument(_))));
    }

    #[test]
    fn rmdir_with_trailing_slash_resolves_the_directory_itself() {
        let mut fs = fresh_fs();
        fs.mkdir("a").unwrap();
        fs.rmdir("a/").unwrap();
        assert!(!fs.is_dir("a"));
    }
}
