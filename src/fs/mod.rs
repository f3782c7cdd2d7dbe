//! The filesystem context: format/mount, and the path resolver that
//! every higher-level operation in [`ops`] and [`io`] builds on.
//!
//! Grounded on the original source's `fsInit.c` (`initFileSystem`,
//! `initVCB`, `initFreespace`, `initRootDir`) and `mfs.c`'s
//! `getDirByPath`, generalized per the design notes: the original's
//! process-wide globals (`ourVCB`, `freespace`, `fsCWD`, `openedDir`,
//! `fcbArray`) become fields of one `Filesystem` struct instead, the
//! way the teacher's `kernel()` context groups `superblock`/`log`.

pub mod allocator;
pub mod bitmap;
pub mod directory;
pub mod io;
pub mod ops;
pub mod path;
pub mod persist;
pub mod vcb;

use std::sync::Mutex;

use crate::device::BlockDevice;
use crate::error::{FsError, Result};
use crate::param::MAX_FCBS;

use bitmap::Bitmap;
use directory::Directory;
use io::Fcb;
use vcb::Vcb;

/// The single in-process handle to a mounted volume. Every public
/// operation takes `&mut self` (or, for the FCB pool's slot claim,
/// goes through the internal mutex) — there is deliberately no
/// ambient/global state left, per the design notes.
pub struct Filesystem {
    device: Box<dyn BlockDevice + Send>,
    vcb: Vcb,
    bitmap: Bitmap,
    cwd: Directory,
    opened_dir: Option<Directory>,
    opened_dir_index: usize,
    fcbs: Mutex<[Option<Fcb>; MAX_FCBS]>,
}

impl Filesystem {
    /// Mounts a device: if it already carries the `FIORE_FS` magic,
    /// loads the bitmap and root directory and sets `cwd` to root;
    /// otherwise formats it from scratch.
    pub fn mount(mut device: Box<dyn BlockDevice + Send>) -> Result<Self> {
        let block_size = device.block_size();
        let block_count = device.block_count();

        let vcb_probe_blocks = (core::mem::size_of::<Vcb>() as u64 + block_size - 1) / block_size;
        let probe = persist::read_blocks(device.as_mut(), block_size, vcb_probe_blocks.max(1), 0)?;
        let candidate: Vcb = zerocopy::FromBytes::read_from_prefix(&probe[..])
            .ok_or(FsError::Internal("short VCB read"))?;

        if candidate.is_formatted() {
            log::debug!("mounting existing volume, {} blocks", candidate.number_of_blocks());
            let bitmap_bytes = persist::read_blocks(
                device.as_mut(),
                block_size,
                candidate.freespace_block_count(),
                candidate.vcb_block_count(),
            )?;
            let bitmap = Bitmap::from_bytes(&bitmap_bytes, candidate.number_of_blocks());

            let dir_blocks = candidate.block_count_for(core::mem::size_of::<Directory>() as u64);
            let dir_bytes = persist::read_blocks(
                device.as_mut(),
                block_size,
                dir_blocks,
                candidate.root_dir_location(),
            )?;
            let root: Directory = zerocopy::FromBytes::read_from_prefix(&dir_bytes[..])
                .ok_or(FsError::Internal("short root directory read"))?;

            Ok(Self {
                device,
                vcb: candidate,
                bitmap,
                cwd: root,
                opened_dir: None,
                opened_dir_index: 0,
                fcbs: Mutex::new(Fcb::empty_pool()),
            })
        } else {
            log::info!("volume not formatted, formatting {} x {} bytes", block_count, block_size);
            Self::format(device, block_size, block_count)
        }
    }

    /// Clears the VCB region and lays down a fresh, empty volume:
    /// reserves the VCB+bitmap prefix, then creates the root directory.
    pub fn format(mut device: Box<dyn BlockDevice + Send>, block_size: u64, block_count: u64) -> Result<Self> {
        let mut vcb = Vcb::new(block_size, block_count);
        let mut bitmap = Bitmap::new(block_count);

        let reserved = vcb.vcb_block_count() + vcb.freespace_block_count();
        let start = allocator::allocate(device.as_mut(), &mut vcb, &mut bitmap, reserved)?;
        debug_assert_eq!(start, 0, "VCB+bitmap prefix must be the first allocation");

        let dir_blocks = vcb.block_count_for(core::mem::size_of::<Directory>() as u64);
        let root_start = allocator::allocate(device.as_mut(), &mut vcb, &mut bitmap, dir_blocks)?;
        let root = Directory::create(root_start, "/", None);
        persist::write_padded(device.as_mut(), block_size, &root, root_start)?;

        vcb.root_dir_location = zerocopy::byteorder::U64::new(root_start);
        persist::write_padded(device.as_mut(), block_size, &vcb, 0)?;

        Ok(Self {
            device,
            vcb,
            bitmap,
            cwd: root,
            opened_dir: None,
            opened_dir_index: 0,
            fcbs: Mutex::new(Fcb::empty_pool()),
        })
    }

    pub fn block_size(&self) -> u64 {
        self.vcb.block_size()
    }

    /// Loads the directory record starting at `start_block` from disk.
    fn load_directory_at(&mut self, start_block: u64) -> Result<Directory> {
        let dir_blocks = self.vcb.block_count_for(core::mem::size_of::<Directory>() as u64);
        let bytes = persist::read_blocks(self.device.as_mut(), self.vcb.block_size(), dir_blocks, start_block)?;
        zerocopy::FromBytes::read_from_prefix(&bytes[..]).ok_or(FsError::Internal("short directory read"))
    }

    /// Resolves `path` to a directory record, starting from `cwd` and
    /// walking one path component at a time. Absolute paths work
    /// because a leading `/` tokenizes to nothing and is skipped —
    /// resolution is always relative to `cwd`.
    pub fn resolve_dir(&mut self, path: &str) -> Result<Directory> {
        self.resolve_from(self.cwd, path)
    }

    /// Same walk as [`Self::resolve_dir`] but from an arbitrary starting
    /// directory. `isDir`/`isFile` use this to resolve relative to the
    /// opened-directory instead of `cwd` while a readdir iteration is in
    /// progress.
    pub(crate) fn resolve_from(&mut self, base: Directory, path: &str) -> Result<Directory> {
        let mut current = base;
        for name in path::components(path) {
            if name == "." {
                continue;
            }
            let idx = current
                .entry_list
                .iter()
                .position(|e| e.is_used() && e.is_dir() && e.name() == name)
                .ok_or_else(|| FsError::NotFound(path.to_string()))?;
            let start = current.entry_list[idx].start();
            current = self.load_directory_at(start)?;
        }
        Ok(current)
    }

    /// Writes `dir` back to its own location; if it is the current
    /// working directory, refreshes the in-memory `cwd` copy too.
    fn update_directory(&mut self, dir: &Directory) -> Result<()> {
        persist::write_padded(self.device.as_mut(), self.vcb.block_size(), dir, dir.start())?;
        if dir.start() == self.cwd.start() {
            self.cwd = *dir;
        }
        Ok(())
    }

    fn update_vcb(&mut self) -> Result<()> {
        persist::write_padded(self.device.as_mut(), self.vcb.block_size(), &self.vcb, 0)
    }
}
