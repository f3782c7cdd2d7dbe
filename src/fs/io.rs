//! Buffered, per-handle file I/O: open/read/write/close with one-shot
//! mode latching.
//!
//! Grounded on the original source's `b_io.c`/`b_io.h` (`b_open`,
//! `b_write`, `b_read`, `b_close`, the `FUNC_READ`/`FUNC_WRITE`
//! detector states), recast per the design notes: the pool lives as a
//! field of [`Filesystem`] instead of a global `fcbArray`, and each
//! handle owns a `Vec<u8>` instead of a `malloc`ed buffer.

use bitflags::bitflags;
use zerocopy::byteorder::{U16, U32, U64};

use crate::error::{FsError, Result};
use crate::fs::allocator;
use crate::fs::directory::{Directory, DirEntry, SPACE_USED, TYPE_FILE};
use crate::fs::path;
use crate::fs::persist;
use crate::fs::Filesystem;
use crate::param::MAX_FCBS;

bitflags! {
    /// The intent flags accepted by [`Filesystem::open`], mirroring the
    /// `O_RDONLY`/`O_WRONLY`-style flags the original `b_open` took.
    /// Purely advisory: the mode detector still pins READ or WRITE from
    /// whichever of `read`/`write` is called first, exactly as in the
    /// original, so a mismatched flag does not itself cause a failure.
    pub struct OpenFlags: u32 {
        const READ = 0b01;
        const WRITE = 0b10;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Unset,
    Read,
    Write,
}

/// An open file handle. Only ever constructed by [`Filesystem::open`];
/// never exposed to callers except as the opaque `fd` index it's
/// stored at in the pool.
pub struct Fcb {
    parent: Directory,
    name: String,
    mode: Mode,
    buffer: Vec<u8>,
    index: usize,
}

impl Fcb {
    pub(crate) fn empty_pool() -> [Option<Fcb>; MAX_FCBS] {
        array_macro::array![_ => None; MAX_FCBS]
    }
}

impl Filesystem {
    /// Claims a pool slot and remembers `path`'s parent directory and
    /// trailing name. The data buffer is not allocated yet — read and
    /// write need different sizes — and the mode detector starts UNSET
    /// regardless of `flags`.
    pub fn open(&mut self, path: &str, _flags: OpenFlags) -> Result<usize> {
        let (parent_path, name) = path::split_last_slash(path);
        if name.is_empty() {
            return Err(FsError::InvalidArgument("empty file name"));
        }
        let parent = self.resolve_dir(parent_path)?;

        let mut pool = self.fcbs.lock().expect("fcb pool mutex poisoned");
        let slot = pool.iter().position(Option::is_none).ok_or(FsError::Capacity)?;
        pool[slot] = Some(Fcb {
            parent,
            name: name.to_string(),
            mode: Mode::Unset,
            buffer: Vec::new(),
            index: 0,
        });
        Ok(slot)
    }

    /// Appends `src` to the handle, pinning it to WRITE on first call.
    /// Refuses a handle already pinned to READ, a full parent, or a
    /// name collision with an existing entry.
    pub fn write(&mut self, fd: usize, src: &[u8]) -> Result<usize> {
        let block_size = self.vcb.block_size() as usize;
        let mut pool = self.fcbs.lock().expect("fcb pool mutex poisoned");
        let fcb = pool
            .get_mut(fd)
            .and_then(Option::as_mut)
            .ok_or(FsError::InvalidArgument("bad file descriptor"))?;

        match fcb.mode {
            Mode::Read => return Err(FsError::ModeConflict),
            Mode::Unset => {
                if fcb.parent.is_full() {
                    return Err(FsError::Capacity);
                }
                if fcb.parent.find_used(&fcb.name).is_some() {
                    return Err(FsError::AlreadyExists(fcb.name.clone()));
                }
                fcb.buffer = vec![0u8; block_size];
                fcb.mode = Mode::Write;
            }
            Mode::Write => {}
        }

        let needed = fcb.index + src.len();
        while needed > fcb.buffer.len() {
            let new_len = fcb.buffer.len() + block_size;
            fcb.buffer.resize(new_len, 0);
        }
        fcb.buffer[fcb.index..fcb.index + src.len()].copy_from_slice(src);
        fcb.index += src.len();
        Ok(src.len())
    }

    /// Copies up to `dst.len()` bytes from the handle, pinning it to
    /// READ on first call by bulk-loading the whole file into memory.
    /// Returns 0 at end of file. Refuses a handle already pinned to
    /// WRITE.
    pub fn read(&mut self, fd: usize, dst: &mut [u8]) -> Result<usize> {
        let block_size = self.vcb.block_size();

        let pending_load = {
            let pool = self.fcbs.lock().expect("fcb pool mutex poisoned");
            let fcb = pool
                .get(fd)
                .and_then(Option::as_ref)
                .ok_or(FsError::InvalidArgument("bad file descriptor"))?;
            match fcb.mode {
                Mode::Write => return Err(FsError::ModeConflict),
                Mode::Read => None,
                Mode::Unset => Some((fcb.parent, fcb.name.clone())),
            }
        };

        if let Some((parent, name)) = pending_load {
            let idx = parent
                .find_used(&name)
                .filter(|&i| parent.entry_list[i].is_file())
                .ok_or_else(|| FsError::NotFound(name.clone()))?;
            let entry = parent.entry_list[idx];
            let block_count = ((entry.size_bytes() + block_size - 1) / block_size).max(1);
            let mut bytes = persist::read_blocks(self.device.as_mut(), block_size, block_count, entry.start())?;
            bytes.truncate(entry.size_bytes() as usize);

            let mut pool = self.fcbs.lock().expect("fcb pool mutex poisoned");
            let fcb = pool
                .get_mut(fd)
                .and_then(Option::as_mut)
                .ok_or(FsError::InvalidArgument("bad file descriptor"))?;
            fcb.buffer = bytes;
            fcb.index = 0;
            fcb.mode = Mode::Read;
        }

        let mut pool = self.fcbs.lock().expect("fcb pool mutex poisoned");
        let fcb = pool
            .get_mut(fd)
            .and_then(Option::as_mut)
            .ok_or(FsError::InvalidArgument("bad file descriptor"))?;
        let remaining = fcb.buffer.len() - fcb.index;
        let n = remaining.min(dst.len());
        dst[..n].copy_from_slice(&fcb.buffer[fcb.index..fcb.index + n]);
        fcb.index += n;
        Ok(n)
    }

    /// Releases the handle. If it was pinned to WRITE, finalizes the
    /// buffered payload: allocates a single contiguous run sized to the
    /// bytes written, writes it, and links a new entry into the parent.
    /// A handle pinned to READ (or never used) persists nothing.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        let fcb = {
            let mut pool = self.fcbs.lock().expect("fcb pool mutex poisoned");
            pool.get_mut(fd)
                .and_then(Option::take)
                .ok_or(FsError::InvalidArgument("bad file descriptor"))?
        };

        if fcb.mode == Mode::Write {
            self.finalize_write(fcb)?;
        }
        Ok(())
    }

    fn finalize_write(&mut self, fcb: Fcb) -> Result<()> {
        let block_size = self.vcb.block_size();
        let block_count = ((fcb.index as u64 + block_size - 1) / block_size).max(1);
        let start = allocator::allocate(self.device.as_mut(), &mut self.vcb, &mut self.bitmap, block_count)?;
        persist::write_bytes_padded(self.device.as_mut(), block_size, &fcb.buffer[..fcb.index], start)?;

        let mut parent = fcb.parent;
        let slot = parent.find_free_from(2).ok_or(FsError::Capacity)?;
        let mut entry = DirEntry::free();
        entry.set_name(&fcb.name);
        entry.file_type = TYPE_FILE;
        entry.space = SPACE_USED;
        entry.d_reclen = U16::new(core::mem::size_of::<DirEntry>() as u16);
        entry.entry_start_location = U64::new(start);
        entry.size = U64::new(fcb.index as u64);
        parent.entry_list[slot] = entry;
        parent.dir_entry_amount = U32::new(parent.entry_count() + 1);

        self.update_directory(&parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemBlockDevice;

    fn fresh_fs() -> Filesystem {
        let dev = Box::new(MemBlockDevice::new(512, 256));
        Filesystem::format(dev, 512, 256).unwrap()
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut fs = fresh_fs();
        let fd = fs.open("data", OpenFlags::empty()).unwrap();
        fs.write(fd, b"hello world").unwrap();
        fs.close(fd).unwrap();

        let fd = fs.open("data", OpenFlags::empty()).unwrap();
        let mut buf = [0u8; 32];
        let n = fs.read(fd, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello world");
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
        fs.close(fd).unwrap();
    }

    #[test]
    fn read_after_write_on_same_handle_is_a_mode_conflict() {
        let mut fs = fresh_fs();
        let fd = fs.open("data", OpenFlags::empty()).unwrap();
        fs.write(fd, b"abc").unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(fs.read(fd, &mut buf), Err(FsError::ModeConflict)));
    }

    #[test]
    fn write_after_read_on_same_handle_is_a_mode_conflict() {
        let mut fs = fresh_fs();
        let fd = fs.open("data", OpenFlags::empty()).unwrap();
        fs.write(fd, b"abc").unwrap();
        fs.close(fd).unwrap();

        let fd = fs.open("data", OpenFlags::empty()).unwrap();
        let mut buf = [0u8; 4];
        fs.read(fd, &mut buf).unwrap();
        assert!(matches!(fs.write(fd, b"x"), Err(FsError::ModeConflict)));
    }

    #[test]
    fn write_grows_buffer_across_block_boundaries() {
        let mut fs = fresh_fs();
        let fd = fs.open("big", OpenFlags::empty()).unwrap();
        let payload = vec![0x42u8; 1500];
        fs.write(fd, &payload).unwrap();
        fs.close(fd).unwrap();

        let fd = fs.open("big", OpenFlags::empty()).unwrap();
        let mut buf = vec![0u8; 1500];
        let mut total = 0;
        loop {
            let n = fs.read(fd, &mut buf[total..]).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, 1500);
        assert!(buf.iter().all(|&b| b == 0x42));
    }

    #[test]
    fn open_rejects_empty_name() {
        let mut fs = fresh_fs();
        assert!(matches!(fs.open("/", OpenFlags::empty()), Err(FsError::InvalidArgument(_))));
    }

    #[test]
    fn write_refuses_name_collision() {
        let mut fs = fresh_fs();
        let fd = fs.open("data", OpenFlags::empty()).unwrap();
        fs.write(fd, b"one").unwrap();
        fs.close(fd).unwrap();

        let fd = fs.open("data", OpenFlags::empty()).unwrap();
        assert!(matches!(fs.write(fd, b"two"), Err(FsError::AlreadyExists(_))));
    }
}
