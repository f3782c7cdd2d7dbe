//! Free-space allocator: first-fit contiguous run allocation and
//! release over the [`Bitmap`], with a first-free hint cached in the
//! [`Vcb`].
//!
//! Grounded on the original source's `allocateFreespace`/
//! `releaseFreespace` (`mfs.c`), which the teacher's own `balloc`/
//! `bfree` (`fs/mod.rs`) mirror at the single-block granularity; this
//! allocator generalizes both to arbitrary-length contiguous runs, as
//! the spec requires ("never splitting a request").

use crate::error::{FsError, Result};
use crate::fs::bitmap::Bitmap;
use crate::fs::persist;
use crate::fs::vcb::Vcb;
use crate::device::BlockDevice;

/// Finds the lowest-indexed contiguous run of `n` free blocks at or
/// after `hint`. Returns `None` if no such run exists.
fn find_run(bitmap: &Bitmap, n: u64, hint: u64) -> Result<Option<u64>> {
    let total = bitmap.len();
    let mut run_start = hint;
    let mut run_len = 0u64;
    let mut i = hint;
    while i < total {
        if !bitmap.is_set(i)? {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len == n {
                return Ok(Some(run_start));
            }
        } else {
            run_len = 0;
        }
        i += 1;
    }
    Ok(None)
}

/// Scans forward from `from` for the next free block, returning the
/// volume's block count if none is found (i.e. the hint becomes a
/// past-the-end value, matching "hint <= block_count").
fn next_free(bitmap: &Bitmap, from: u64) -> Result<u64> {
    let total = bitmap.len();
    let mut i = from;
    while i < total {
        if !bitmap.is_set(i)? {
            return Ok(i);
        }
        i += 1;
    }
    Ok(total)
}

/// Allocates `n` contiguous blocks, returning the starting block
/// index. Persists the bitmap, and the VCB if the first-free hint
/// moved, before returning.
pub fn allocate(
    device: &mut dyn BlockDevice,
    vcb: &mut Vcb,
    bitmap: &mut Bitmap,
    n: u64,
) -> Result<u64> {
    if n < 1 {
        return Err(FsError::InvalidArgument("allocation count must be >= 1"));
    }

    let hint = vcb.first_free_block_index();
    let start = find_run(bitmap, n, hint)?.ok_or(FsError::NoSpace)?;

    let mut marked = 0u64;
    for j in 0..n {
        if let Err(e) = bitmap.set(start + j) {
            for k in 0..marked {
                // Should not happen if `is_set` and `find_run` agree;
                // roll back what we already marked.
                let _ = bitmap.clear(start + k);
            }
            return Err(e);
        }
        marked += 1;
    }

    let mut hint_moved = false;
    if bitmap.is_set(hint)? {
        let new_hint = next_free(bitmap, hint + 1)?;
        vcb.set_first_free_block_index(new_hint);
        hint_moved = true;
    }

    persist::write_bytes_padded(device, vcb.block_size(), bitmap.as_bytes(), vcb.vcb_block_count())?;
    if hint_moved {
        persist::write_padded(device, vcb.block_size(), vcb, 0)?;
    }

    Ok(start)
}

/// Releases `n` blocks starting at `start`, refusing to touch the
/// reserved VCB+bitmap prefix or any out-of-range block.
pub fn release(
    device: &mut dyn BlockDevice,
    vcb: &mut Vcb,
    bitmap: &mut Bitmap,
    start: u64,
    n: u64,
) -> Result<()> {
    let reserved = vcb.vcb_block_count() + vcb.freespace_block_count();
    if start < reserved {
        return Err(FsError::InvalidArgument("cannot release reserved prefix"));
    }
    if n < 1 || start + n > vcb.number_of_blocks() {
        return Err(FsError::InvalidArgument("release range out of bounds"));
    }

    for i in 0..n {
        bitmap.clear(start + i)?;
    }

    let mut hint_moved = false;
    if start < vcb.first_free_block_index() {
        vcb.set_first_free_block_index(start);
        hint_moved = true;
    }

    persist::write_bytes_padded(device, vcb.block_size(), bitmap.as_bytes(), vcb.vcb_block_count())?;
    if hint_moved {
        persist::write_padded(device, vcb.block_size(), vcb, 0)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemBlockDevice;

    fn setup() -> (MemBlockDevice, Vcb, Bitmap) {
        let vcb = Vcb::new(512, 64);
        let mut dev = MemBlockDevice::new(512, 64);
        let mut bitmap = Bitmap::new(64);
        let reserved = vcb.vcb_block_count() + vcb.freespace_block_count();
        for i in 0..reserved {
            bitmap.set(i).unwrap();
        }
        let mut vcb = vcb;
        vcb.set_first_free_block_index(reserved);
        persist::write_padded(&mut dev, 512, &vcb, 0).unwrap();
        (dev, vcb, bitmap)
    }

    #[test]
    fn allocate_returns_first_fit() {
        let (mut dev, mut vcb, mut bitmap) = setup();
        let reserved = vcb.vcb_block_count() + vcb.freespace_block_count();
        let start = allocate(&mut dev, &mut vcb, &mut bitmap, 3).unwrap();
        assert_eq!(start, reserved);
        for i in start..start + 3 {
            assert!(bitmap.is_set(i).unwrap());
        }
    }

    #[test]
    fn allocate_advances_hint_when_hint_block_consumed() {
        let (mut dev, mut vcb, mut bitmap) = setup();
        let hint_before = vcb.first_free_block_index();
        let start = allocate(&mut dev, &mut vcb, &mut bitmap, 1).unwrap();
        assert_eq!(start, hint_before);
        assert_eq!(vcb.first_free_block_index(), hint_before + 1);
    }

    #[test]
    fn release_clears_bits_and_lowers_hint() {
        let (mut dev, mut vcb, mut bitmap) = setup();
        let start = allocate(&mut dev, &mut vcb, &mut bitmap, 4).unwrap();
        let hint_after_alloc = vcb.first_free_block_index();
        release(&mut dev, &mut vcb, &mut bitmap, start, 4).unwrap();
        for i in start..start + 4 {
            assert!(!bitmap.is_set(i).unwrap());
        }
        assert!(vcb.first_free_block_index() <= hint_after_alloc);
        assert_eq!(vcb.first_free_block_index(), start);
    }

    #[test]
    fn release_refuses_reserved_prefix() {
        let (mut dev, mut vcb, mut bitmap) = setup();
        assert!(release(&mut dev, &mut vcb, &mut bitmap, 0, 1).is_err());
    }

    #[test]
    fn allocate_fails_when_volume_is_full() {
        let (mut dev, mut vcb, mut bitmap) = setup();
        let free = vcb.number_of_blocks() - vcb.first_free_block_index();
        allocate(&mut dev, &mut vcb, &mut bitmap, free).unwrap();
        assert!(matches!(
            allocate(&mut dev, &mut vcb, &mut bitmap, 1),
            Err(FsError::NoSpace)
        ));
    }
}
