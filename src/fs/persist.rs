//! Padded write-back of structures spanning whole blocks.
//!
//! Grounded on the original source's `updateByLBAwrite` (`mfs.c`):
//! zero a buffer sized to the next whole block, copy the struct in,
//! write the whole span. Replaces its `malloc`/`memset`/`memcpy`/`free`
//! with an owned `Vec<u8>` scoped to the call, per the design notes'
//! "manual ownership of heap blocks -> owned buffers" directive.

use zerocopy::AsBytes;

use crate::device::BlockDevice;
use crate::error::Result;

/// Writes `object` to `start_block`, zero-padded to a whole number of
/// blocks of `block_size`.
pub fn write_padded<T: AsBytes>(
    device: &mut dyn BlockDevice,
    block_size: u64,
    object: &T,
    start_block: u64,
) -> Result<()> {
    let bytes = object.as_bytes();
    let block_count = (bytes.len() as u64 + block_size - 1) / block_size;
    let mut buf = vec![0u8; (block_count * block_size) as usize];
    buf[..bytes.len()].copy_from_slice(bytes);
    device.write_blocks(&buf, block_count, start_block)
}

/// Writes a raw byte slice to `start_block`, zero-padded to a whole
/// number of blocks. Used for the bitmap, which has no fixed
/// compile-time size and so isn't itself a `zerocopy` type.
pub fn write_bytes_padded(
    device: &mut dyn BlockDevice,
    block_size: u64,
    bytes: &[u8],
    start_block: u64,
) -> Result<()> {
    let block_count = (bytes.len() as u64 + block_size - 1) / block_size;
    let mut buf = vec![0u8; (block_count * block_size) as usize];
    buf[..bytes.len()].copy_from_slice(bytes);
    device.write_blocks(&buf, block_count, start_block)
}

/// Reads `block_count` blocks starting at `start_block` into a
/// fresh buffer.
pub fn read_blocks(
    device: &mut dyn BlockDevice,
    block_size: u64,
    block_count: u64,
    start_block: u64,
) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; (block_count * block_size) as usize];
    device.read_blocks(&mut buf, block_count, start_block)?;
    Ok(buf)
}
