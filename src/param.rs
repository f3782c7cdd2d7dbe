//! Compile-time volume parameters.
//!
//! These mirror the implementation-defined constants the original C
//! sources left to `mfs.h` (not retained in the source this crate was
//! distilled from): `MAX_NAME_LENGTH`, `MAX_AMOUNT_OF_ENTRIES`,
//! `MAXFCBS`, and `B_CHUNK_SIZE`.

/// Maximum length of a directory/file name, including the NUL terminator.
pub const MAX_NAME: usize = 64;

/// Maximum number of entries (including `.` and `..`) in a directory.
pub const MAX_ENTRIES: usize = 50;

/// Size of the open file handle (FCB) pool.
pub const MAX_FCBS: usize = 20;

/// Default block size in bytes, used when a caller doesn't override it.
pub const DEFAULT_BLOCK_SIZE: u64 = 512;

/// The 8-byte magic stamped into the VCB of a formatted volume.
pub const MAGIC: [u8; 8] = *b"FIORE_FS";
