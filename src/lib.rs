//! `fiorefs` — a small block-structured filesystem that lives inside a
//! single regular host file.
//!
//! The [`Filesystem`] context owns the volume control block, the
//! free-space bitmap, the current working directory, and the open-file
//! handle pool, and exposes `mount`/`format` plus the directory and
//! file operations that mutate the tree. The interactive shell that
//! would normally sit on top of this (command parsing, line editing,
//! history, host-file copy) is out of scope here; see `src/bin` for a
//! minimal smoke-test client instead.

pub mod device;
pub mod error;
pub mod fs;
pub mod param;

pub use device::{BlockDevice, FileBlockDevice, MemBlockDevice};
pub use error::{FsError, Result};
pub use fs::directory::DirEntry;
pub use fs::io::OpenFlags;
pub use fs::ops::FileStat;
pub use fs::Filesystem;
