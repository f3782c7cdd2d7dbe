//! Error kinds shared by every layer of the filesystem.
//!
//! Grounded on the `thiserror`-based error enums used throughout the
//! retrieval pack's userspace filesystem implementations (e.g.
//! `simplefs`'s `SFSError`), in place of the original C source's
//! convention of returning a bare negative `int`.

use thiserror::Error;

/// Every error a [`crate::Filesystem`] or [`crate::Fcb`] operation can return.
///
/// Variant names follow the error kinds enumerated in the design spec's
/// error handling section, not the call site that produced them.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("no space left on volume")]
    NoSpace,

    #[error("directory is full")]
    Capacity,

    #[error("handle already pinned to the other mode")]
    ModeConflict,

    #[error("block device I/O failure")]
    Io(#[from] std::io::Error),

    #[error("internal inconsistency: {0}")]
    Internal(&'static str),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    /// Maps to the legacy "negative on failure" convention described in
    /// the external interfaces of the spec. Used only by CLI-facing
    /// shims; core code should keep propagating `FsError` with `?`.
    pub fn legacy_code(&self) -> i64 {
        -1
    }
}
