//! Error types for hidcap.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging and
//! `Display` for the text sent over the serial console.

use core::fmt;

/// Storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageOp {
    Mount,
    Open,
    Write,
    Read,
    Close,
}

impl StorageOp {
    pub fn name(self) -> &'static str {
        match self {
            StorageOp::Mount => "mount",
            StorageOp::Open => "open",
            StorageOp::Write => "write",
            StorageOp::Read => "read",
            StorageOp::Close => "close",
        }
    }
}

/// Result code reported by a [`FileSystem`](crate::storage::FileSystem).
///
/// The numeric value is what gets printed next to the reason, so keep
/// the discriminants stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FsCode {
    /// Low-level I/O error in the block device.
    DiskError = 1,
    /// Driver reached an unexpected state.
    InternalError = 2,
    /// No medium, or the medium did not answer.
    NotReady = 3,
    /// File does not exist.
    NoFile = 4,
    /// Name is not a valid file name for this volume.
    InvalidName = 6,
    /// Access denied (full volume or read-only medium).
    Denied = 7,
    /// File already exists.
    Exist = 8,
    /// Handle is stale or was never opened.
    InvalidObject = 9,
    /// Medium is write-protected.
    WriteProtected = 10,
    /// No valid filesystem found on the medium.
    NoFilesystem = 13,
    /// Item does not fit the working buffer.
    NotEnoughCore = 17,
}

impl FsCode {
    /// Numeric code as printed in console messages.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable reason.
    pub fn reason(self) -> &'static str {
        match self {
            FsCode::DiskError => "disk error",
            FsCode::InternalError => "internal error",
            FsCode::NotReady => "not ready",
            FsCode::NoFile => "no file",
            FsCode::InvalidName => "invalid name",
            FsCode::Denied => "denied",
            FsCode::Exist => "exists",
            FsCode::InvalidObject => "invalid object",
            FsCode::WriteProtected => "write protected",
            FsCode::NoFilesystem => "no filesystem",
            FsCode::NotEnoughCore => "buffer too small",
        }
    }
}

impl fmt::Display for FsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason(), self.code())
    }
}

/// A failed storage operation: which step broke and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageError {
    pub op: StorageOp,
    pub code: FsCode,
}

impl StorageError {
    pub const fn new(op: StorageOp, code: FsCode) -> Self {
        Self { op, code }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.op.name(), self.code)
    }
}
