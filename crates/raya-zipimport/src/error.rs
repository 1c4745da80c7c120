//! Error types for archive indexing and module resolution.

use std::io;

use thiserror::Error;

use crate::encoder::DecodeError;

/// Broad category of a [`ZipImportError`].
///
/// Callers use this to decide whether a failure is expected (a module is simply
/// absent) or fatal (the archive no longer matches its index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The archive bytes are not what the index promised. Never retried.
    ArchiveIntegrity,
    /// A module or data path is not in the archive.
    Resolution,
    /// A persisted index could not be decoded.
    IndexFormat,
    /// The filesystem could not be accessed.
    Environment,
    /// The host compiler rejected the module.
    Compile,
    /// The caller passed an invalid argument.
    Usage,
}

/// Errors produced by the zipimport engine
#[derive(Debug, Error)]
pub enum ZipImportError {
    /// Local entry header magic does not match `PK\x03\x04`
    #[error("Bad local file header in {archive} at offset {offset}")]
    BadLocalHeader { archive: String, offset: u64 },

    /// Fewer bytes were available than the index records
    #[error("Can't read data for {path} in {archive}: expected {expected} bytes, got {actual}")]
    ShortRead {
        archive: String,
        path: String,
        expected: u64,
        actual: u64,
    },

    /// The central directory could not be decoded
    #[error("Bad archive directory in {archive}: {reason}")]
    BadDirectory { archive: String, reason: String },

    /// The entry uses a compression method other than stored or deflate
    #[error("Unsupported compression method {method} for {path}")]
    UnsupportedCompression { path: String, method: u16 },

    /// Deflate stream could not be inflated
    #[error("Failed to decompress {path}: {source}")]
    Decompress {
        path: String,
        #[source]
        source: io::Error,
    },

    /// No search-order suffix matched the module
    #[error("Can't find module '{name}' (tried: {tried:?})")]
    ModuleNotFound { name: String, tried: Vec<String> },

    /// `get_data` was asked for a path the archive does not contain
    #[error("Not found: {0}")]
    DataNotFound(String),

    /// A persisted or inline index could not be decoded
    #[error("Invalid index: {0}")]
    InvalidIndex(#[from] IndexFormatError),

    /// I/O error while touching the filesystem
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// No regular file was found on the path or any of its ancestors
    #[error("Not a zip archive: {0}")]
    NotAnArchive(String),

    /// The host compiler rejected the module
    #[error("Failed to compile {origin}: {reason}")]
    Compile { origin: String, reason: String },

    /// A source entry is not valid UTF-8
    #[error("Source is not valid UTF-8: {0}")]
    InvalidSource(String),

    /// A preload pattern is not a valid glob
    #[error("Invalid preload pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl ZipImportError {
    /// Classify the error
    pub fn class(&self) -> ErrorClass {
        match self {
            ZipImportError::BadLocalHeader { .. }
            | ZipImportError::ShortRead { .. }
            | ZipImportError::BadDirectory { .. }
            | ZipImportError::UnsupportedCompression { .. }
            | ZipImportError::Decompress { .. } => ErrorClass::ArchiveIntegrity,
            ZipImportError::ModuleNotFound { .. } | ZipImportError::DataNotFound(_) => {
                ErrorClass::Resolution
            }
            ZipImportError::InvalidIndex(_) => ErrorClass::IndexFormat,
            ZipImportError::Io { .. } | ZipImportError::NotAnArchive(_) => {
                ErrorClass::Environment
            }
            ZipImportError::Compile { .. } | ZipImportError::InvalidSource(_) => {
                ErrorClass::Compile
            }
            ZipImportError::InvalidPattern { .. } => ErrorClass::Usage,
        }
    }

    /// Wrap an I/O error with the path that produced it
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        ZipImportError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors decoding an index file or an inline index payload.
///
/// Raised by the `.idx` fast path these never reach the caller; the index is
/// discarded and the archive is parsed instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexFormatError {
    /// Truncated or malformed payload
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Wrong magic number
    #[error("Invalid magic number: expected RZIX, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported format version
    #[error("Unsupported index version: {0}")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// A key uses the separator of the other platform
    #[error("Index key '{0}' uses a foreign path separator")]
    ForeignSeparator(String),

    /// An inline index record has no embedded data
    #[error("Inline index entry '{0}' has no embedded data")]
    MissingBlob(String),

    /// Bytes follow the last record
    #[error("{0} trailing bytes after the last index entry")]
    TrailingData(usize),
}
