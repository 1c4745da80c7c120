//! Table-of-contents records

use std::sync::Arc;

use super::dos_time::{dos_to_unix, DosDateTime};

/// Compression method of an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// Method 0: bytes stored as-is
    Stored,
    /// Method 8: raw deflate stream
    Deflated,
    /// Any other method; reading the entry fails
    Unsupported(u16),
}

impl CompressionMethod {
    /// Map a ZIP method number
    pub fn from_u16(method: u16) -> Self {
        match method {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflated,
            other => CompressionMethod::Unsupported(other),
        }
    }

    /// ZIP method number
    pub fn to_u16(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflated => 8,
            CompressionMethod::Unsupported(other) => other,
        }
    }
}

/// One entry of an archive's table of contents.
///
/// The relative path is the key under which the record is stored in a
/// [`DirectoryIndex`](crate::DirectoryIndex). `data` is only present after the
/// entry's raw (still compressed) bytes were embedded by preloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub compression: CompressionMethod,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    /// Offset of the local entry header from the start of the file
    pub data_offset: u64,
    /// Packed DOS modification time
    pub mod_time: u16,
    /// Packed DOS modification date
    pub mod_date: u16,
    pub crc32: u32,
    /// Embedded raw entry bytes
    pub data: Option<Arc<[u8]>>,
}

impl FileRecord {
    /// Whether reading this record needs no archive access
    pub fn is_embedded(&self) -> bool {
        self.data.is_some()
    }

    /// Decoded modification time
    pub fn modified(&self) -> DosDateTime {
        DosDateTime::decode(self.mod_date, self.mod_time)
    }

    /// Modification time in Unix seconds, see [`dos_to_unix`]
    pub fn modified_unix(&self, utc_offset: i64) -> Option<i64> {
        dos_to_unix(self.mod_date, self.mod_time, utc_offset)
    }

    /// Copy of this record with `data` attached
    pub fn with_data(&self, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: Some(data.into()),
            ..self.clone()
        }
    }
}
