//! ZIP directory decoding and entry reads
//!
//! The central directory is read with [`zip::ZipArchive`], which finds the end
//! record and corrects offsets for bytes prepended to the archive (e.g. a
//! launcher stub). Entry reads are done by hand:
//!
//! ```text
//! ┌──────────────────────────┐
//! │ local header             │  ← "PK\x03\x04", 30 bytes, re-checked on every read
//! ├──────────────────────────┤
//! │ name + extra             │  ← lengths taken from the local header
//! ├──────────────────────────┤
//! │ data                     │  ← exactly `compressed_size` bytes
//! └──────────────────────────┘
//! ```
//!
//! Every entry read opens the archive, reads, and closes it again; no handle is
//! kept between calls.

use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::DeflateDecoder;
use zip::ZipArchive;

use super::record::{CompressionMethod, FileRecord};
use crate::convention::PathConvention;
use crate::error::ZipImportError;
use crate::index::DirectoryIndex;

/// Magic bytes opening every local entry header
pub const LOCAL_HEADER_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Fixed size of a local entry header
pub const LOCAL_HEADER_SIZE: usize = 30;

/// Upper bound on buffer space reserved from sizes recorded in the archive
const MAX_PREALLOC: usize = 1 << 20;

// ============================================================================
// Directory parsing
// ============================================================================

/// Parse the central directory of `archive` into a fresh index.
///
/// Member names are translated from `/` into `convention`.
pub fn parse_directory(
    archive: &Path,
    convention: PathConvention,
) -> Result<DirectoryIndex, ZipImportError> {
    let archive_name = archive.display().to_string();
    let bad = |reason: String| ZipImportError::BadDirectory {
        archive: archive_name.clone(),
        reason,
    };

    let file = File::open(archive).map_err(|e| ZipImportError::io(&archive_name, e))?;
    let mut directory = ZipArchive::new(file).map_err(|e| bad(e.to_string()))?;

    let mut index = DirectoryIndex::with_capacity(directory.len());
    for i in 0..directory.len() {
        let entry = directory
            .by_index_raw(i)
            .map_err(|e| bad(format!("entry {}: {}", i, e)))?;

        let (Ok(compressed_size), Ok(uncompressed_size)) =
            (u32::try_from(entry.compressed_size()), u32::try_from(entry.size()))
        else {
            return Err(bad(format!("entry {}: zip64 entries are not supported", i)));
        };
        if entry.header_start() > u32::MAX as u64 {
            return Err(bad(format!("entry {}: zip64 entries are not supported", i)));
        }

        // Out-of-range stamps come back as `None`; a zero date is never fresh
        let (mod_date, mod_time) = entry
            .last_modified()
            .map_or((0, 0), |stamp| (stamp.datepart(), stamp.timepart()));

        let record = FileRecord {
            compression: compression_of(entry.compression()),
            compressed_size,
            uncompressed_size,
            data_offset: entry.header_start(),
            mod_time,
            mod_date,
            crc32: entry.crc32(),
            data: None,
        };
        index.insert(convention.from_archive_name(entry.name()), record);
    }

    Ok(index)
}

#[allow(deprecated)]
fn compression_of(method: zip::CompressionMethod) -> CompressionMethod {
    match method {
        zip::CompressionMethod::Stored => CompressionMethod::Stored,
        zip::CompressionMethod::Deflated => CompressionMethod::Deflated,
        other => CompressionMethod::Unsupported(other.to_u16()),
    }
}

// ============================================================================
// Entry reads
// ============================================================================

/// Read the bytes of one entry.
///
/// Embedded records are served from memory without touching `archive`. With
/// `raw` the still-compressed bytes are returned.
pub fn read_entry(
    archive: &Path,
    key: &str,
    record: &FileRecord,
    raw: bool,
) -> Result<Vec<u8>, ZipImportError> {
    let data: Cow<'_, [u8]> = match &record.data {
        Some(embedded) => Cow::Borrowed(embedded),
        None => Cow::Owned(read_raw(archive, key, record)?),
    };

    if raw {
        return Ok(data.into_owned());
    }
    decompress(key, record, data)
}

/// Read the compressed bytes of an entry from the archive file
fn read_raw(archive: &Path, key: &str, record: &FileRecord) -> Result<Vec<u8>, ZipImportError> {
    let archive_name = archive.display().to_string();
    let io_err = |e| ZipImportError::io(&archive_name, e);

    let mut file = File::open(archive).map_err(io_err)?;
    file.seek(SeekFrom::Start(record.data_offset)).map_err(io_err)?;

    // The archive may have changed since the index was built
    let mut header = [0u8; LOCAL_HEADER_SIZE];
    let got = read_up_to(&mut file, &mut header).map_err(io_err)?;
    if got < 4 || header[..4] != LOCAL_HEADER_MAGIC {
        return Err(ZipImportError::BadLocalHeader {
            archive: archive_name,
            offset: record.data_offset,
        });
    }
    if got < LOCAL_HEADER_SIZE {
        return Err(ZipImportError::ShortRead {
            archive: archive_name,
            path: key.to_string(),
            expected: LOCAL_HEADER_SIZE as u64,
            actual: got as u64,
        });
    }

    // Name and extra lengths may differ from the central directory copy
    let name_len = u16::from_le_bytes([header[26], header[27]]) as i64;
    let extra_len = u16::from_le_bytes([header[28], header[29]]) as i64;
    file.seek(SeekFrom::Current(name_len + extra_len))
        .map_err(io_err)?;

    let expected = record.compressed_size as u64;
    let mut data = Vec::with_capacity((record.compressed_size as usize).min(MAX_PREALLOC));
    (&mut file)
        .take(expected)
        .read_to_end(&mut data)
        .map_err(io_err)?;
    if data.len() as u64 != expected {
        return Err(ZipImportError::ShortRead {
            archive: archive_name,
            path: key.to_string(),
            expected,
            actual: data.len() as u64,
        });
    }

    Ok(data)
}

/// Fill as much of `buf` as the stream allows
fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Undo the entry's compression
fn decompress(
    key: &str,
    record: &FileRecord,
    data: Cow<'_, [u8]>,
) -> Result<Vec<u8>, ZipImportError> {
    match record.compression {
        CompressionMethod::Stored => Ok(data.into_owned()),
        CompressionMethod::Deflated => {
            let mut out = Vec::with_capacity((record.uncompressed_size as usize).min(MAX_PREALLOC));
            DeflateDecoder::new(&data[..])
                .read_to_end(&mut out)
                .map_err(|source| ZipImportError::Decompress {
                    path: key.to_string(),
                    source,
                })?;
            Ok(out)
        }
        CompressionMethod::Unsupported(method) => Err(ZipImportError::UnsupportedCompression {
            path: key.to_string(),
            method,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn record(compression: CompressionMethod, size: u32) -> FileRecord {
        FileRecord {
            compression,
            compressed_size: size,
            uncompressed_size: size,
            data_offset: 0,
            mod_time: 0,
            mod_date: 0,
            crc32: 0,
            data: None,
        }
    }

    #[test]
    fn test_embedded_stored_entry_needs_no_file() {
        let rec = record(CompressionMethod::Stored, 5).with_data(b"hello".to_vec());
        let data = read_entry(Path::new("/nonexistent/lib.zip"), "a.raya", &rec, false).unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn test_embedded_deflated_entry_is_inflated() {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"let x = 1;\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut rec = record(CompressionMethod::Deflated, compressed.len() as u32);
        rec.uncompressed_size = 11;
        let rec = rec.with_data(compressed.clone());

        let archive = Path::new("/nonexistent/lib.zip");
        assert_eq!(read_entry(archive, "x.raya", &rec, false).unwrap(), b"let x = 1;\n");
        assert_eq!(read_entry(archive, "x.raya", &rec, true).unwrap(), compressed);
    }

    #[test]
    fn test_unsupported_compression() {
        let rec = record(CompressionMethod::Unsupported(12), 3).with_data(vec![1, 2, 3]);
        let err = read_entry(Path::new("lib.zip"), "a.raya", &rec, false).unwrap_err();
        assert!(matches!(
            err,
            ZipImportError::UnsupportedCompression { method: 12, .. }
        ));
    }

    #[test]
    fn test_bad_local_header() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), b"this is not a zip archive at all, not even close").unwrap();
        let err = read_entry(temp.path(), "a.raya", &record(CompressionMethod::Stored, 4), false)
            .unwrap_err();
        assert!(matches!(err, ZipImportError::BadLocalHeader { offset: 0, .. }));
    }

    #[test]
    fn test_compression_mapping() {
        assert_eq!(compression_of(zip::CompressionMethod::STORE), CompressionMethod::Stored);
        assert_eq!(compression_of(zip::CompressionMethod::DEFLATE), CompressionMethod::Deflated);
        assert_eq!(
            compression_of(zip::CompressionMethod::BZIP2),
            CompressionMethod::Unsupported(12)
        );
    }

    #[test]
    fn test_oversized_record_fails_as_short_read() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let mut bytes = LOCAL_HEADER_MAGIC.to_vec();
        bytes.resize(LOCAL_HEADER_SIZE + 8, 0);
        std::fs::write(temp.path(), &bytes).unwrap();

        let rec = record(CompressionMethod::Stored, u32::MAX);
        let err = read_entry(temp.path(), "big.raya", &rec, false).unwrap_err();
        assert!(matches!(
            err,
            ZipImportError::ShortRead { expected, actual: 8, .. } if expected == u32::MAX as u64
        ));
    }

    #[test]
    fn test_oversized_uncompressed_size_still_inflates() {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"tiny").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut rec = record(CompressionMethod::Deflated, compressed.len() as u32);
        rec.uncompressed_size = u32::MAX;
        let rec = rec.with_data(compressed);
        let data = read_entry(Path::new("/nonexistent/lib.zip"), "t.raya", &rec, false).unwrap();
        assert_eq!(data, b"tiny");
    }

    #[test]
    fn test_parse_rejects_non_archive() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), vec![0u8; 100]).unwrap();
        let err = parse_directory(temp.path(), PathConvention::Posix).unwrap_err();
        assert!(matches!(err, ZipImportError::BadDirectory { .. }));
    }

    #[test]
    fn test_parse_missing_file() {
        let err = parse_directory(Path::new("/nonexistent/lib.zip"), PathConvention::Posix)
            .unwrap_err();
        assert!(matches!(err, ZipImportError::Io { .. }));
    }
}
