//! Persisted index files (`<archive>.idx`)
//!
//! Format:
//! - Header: magic (4 bytes) + version (u32) + flags (u32) + crc32 (u32)
//! - Record count (u32)
//! - Records, sorted by key:
//!   key, filepath placeholder (empty), compression (u16), compressed size (u32),
//!   uncompressed size (u32), data offset (u64), DOS time (u16), DOS date (u16),
//!   crc32 (u32), has-blob (u8) + optional blob
//!
//! Strings and blobs are u32-length-prefixed. The CRC covers everything after
//! the header.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::{CompressionMethod, FileRecord};
use crate::convention::PathConvention;
use crate::encoder::{ByteReader, ByteWriter};
use crate::error::{IndexFormatError, ZipImportError};
use crate::index::DirectoryIndex;

/// Magic number for index files
pub const MAGIC: [u8; 4] = *b"RZIX";

/// Current index format version
pub const VERSION: u32 = 1;

/// Size of the fixed header
const HEADER_SIZE: usize = 16;

/// Index file flags
pub mod flags {
    /// At least one record carries embedded bytes
    pub const HAS_BLOBS: u32 = 1 << 0;
}

/// Location of the index file for `archive`
pub fn index_path(archive: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", archive, suffix))
}

/// Encode an index to the binary format
pub fn encode_index(index: &DirectoryIndex) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(HEADER_SIZE + index.len() * 64);

    let flags = if index.embedded_count() > 0 {
        flags::HAS_BLOBS
    } else {
        0
    };
    writer.emit_raw(&MAGIC);
    writer.emit_u32(VERSION);
    writer.emit_u32(flags);
    let crc32_offset = writer.offset();
    writer.emit_u32(0); // Placeholder for CRC32

    let keys = index.sorted_keys();
    writer.emit_u32(keys.len() as u32);
    for key in keys {
        // Every key comes from the index itself
        if let Some(record) = index.get(key) {
            encode_record(&mut writer, key, record);
        }
    }

    let crc32 = crc32fast::hash(&writer.buffer()[HEADER_SIZE..]);
    writer.patch_u32(crc32_offset, crc32);

    writer.into_bytes()
}

fn encode_record(writer: &mut ByteWriter, key: &str, record: &FileRecord) {
    writer.emit_string(key);
    // The computed file path is rebuilt per importer, never stored
    writer.emit_string("");
    writer.emit_u16(record.compression.to_u16());
    writer.emit_u32(record.compressed_size);
    writer.emit_u32(record.uncompressed_size);
    writer.emit_u64(record.data_offset);
    writer.emit_u16(record.mod_time);
    writer.emit_u16(record.mod_date);
    writer.emit_u32(record.crc32);
    match &record.data {
        Some(data) => {
            writer.emit_u8(1);
            writer.emit_blob(data);
        }
        None => writer.emit_u8(0),
    }
}

/// Decode an index from the binary format
pub fn decode_index(data: &[u8]) -> Result<DirectoryIndex, IndexFormatError> {
    let mut reader = ByteReader::new(data);

    let magic: [u8; 4] = reader.read_array()?;
    if magic != MAGIC {
        return Err(IndexFormatError::InvalidMagic(magic));
    }

    let version = reader.read_u32()?;
    if version != VERSION {
        return Err(IndexFormatError::UnsupportedVersion(version));
    }

    let _flags = reader.read_u32()?;
    let stored_crc32 = reader.read_u32()?;
    let calculated_crc32 = crc32fast::hash(&data[HEADER_SIZE..]);
    if stored_crc32 != calculated_crc32 {
        return Err(IndexFormatError::ChecksumMismatch {
            expected: stored_crc32,
            actual: calculated_crc32,
        });
    }

    let count = reader.read_u32()? as usize;
    let mut index = DirectoryIndex::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let (key, record) = decode_record(&mut reader)?;
        index.insert(key, record);
    }

    if reader.has_more() {
        return Err(IndexFormatError::TrailingData(reader.remaining()));
    }

    Ok(index)
}

fn decode_record(reader: &mut ByteReader<'_>) -> Result<(String, FileRecord), IndexFormatError> {
    let key = reader.read_string()?;
    let _filepath = reader.read_string()?;
    let compression = CompressionMethod::from_u16(reader.read_u16()?);
    let compressed_size = reader.read_u32()?;
    let uncompressed_size = reader.read_u32()?;
    let data_offset = reader.read_u64()?;
    let mod_time = reader.read_u16()?;
    let mod_date = reader.read_u16()?;
    let crc32 = reader.read_u32()?;
    let data = if reader.read_u8()? != 0 {
        Some(Arc::<[u8]>::from(reader.read_blob()?))
    } else {
        None
    };

    Ok((
        key,
        FileRecord {
            compression,
            compressed_size,
            uncompressed_size,
            data_offset,
            mod_time,
            mod_date,
            crc32,
            data,
        },
    ))
}

/// Load and validate the index file at `path`.
///
/// The table must be free of the other convention's separator.
pub fn load_persisted(
    path: &Path,
    convention: PathConvention,
) -> Result<DirectoryIndex, ZipImportError> {
    let data = fs::read(path).map_err(|e| ZipImportError::io(path.display().to_string(), e))?;
    let index = decode_index(&data)?;
    index.check_convention(convention)?;
    Ok(index)
}

/// Write `index` (keys in `from` convention) to `dest` with keys in `to`.
///
/// The file is written next to `dest` and renamed into place.
pub fn write_index(
    index: &DirectoryIndex,
    dest: &Path,
    from: PathConvention,
    to: PathConvention,
) -> Result<(), ZipImportError> {
    let bytes = if from == to {
        encode_index(index)
    } else {
        encode_index(&index.translated(from, to))
    };

    let dest_name = dest.display().to_string();
    let io_err = |e| ZipImportError::io(&dest_name, e);

    let tmp_path = PathBuf::from(format!("{}.tmp", dest_name));
    let mut tmp_file = fs::File::create(&tmp_path).map_err(io_err)?;
    tmp_file.write_all(&bytes).map_err(io_err)?;
    tmp_file.sync_all().map_err(io_err)?;
    drop(tmp_file);

    fs::rename(&tmp_path, dest).map_err(io_err)?;
    Ok(())
}
