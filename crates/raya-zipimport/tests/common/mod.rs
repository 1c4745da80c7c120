//! Shared fixtures: ZIP archives built with the `zip` crate and a host compiler
//! that records which form it was handed.

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use raya_zipimport::{
    encode_compiled, CodeCompiler, PathConvention, ZipImportConfig, ZipImportError,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Magic number of compiled entries
pub const MAGIC: [u8; 4] = *b"RYB\x01";

/// Unix time of [`entry_time`]: 2020-06-15 12:30:00 UTC
pub const SOURCE_TIME: u32 = 1_592_224_200;

/// Modification time stamped on every fixture entry
pub fn entry_time() -> DateTime {
    DateTime::from_date_and_time(2020, 6, 15, 12, 30, 0).unwrap()
}

/// Code produced by [`TestCompiler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCode {
    Compiled(String),
    Source(String),
}

pub struct TestCompiler;

impl CodeCompiler for TestCompiler {
    type Code = TestCode;

    fn magic(&self) -> [u8; 4] {
        MAGIC
    }

    fn compile_source(&self, source: &str, origin: &str) -> Result<TestCode, ZipImportError> {
        if source.contains("syntax error") {
            return Err(ZipImportError::Compile {
                origin: origin.to_string(),
                reason: "syntax error".to_string(),
            });
        }
        Ok(TestCode::Source(source.to_string()))
    }

    fn load_compiled(&self, payload: &[u8], _origin: &str) -> Result<TestCode, ZipImportError> {
        Ok(TestCode::Compiled(
            String::from_utf8_lossy(payload).into_owned(),
        ))
    }
}

/// A compiled entry stamped with `mtime`
pub fn compiled(mtime: u32, payload: &str) -> Vec<u8> {
    encode_compiled(MAGIC, mtime, payload.as_bytes())
}

/// ZIP bytes holding `entries`, deflated and stamped with [`entry_time`]
pub fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    zip_bytes_with(entries, CompressionMethod::Deflated)
}

/// ZIP bytes holding `entries` compressed with `method`
pub fn zip_bytes_with(entries: &[(&str, Vec<u8>)], method: CompressionMethod) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(entry_time());
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Write an archive into `dir` and return its path as a string
pub fn write_archive(dir: &Path, name: &str, entries: &[(&str, Vec<u8>)]) -> String {
    let path = dir.join(name);
    fs::write(&path, zip_bytes(entries)).unwrap();
    path_string(&path)
}

pub fn path_string(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

pub fn index_file(archive: &str) -> PathBuf {
    PathBuf::from(format!("{}.idx", archive))
}

pub fn posix_config() -> Arc<ZipImportConfig> {
    Arc::new(ZipImportConfig {
        platform: Some(PathConvention::Posix),
        ..ZipImportConfig::default()
    })
}

pub fn text(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}
