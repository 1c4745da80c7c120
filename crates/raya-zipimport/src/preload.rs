//! Preloading: embedding entry bytes into an index
//!
//! An embedded record carries its raw (still compressed) bytes, so reading it
//! never opens the archive. Patterns are globs over `/`-separated keys,
//! whatever the index's own convention.

use std::path::Path;

use glob::Pattern;

use crate::archive::read_entry;
use crate::convention::PathConvention;
use crate::error::ZipImportError;
use crate::index::DirectoryIndex;

/// Compile glob patterns
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, ZipImportError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| ZipImportError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}

/// Embed every record whose key matches one of `patterns`.
///
/// Returns the number of records newly embedded; records that already carry
/// bytes are skipped.
pub fn embed(
    index: &mut DirectoryIndex,
    archive: &str,
    patterns: &[String],
    convention: PathConvention,
) -> Result<usize, ZipImportError> {
    let patterns = compile_patterns(patterns)?;
    embed_where(index, archive, |key| {
        let key = convention.translate(key, PathConvention::Posix);
        patterns.iter().any(|pattern| pattern.matches(&key))
    })
}

/// Embed every record of the index
pub fn embed_all(index: &mut DirectoryIndex, archive: &str) -> Result<usize, ZipImportError> {
    embed_where(index, archive, |_| true)
}

fn embed_where<F>(index: &mut DirectoryIndex, archive: &str, select: F) -> Result<usize, ZipImportError>
where
    F: Fn(&str) -> bool,
{
    let path = Path::new(archive);
    let mut count = 0;
    for (key, record) in index.iter_mut() {
        if record.is_embedded() || !select(key) {
            continue;
        }
        let raw = read_entry(path, key, record, true)?;
        record.data = Some(raw.into());
        count += 1;
    }
    Ok(count)
}
