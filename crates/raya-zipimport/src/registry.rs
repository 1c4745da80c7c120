//! Archive registry
//!
//! Holds one [`DirectoryIndex`] per archive so every importer over the same
//! archive shares a single table. Embedding through the registry updates that
//! table in place, so importers and cached finders opened earlier see the
//! embedded bytes too. The registry itself is an ordinary value owned by the
//! caller; share it across threads behind your own lock.
//!
//! Opening a path tries, in order:
//! 1. a resident index for the path or one of its ancestors
//! 2. the persisted index file `<path><index_suffix>`
//! 3. a scan of the archive found by walking up from the path

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::archive::parse_directory;
use crate::config::ZipImportConfig;
use crate::convention::PathConvention;
use crate::error::ZipImportError;
use crate::index::DirectoryIndex;
use crate::persist;
use crate::preload;

/// Directory index shared by the registry and every importer over one archive
pub type SharedIndex = Arc<RwLock<DirectoryIndex>>;

/// Where an importer's index came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOrigin {
    /// Already in the registry
    Resident,
    /// Loaded from a persisted index file
    Persisted,
    /// Parsed from the archive's central directory
    Scanned,
}

/// An archive path opened against the registry
#[derive(Debug, Clone)]
pub struct ArchiveBinding {
    /// Path of the archive file
    pub archive: String,
    /// Sub-directory inside the archive, with a trailing separator, or empty
    pub prefix: String,
    pub index: SharedIndex,
    pub origin: IndexOrigin,
}

/// Registry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Opens served from a resident index
    pub resident_hits: u64,
    /// Indexes loaded from persisted files
    pub persisted_loads: u64,
    /// Persisted files discarded as unreadable or invalid
    pub rejected_indexes: u64,
    /// Archives whose central directory was parsed
    pub scans: u64,
}

/// Directory indexes keyed by archive path
#[derive(Debug, Default)]
pub struct ArchiveRegistry {
    indexes: HashMap<String, SharedIndex>,
    stats: RegistryStats,
}

impl ArchiveRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Index registered for exactly `archive`
    pub fn get(&self, archive: &str) -> Option<SharedIndex> {
        self.indexes.get(archive).cloned()
    }

    pub fn contains(&self, archive: &str) -> bool {
        self.indexes.contains_key(archive)
    }

    /// Register an index, returning the one it replaces
    pub fn insert(&mut self, archive: impl Into<String>, index: DirectoryIndex) -> Option<SharedIndex> {
        self.indexes
            .insert(archive.into(), Arc::new(RwLock::new(index)))
    }

    pub fn remove(&mut self, archive: &str) -> Option<SharedIndex> {
        self.indexes.remove(archive)
    }

    pub fn clear(&mut self) {
        self.indexes.clear();
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Registered archive paths
    pub fn archives(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// Find the index for `path` or its nearest registered ancestor.
    ///
    /// Returns the archive path and the stripped components as a prefix.
    pub fn find_resident(&self, path: &str, convention: PathConvention) -> Option<(String, String)> {
        let mut archive = path;
        let mut stripped = Vec::new();
        loop {
            if self.indexes.contains_key(archive) {
                return Some((archive.to_string(), make_prefix(&stripped, convention)));
            }
            let (head, tail) = convention.split_last(archive)?;
            stripped.push(tail);
            archive = head;
        }
    }

    /// Open `path` (an archive, or a directory inside one)
    pub fn open(
        &mut self,
        path: &str,
        config: &ZipImportConfig,
    ) -> Result<ArchiveBinding, ZipImportError> {
        if path.is_empty() {
            return Err(ZipImportError::NotAnArchive(path.to_string()));
        }
        let convention = config.convention();

        if let Some((archive, prefix)) = self.find_resident(path, convention) {
            self.stats.resident_hits += 1;
            let index = self.indexes[&archive].clone();
            return Ok(ArchiveBinding {
                archive,
                prefix,
                index,
                origin: IndexOrigin::Resident,
            });
        }

        let index_file = persist::index_path(path, &config.index_suffix);
        if index_file.is_file() {
            // Any failure falls through to a scan
            match persist::load_persisted(&index_file, convention) {
                Ok(index) => {
                    self.stats.persisted_loads += 1;
                    let index = Arc::new(RwLock::new(index));
                    self.indexes.insert(path.to_string(), index.clone());
                    return Ok(ArchiveBinding {
                        archive: path.to_string(),
                        prefix: String::new(),
                        index,
                        origin: IndexOrigin::Persisted,
                    });
                }
                Err(_) => self.stats.rejected_indexes += 1,
            }
        }

        let (archive, prefix) = locate_archive(path, convention)?;
        let index = Arc::new(RwLock::new(parse_directory(Path::new(&archive), convention)?));
        self.stats.scans += 1;
        self.indexes.insert(archive.clone(), index.clone());
        Ok(ArchiveBinding {
            archive,
            prefix,
            index,
            origin: IndexOrigin::Scanned,
        })
    }

    /// Embed matching entries of a registered archive in place.
    ///
    /// Returns the number of records newly embedded.
    pub fn embed(
        &mut self,
        archive: &str,
        patterns: &[String],
        convention: PathConvention,
    ) -> Result<usize, ZipImportError> {
        let index = self
            .indexes
            .get(archive)
            .ok_or_else(|| ZipImportError::NotAnArchive(archive.to_string()))?;
        preload::embed(&mut index.write(), archive, patterns, convention)
    }
}

/// Walk up from `path` to the first regular file
fn locate_archive(path: &str, convention: PathConvention) -> Result<(String, String), ZipImportError> {
    let mut archive = path;
    let mut stripped = Vec::new();
    loop {
        match fs::metadata(archive) {
            Ok(meta) if meta.is_file() => {
                return Ok((archive.to_string(), make_prefix(&stripped, convention)));
            }
            Ok(_) => return Err(ZipImportError::NotAnArchive(path.to_string())),
            Err(_) => match convention.split_last(archive) {
                Some((head, tail)) if !head.is_empty() => {
                    stripped.push(tail);
                    archive = head;
                }
                _ => return Err(ZipImportError::NotAnArchive(path.to_string())),
            },
        }
    }
}

/// Join stripped components (innermost last) into a prefix with trailing separator
fn make_prefix(stripped: &[&str], convention: PathConvention) -> String {
    let mut prefix = String::new();
    for component in stripped.iter().rev() {
        prefix.push_str(component);
        prefix.push(convention.sep());
    }
    prefix
}
