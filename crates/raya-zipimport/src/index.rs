//! In-memory directory index
//!
//! A [`DirectoryIndex`] maps the relative path of every archive member to its
//! [`FileRecord`]. All keys share one separator convention.

use std::collections::HashMap;

use crate::archive::FileRecord;
use crate::convention::PathConvention;
use crate::error::IndexFormatError;

/// Table of contents of one archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryIndex {
    records: HashMap<String, FileRecord>,
}

impl DirectoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with room for `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a record, returning the one it replaces
    pub fn insert(&mut self, key: impl Into<String>, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(key.into(), record)
    }

    pub fn get(&self, key: &str) -> Option<&FileRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileRecord)> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut FileRecord)> {
        self.records.iter_mut()
    }

    /// All keys, sorted
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.records.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of records carrying embedded bytes
    pub fn embedded_count(&self) -> usize {
        self.records.values().filter(|r| r.is_embedded()).count()
    }

    /// Copy of this index with every key rewritten from `from` into `to`
    pub fn translated(&self, from: PathConvention, to: PathConvention) -> DirectoryIndex {
        self.records
            .iter()
            .map(|(key, record)| (from.translate(key, to), record.clone()))
            .collect()
    }

    /// Reject the table if any key carries the other convention's separator
    pub fn check_convention(&self, convention: PathConvention) -> Result<(), IndexFormatError> {
        let foreign = convention.foreign_sep();
        match self.records.keys().find(|key| key.contains(foreign)) {
            Some(key) => Err(IndexFormatError::ForeignSeparator(key.clone())),
            None => Ok(()),
        }
    }
}

impl FromIterator<(String, FileRecord)> for DirectoryIndex {
    fn from_iter<I: IntoIterator<Item = (String, FileRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
