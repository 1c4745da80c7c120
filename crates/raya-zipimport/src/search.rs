//! Module search order
//!
//! Resolving `name` tries `name + suffix` for every [`SearchEntry`] in order;
//! the first entry present in the index wins. Package forms come first, so
//! `app/index.ryb` beats `app.ryb`.

use serde::{Deserialize, Serialize};

use crate::config::ZipImportConfig;

/// Which form of a module is preferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// Compiled, then optimized compiled, then source
    #[default]
    Standard,
    /// Optimized compiled first
    Optimized,
    /// Source first, so compiled forms are only used when no source exists
    VerifySource,
}

/// One suffix probed during resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    /// Appended to the module's path, e.g. `/index.ryb` or `.raya`
    pub suffix: String,
    /// Whether a hit makes the module a package
    pub is_package: bool,
    /// Whether the entry holds compiled code
    pub is_compiled: bool,
    /// Suffix of the paired source entry, for compiled forms
    pub source_suffix: Option<String>,
}

/// Ordered suffix table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOrder {
    entries: Vec<SearchEntry>,
}

/// File form within one search order slot
#[derive(Clone, Copy)]
enum Form {
    Compiled,
    Optimized,
    Source,
}

impl SearchOrder {
    /// Build the table for the configured suffixes, mode and separator
    pub fn from_config(config: &ZipImportConfig) -> Self {
        let forms: &[Form] = match (config.mode, config.optimized_suffix.is_some()) {
            (SearchMode::VerifySource, _) => &[Form::Source, Form::Compiled, Form::Optimized],
            (SearchMode::Optimized, true) => &[Form::Optimized, Form::Compiled, Form::Source],
            _ => &[Form::Compiled, Form::Optimized, Form::Source],
        };

        let package_stem = format!("{}{}", config.convention().sep(), config.package_init);
        let mut entries = Vec::with_capacity(forms.len() * 2);
        for (stem, is_package) in [(package_stem.as_str(), true), ("", false)] {
            let source_suffix = format!("{}{}", stem, config.source_suffix);
            for form in forms {
                let entry = match form {
                    Form::Source => SearchEntry {
                        suffix: source_suffix.clone(),
                        is_package,
                        is_compiled: false,
                        source_suffix: None,
                    },
                    Form::Compiled | Form::Optimized => {
                        let ext = match form {
                            Form::Optimized => match &config.optimized_suffix {
                                Some(ext) => ext,
                                None => continue,
                            },
                            _ => &config.compiled_suffix,
                        };
                        SearchEntry {
                            suffix: format!("{}{}", stem, ext),
                            is_package,
                            is_compiled: true,
                            source_suffix: Some(source_suffix.clone()),
                        }
                    }
                };
                entries.push(entry);
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a SearchOrder {
    type Item = &'a SearchEntry;
    type IntoIter = std::slice::Iter<'a, SearchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
