//! Importer configuration (zipimport.toml)
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! index_suffix = ".idx"
//! source_suffix = ".raya"
//! compiled_suffix = ".ryb"
//! optimized_suffix = ".ryo"     # optional
//! package_init = "index"
//! mode = "standard"             # standard | optimized | verify-source
//! platform = "posix"            # optional, defaults to the host
//! source_time_offset = 0        # seconds east of UTC of the archive's clock
//! ```
//!
//! # Entry timestamps
//!
//! ZIP entries carry a DOS civil time with no zone. It is read as UTC and then
//! shifted by `source_time_offset`. Archives written by tools that stamp local
//! time (most of them) on a machine that is not on UTC need the offset of that
//! machine, e.g. `3600` for UTC+1; with the default every compiled entry whose
//! source sits next to it looks stale and the source is compiled instead.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convention::PathConvention;
use crate::search::SearchMode;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field has an unusable value
    #[error("Invalid config: {0}")]
    Validation(String),
}

/// Suffixes, search mode and path convention used by importers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZipImportConfig {
    /// Appended to the archive path to locate its persisted index
    #[serde(default = "default_index_suffix")]
    pub index_suffix: String,

    /// Suffix of source modules
    #[serde(default = "default_source_suffix")]
    pub source_suffix: String,

    /// Suffix of compiled modules
    #[serde(default = "default_compiled_suffix")]
    pub compiled_suffix: String,

    /// Suffix of optimized compiled modules, if the host produces them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_suffix: Option<String>,

    /// File stem that marks a directory as a package
    #[serde(default = "default_package_init")]
    pub package_init: String,

    #[serde(default)]
    pub mode: SearchMode,

    /// Path convention of index keys; the host's when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PathConvention>,

    /// UTC offset in seconds of the clock that stamped archive entries.
    ///
    /// Defaults to 0, which only suits archives stamped in UTC; see the
    /// module docs.
    #[serde(default)]
    pub source_time_offset: i64,
}

fn default_index_suffix() -> String {
    ".idx".to_string()
}

fn default_source_suffix() -> String {
    ".raya".to_string()
}

fn default_compiled_suffix() -> String {
    ".ryb".to_string()
}

fn default_package_init() -> String {
    "index".to_string()
}

impl Default for ZipImportConfig {
    fn default() -> Self {
        Self {
            index_suffix: default_index_suffix(),
            source_suffix: default_source_suffix(),
            compiled_suffix: default_compiled_suffix(),
            optimized_suffix: None,
            package_init: default_package_init(),
            mode: SearchMode::default(),
            platform: None,
            source_time_offset: 0,
        }
    }
}

impl ZipImportConfig {
    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ZipImportConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_suffix("index_suffix", &self.index_suffix)?;
        validate_suffix("source_suffix", &self.source_suffix)?;
        validate_suffix("compiled_suffix", &self.compiled_suffix)?;
        if let Some(optimized) = &self.optimized_suffix {
            validate_suffix("optimized_suffix", optimized)?;
            if optimized == &self.source_suffix || optimized == &self.compiled_suffix {
                return Err(ConfigError::Validation(format!(
                    "optimized_suffix '{}' must differ from the source and compiled suffixes",
                    optimized
                )));
            }
        }
        if self.source_suffix == self.compiled_suffix {
            return Err(ConfigError::Validation(format!(
                "source_suffix and compiled_suffix are both '{}'",
                self.source_suffix
            )));
        }

        if self.package_init.is_empty() {
            return Err(ConfigError::Validation(
                "package_init cannot be empty".to_string(),
            ));
        }
        if self.package_init.contains(['/', '\\', '.']) {
            return Err(ConfigError::Validation(format!(
                "package_init '{}' must be a bare file stem",
                self.package_init
            )));
        }

        Ok(())
    }

    /// Path convention in effect
    pub fn convention(&self) -> PathConvention {
        self.platform.unwrap_or_else(PathConvention::host)
    }
}

fn validate_suffix(field: &str, suffix: &str) -> Result<(), ConfigError> {
    if suffix.len() < 2 || !suffix.starts_with('.') {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must be a '.'-prefixed extension",
            field, suffix
        )));
    }
    if suffix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "{} '{}' cannot contain a path separator",
            field, suffix
        )));
    }
    Ok(())
}
