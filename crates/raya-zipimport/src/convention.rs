//! Platform path conventions
//!
//! Index keys, archive paths and prefixes are plain strings joined with the
//! separator of one convention. Archives always store `/`; keys are translated
//! to the active convention when the directory is parsed.

use serde::{Deserialize, Serialize};

/// Path separator convention of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathConvention {
    /// `/`-separated paths
    Posix,
    /// `\`-separated paths
    Windows,
}

impl PathConvention {
    /// Convention of the platform this binary was built for
    pub fn host() -> Self {
        if cfg!(windows) {
            PathConvention::Windows
        } else {
            PathConvention::Posix
        }
    }

    /// Separator character
    pub fn sep(self) -> char {
        match self {
            PathConvention::Posix => '/',
            PathConvention::Windows => '\\',
        }
    }

    /// Separator of the other convention
    pub fn foreign_sep(self) -> char {
        match self {
            PathConvention::Posix => '\\',
            PathConvention::Windows => '/',
        }
    }

    /// Rewrite `path` from this convention into `target`
    pub fn translate(self, path: &str, target: PathConvention) -> String {
        if self == target {
            path.to_string()
        } else {
            path.replace(self.sep(), &target.sep().to_string())
        }
    }

    /// Convert an archive member name (always `/`) into this convention
    pub fn from_archive_name(self, name: &str) -> String {
        PathConvention::Posix.translate(name, self)
    }

    /// Join two path fragments with this convention's separator
    pub fn join(self, head: &str, tail: &str) -> String {
        let mut out = String::with_capacity(head.len() + tail.len() + 1);
        out.push_str(head);
        out.push(self.sep());
        out.push_str(tail);
        out
    }

    /// Split off the final component: `a/b/c` becomes `("a/b", "c")`
    pub fn split_last(self, path: &str) -> Option<(&str, &str)> {
        path.rsplit_once(self.sep())
    }
}

impl std::fmt::Display for PathConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathConvention::Posix => write!(f, "posix"),
            PathConvention::Windows => write!(f, "windows"),
        }
    }
}
