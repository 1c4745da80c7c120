//! Raya ZIP Module Importer
//!
//! Loads Raya modules from ZIP archives, including this crate's:
//! - Central directory parsing and on-demand entry decompression
//! - Persisted directory indexes (`<archive>.idx`) that skip the parse
//! - Module resolution with compiled/source fallback and freshness checks
//! - Preloading entries into the index so reads never touch the archive
//! - Inline artifacts: an archive rendered as Rust source
//! - Capability-tagged path hooks with a finder cache
//!
//! Executing code is left to the host, which plugs in through [`CodeCompiler`].

pub mod archive;
pub mod compiler;
pub mod config;
pub mod convention;
pub mod encoder;
pub mod error;
pub mod hooks;
pub mod importer;
pub mod index;
pub mod inline;
pub mod persist;
pub mod preload;
pub mod registry;
pub mod resolver;
pub mod search;

pub use archive::{CompressionMethod, DosDateTime, FileRecord};
pub use compiler::{encode_compiled, CodeCompiler, CompiledHeader};
pub use config::{ConfigError, ZipImportConfig};
pub use convention::PathConvention;
pub use error::{ErrorClass, IndexFormatError, ZipImportError};
pub use hooks::{HookChain, Installation, ModuleFinder, PathHook, ZipImportHook};
pub use importer::{LoadedModule, WriteIndexOptions, ZipImporter};
pub use index::DirectoryIndex;
pub use inline::{generate_inline_artifact, install_inline, InlineArtifact};
pub use registry::{ArchiveBinding, ArchiveRegistry, IndexOrigin, RegistryStats, SharedIndex};
pub use resolver::{ModuleKind, ModuleResolution};
pub use search::{SearchMode, SearchOrder};
