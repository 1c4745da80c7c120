//! Per-path importer
//!
//! A [`ZipImporter`] binds one archive path (optionally a directory inside
//! the archive) to the shared directory index and resolves modules below it.
//! The index is read-locked for the duration of each call only.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLockReadGuard;

use crate::archive::read_entry;
use crate::compiler::CodeCompiler;
use crate::config::ZipImportConfig;
use crate::convention::PathConvention;
use crate::error::ZipImportError;
use crate::hooks::{ModuleFinder, ZIPIMPORT_CAPABILITY};
use crate::index::DirectoryIndex;
use crate::inline::{generate_inline_artifact, InlineArtifact};
use crate::persist;
use crate::preload;
use crate::registry::{ArchiveBinding, ArchiveRegistry, IndexOrigin, SharedIndex};
use crate::resolver::{ModuleKind, ResolveContext};
use crate::search::SearchOrder;

/// A module produced by [`ZipImporter::load_module`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule<T> {
    /// Fully qualified dotted name
    pub name: String,
    pub code: T,
    /// Full path of the entry the code came from
    pub file_path: String,
    pub is_package: bool,
    /// For packages, the directory holding the init file
    pub search_path: Option<Vec<String>>,
}

/// Options for [`ZipImporter::write_index`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteIndexOptions {
    /// Convention of the written keys; the importer's own when unset
    pub platform: Option<PathConvention>,
    /// Glob patterns of entries to embed in the file
    pub preload: Vec<String>,
}

/// Resolves modules inside one archive
pub struct ZipImporter<C: CodeCompiler> {
    archive: String,
    prefix: String,
    index: SharedIndex,
    origin: IndexOrigin,
    compiler: Arc<C>,
    config: Arc<ZipImportConfig>,
    order: SearchOrder,
    overlay: RefCell<HashMap<String, String>>,
}

impl<C: CodeCompiler> ZipImporter<C> {
    /// Open `path` through `registry`
    pub fn new(
        path: &str,
        registry: &mut ArchiveRegistry,
        compiler: Arc<C>,
        config: Arc<ZipImportConfig>,
    ) -> Result<Self, ZipImportError> {
        let binding = registry.open(path, &config)?;
        Ok(Self::from_binding(binding, compiler, config))
    }

    /// Create an importer for an already opened binding
    pub fn from_binding(
        binding: ArchiveBinding,
        compiler: Arc<C>,
        config: Arc<ZipImportConfig>,
    ) -> Self {
        let order = SearchOrder::from_config(&config);
        Self {
            archive: binding.archive,
            prefix: binding.prefix,
            index: binding.index,
            origin: binding.origin,
            compiler,
            config,
            order,
            overlay: RefCell::new(HashMap::new()),
        }
    }

    /// Path of the archive file
    pub fn archive(&self) -> &str {
        &self.archive
    }

    /// Sub-directory inside the archive, with trailing separator, or empty
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    /// Read access to the shared index
    pub fn index(&self) -> RwLockReadGuard<'_, DirectoryIndex> {
        self.index.read()
    }

    pub fn config(&self) -> &ZipImportConfig {
        &self.config
    }

    /// Number of origin paths computed so far
    pub fn computed_path_count(&self) -> usize {
        self.overlay.borrow().len()
    }

    fn with_context<R>(&self, f: impl FnOnce(&ResolveContext<'_>) -> R) -> R {
        let index = self.index.read();
        let ctx = ResolveContext {
            archive: &self.archive,
            prefix: &self.prefix,
            index: &index,
            order: &self.order,
            convention: self.config.convention(),
            time_offset: self.config.source_time_offset,
            overlay: &self.overlay,
        };
        f(&ctx)
    }

    fn not_found(&self, ctx: &ResolveContext<'_>, name: &str) -> ZipImportError {
        ZipImportError::ModuleNotFound {
            name: name.to_string(),
            tried: ctx.candidates(name),
        }
    }

    /// Whether `name` can be resolved in this archive
    pub fn find_module(&self, name: &str) -> bool {
        self.with_context(|ctx| ctx.module_kind(name).is_some())
    }

    /// Resolve `name` and describe the resulting module
    pub fn load_module(&self, name: &str) -> Result<LoadedModule<C::Code>, ZipImportError> {
        let resolution = self.with_context(|ctx| ctx.resolve(self.compiler.as_ref(), name))?;
        let is_package = resolution.is_package();
        let search_path = if is_package {
            let dir = self
                .config
                .convention()
                .split_last(&resolution.origin_path)
                .map_or(resolution.origin_path.as_str(), |(dir, _)| dir);
            Some(vec![dir.to_string()])
        } else {
            None
        };

        Ok(LoadedModule {
            name: name.to_string(),
            code: resolution.code,
            file_path: resolution.origin_path,
            is_package,
            search_path,
        })
    }

    /// Bytes of an archive entry.
    ///
    /// `path` is either relative to the archive root or starts with the
    /// archive path and a separator.
    pub fn get_data(&self, path: &str) -> Result<Vec<u8>, ZipImportError> {
        let key = path
            .strip_prefix(self.archive.as_str())
            .and_then(|rest| rest.strip_prefix(self.config.convention().sep()))
            .unwrap_or(path);
        let record = self
            .index
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ZipImportError::DataNotFound(key.to_string()))?;
        read_entry(Path::new(&self.archive), key, &record, false)
    }

    /// Executable code of `name`
    pub fn get_code(&self, name: &str) -> Result<C::Code, ZipImportError> {
        self.with_context(|ctx| ctx.resolve(self.compiler.as_ref(), name))
            .map(|resolution| resolution.code)
    }

    /// Source text of `name`; `None` when only compiled forms are archived
    pub fn get_source(&self, name: &str) -> Result<Option<String>, ZipImportError> {
        self.with_context(|ctx| ctx.source(name))
    }

    /// Full path of the first search-order hit for `name`.
    ///
    /// This may name a compiled entry that resolution would skip as stale.
    pub fn get_filename(&self, name: &str) -> Result<String, ZipImportError> {
        self.with_context(|ctx| {
            ctx.first_hit(name)
                .map(|(key, _)| ctx.origin_path(&key))
                .ok_or_else(|| self.not_found(ctx, name))
        })
    }

    pub fn is_package(&self, name: &str) -> Result<bool, ZipImportError> {
        self.with_context(|ctx| {
            ctx.module_kind(name)
                .map(|kind| kind == ModuleKind::Package)
                .ok_or_else(|| self.not_found(ctx, name))
        })
    }

    /// Persist the archive's whole index next to the archive.
    ///
    /// Returns the path of the written file.
    pub fn write_index(&self, options: &WriteIndexOptions) -> Result<PathBuf, ZipImportError> {
        let convention = self.config.convention();
        let dest = persist::index_path(&self.archive, &self.config.index_suffix);

        // The written file may embed more than the shared index does
        let mut index = self.index.read().clone();
        if !options.preload.is_empty() {
            preload::embed(&mut index, &self.archive, &options.preload, convention)?;
        }
        persist::write_index(
            &index,
            &dest,
            convention,
            options.platform.unwrap_or(convention),
        )?;

        Ok(dest)
    }

    /// Embed the whole archive into a filesystem-free artifact
    pub fn generate_inline_artifact(&self) -> Result<InlineArtifact, ZipImportError> {
        generate_inline_artifact(&self.index.read(), &self.archive, self.config.convention())
    }
}

impl<C: CodeCompiler> ModuleFinder<C::Code> for ZipImporter<C> {
    fn capability(&self) -> &str {
        ZIPIMPORT_CAPABILITY
    }

    fn find_module(&self, name: &str) -> bool {
        ZipImporter::find_module(self, name)
    }

    fn load_module(&self, name: &str) -> Result<LoadedModule<C::Code>, ZipImportError> {
        ZipImporter::load_module(self, name)
    }

    fn get_data(&self, path: &str) -> Result<Vec<u8>, ZipImportError> {
        ZipImporter::get_data(self, path)
    }

    fn get_code(&self, name: &str) -> Result<C::Code, ZipImportError> {
        ZipImporter::get_code(self, name)
    }

    fn get_source(&self, name: &str) -> Result<Option<String>, ZipImportError> {
        ZipImporter::get_source(self, name)
    }

    fn is_package(&self, name: &str) -> Result<bool, ZipImportError> {
        ZipImporter::is_package(self, name)
    }

    fn get_filename(&self, name: &str) -> Result<String, ZipImportError> {
        ZipImporter::get_filename(self, name)
    }
}

impl<C: CodeCompiler> fmt::Display for ZipImporter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "<zipimporter object \"{}\">", self.archive)
        } else {
            write!(
                f,
                "<zipimporter object \"{}{}{}\">",
                self.archive,
                self.config.convention().sep(),
                self.prefix
            )
        }
    }
}

impl<C: CodeCompiler> fmt::Debug for ZipImporter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipImporter")
            .field("archive", &self.archive)
            .field("prefix", &self.prefix)
            .field("origin", &self.origin)
            .field("entries", &self.index.read().len())
            .finish()
    }
}
