//! Path hooks and the finder cache
//!
//! A [`HookChain`] turns search-path entries into [`ModuleFinder`]s by asking
//! each installed [`PathHook`] in turn. Hooks are identified by a capability
//! tag: installing a hook whose tag is already present replaces the existing
//! hook in place instead of adding a second one.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::compiler::CodeCompiler;
use crate::config::ZipImportConfig;
use crate::error::ZipImportError;
use crate::importer::{LoadedModule, ZipImporter};
use crate::registry::ArchiveRegistry;

/// Capability tag of archive importers
pub const ZIPIMPORT_CAPABILITY: &str = "zipimport";

/// Resolves modules below one search-path entry
pub trait ModuleFinder<T> {
    /// Tag of the hook that produced this finder
    fn capability(&self) -> &str;

    fn find_module(&self, name: &str) -> bool;

    fn load_module(&self, name: &str) -> Result<LoadedModule<T>, ZipImportError>;

    fn get_data(&self, path: &str) -> Result<Vec<u8>, ZipImportError>;

    fn get_code(&self, name: &str) -> Result<T, ZipImportError>;

    fn get_source(&self, name: &str) -> Result<Option<String>, ZipImportError>;

    fn is_package(&self, name: &str) -> Result<bool, ZipImportError>;

    fn get_filename(&self, name: &str) -> Result<String, ZipImportError>;
}

/// Creates finders for the search-path entries it understands
pub trait PathHook<T> {
    fn capability(&self) -> &str;

    /// A finder for `path`, or `None` if this hook does not handle it
    fn open(&self, path: &str, registry: &mut ArchiveRegistry) -> Option<Box<dyn ModuleFinder<T>>>;
}

/// Result of [`HookChain::install`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    /// A hook with the same tag was replaced in place
    Replaced,
    /// The hook was added at the end of the chain
    Appended,
}

enum CachedFinder<T> {
    Found {
        capability: String,
        finder: Rc<dyn ModuleFinder<T>>,
    },
    Missing,
}

/// Ordered path hooks plus the per-path finder cache
pub struct HookChain<T> {
    hooks: Vec<Box<dyn PathHook<T>>>,
    cache: HashMap<String, CachedFinder<T>>,
}

impl<T> Default for HookChain<T> {
    fn default() -> Self {
        Self {
            hooks: Vec::new(),
            cache: HashMap::new(),
        }
    }
}

impl<T> HookChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `hook`, replacing any hook with the same capability tag.
    ///
    /// Negative cache entries and finders created under that tag are dropped.
    pub fn install(&mut self, hook: Box<dyn PathHook<T>>) -> Installation {
        let tag = hook.capability().to_string();

        let installation = match self.hooks.iter().position(|h| h.capability() == tag) {
            Some(pos) => {
                self.hooks[pos] = hook;
                let mut i = 0;
                self.hooks.retain(|h| {
                    let keep = i <= pos || h.capability() != tag;
                    i += 1;
                    keep
                });
                Installation::Replaced
            }
            None => {
                self.hooks.push(hook);
                Installation::Appended
            }
        };

        self.cache.retain(|_, cached| match cached {
            CachedFinder::Found { capability, .. } => *capability != tag,
            CachedFinder::Missing => false,
        });

        installation
    }

    /// Capability tags in probe order
    pub fn capabilities(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.capability()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Number of cached lookups, positive and negative
    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }

    /// Forget every cached lookup
    pub fn invalidate_caches(&mut self) {
        self.cache.clear();
    }

    /// Finder for `path`, probing hooks in order on a cache miss
    pub fn finder(
        &mut self,
        path: &str,
        registry: &mut ArchiveRegistry,
    ) -> Option<Rc<dyn ModuleFinder<T>>> {
        if let Some(cached) = self.cache.get(path) {
            return match cached {
                CachedFinder::Found { finder, .. } => Some(finder.clone()),
                CachedFinder::Missing => None,
            };
        }

        for hook in &self.hooks {
            if let Some(finder) = hook.open(path, registry) {
                let finder: Rc<dyn ModuleFinder<T>> = Rc::from(finder);
                self.cache.insert(
                    path.to_string(),
                    CachedFinder::Found {
                        capability: hook.capability().to_string(),
                        finder: finder.clone(),
                    },
                );
                return Some(finder);
            }
        }

        self.cache.insert(path.to_string(), CachedFinder::Missing);
        None
    }

    /// First entry of `search_path` whose finder knows `name`
    pub fn find_module(
        &mut self,
        name: &str,
        search_path: &[String],
        registry: &mut ArchiveRegistry,
    ) -> Option<(String, Rc<dyn ModuleFinder<T>>)> {
        for path in search_path {
            if let Some(finder) = self.finder(path, registry) {
                if finder.find_module(name) {
                    return Some((path.clone(), finder));
                }
            }
        }
        None
    }
}

/// Path hook producing [`ZipImporter`]s
pub struct ZipImportHook<C: CodeCompiler> {
    compiler: Arc<C>,
    config: Arc<ZipImportConfig>,
}

impl<C: CodeCompiler + 'static> ZipImportHook<C> {
    pub fn new(compiler: Arc<C>, config: Arc<ZipImportConfig>) -> Self {
        Self { compiler, config }
    }

    /// Install this hook into `chain`
    pub fn install(self, chain: &mut HookChain<C::Code>) -> Installation {
        chain.install(Box::new(self))
    }
}

impl<C: CodeCompiler + 'static> PathHook<C::Code> for ZipImportHook<C> {
    fn capability(&self) -> &str {
        ZIPIMPORT_CAPABILITY
    }

    fn open(
        &self,
        path: &str,
        registry: &mut ArchiveRegistry,
    ) -> Option<Box<dyn ModuleFinder<C::Code>>> {
        // Paths that are not archives belong to other hooks
        let importer =
            ZipImporter::new(path, registry, self.compiler.clone(), self.config.clone()).ok()?;
        Some(Box::new(importer))
    }
}
