//! Module resolution against a directory index
//!
//! Resolution walks the [`SearchOrder`] and takes the first suffix present in
//! the index. A compiled entry is only used when its header is intact and its
//! recorded source time matches the paired source entry; otherwise the source
//! entry is compiled instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::archive::{read_entry, FileRecord};
use crate::compiler::{CodeCompiler, CompiledHeader};
use crate::convention::PathConvention;
use crate::error::ZipImportError;
use crate::index::DirectoryIndex;
use crate::search::{SearchEntry, SearchOrder};

/// Whether a name resolves to a plain module or a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Module,
    Package,
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleResolution<T> {
    pub kind: ModuleKind,
    pub code: T,
    /// Index key of the entry the code came from
    pub origin_key: String,
    /// `archive + SEP + origin_key`
    pub origin_path: String,
}

impl<T> ModuleResolution<T> {
    pub fn is_package(&self) -> bool {
        self.kind == ModuleKind::Package
    }
}

/// Everything resolution needs from an importer
pub struct ResolveContext<'a> {
    pub archive: &'a str,
    pub prefix: &'a str,
    pub index: &'a DirectoryIndex,
    pub order: &'a SearchOrder,
    pub convention: PathConvention,
    /// UTC offset of the archive's clock, see [`FileRecord::modified_unix`]
    pub time_offset: i64,
    /// Computed origin paths, keyed by index key
    pub overlay: &'a RefCell<HashMap<String, String>>,
}

impl<'a> ResolveContext<'a> {
    /// Index path of `name` without suffix: prefix plus the last dotted component
    pub fn module_base(&self, name: &str) -> String {
        let last = name.rsplit_once('.').map_or(name, |(_, last)| last);
        format!("{}{}", self.prefix, last)
    }

    /// Every key the search order would probe for `name`
    pub fn candidates(&self, name: &str) -> Vec<String> {
        let base = self.module_base(name);
        self.order
            .iter()
            .map(|entry| format!("{}{}", base, entry.suffix))
            .collect()
    }

    /// First search-order hit for `name`
    pub fn first_hit(&self, name: &str) -> Option<(String, &'a SearchEntry)> {
        let base = self.module_base(name);
        let order: &'a SearchOrder = self.order;
        order.iter().find_map(|entry| {
            let key = format!("{}{}", base, entry.suffix);
            self.index.contains(&key).then_some((key, entry))
        })
    }

    /// Classify `name` without reading any entry
    pub fn module_kind(&self, name: &str) -> Option<ModuleKind> {
        self.first_hit(name).map(|(_, entry)| kind_of(entry))
    }

    /// Full path of an index key, from the overlay when already computed
    pub fn origin_path(&self, key: &str) -> String {
        if let Some(path) = self.overlay.borrow().get(key) {
            return path.clone();
        }
        self.convention.join(self.archive, key)
    }

    /// Resolve `name` to executable code
    pub fn resolve<C>(
        &self,
        compiler: &C,
        name: &str,
    ) -> Result<ModuleResolution<C::Code>, ZipImportError>
    where
        C: CodeCompiler + ?Sized,
    {
        let base = self.module_base(name);
        let mut tried = Vec::with_capacity(self.order.len());

        for entry in self.order {
            let key = format!("{}{}", base, entry.suffix);
            tried.push(key.clone());
            let Some(record) = self.index.get(&key) else {
                continue;
            };

            if !entry.is_compiled {
                return self.compile_entry(compiler, entry, key, record);
            }

            let source = entry
                .source_suffix
                .as_ref()
                .map(|suffix| format!("{}{}", base, suffix))
                .and_then(|source_key| {
                    self.index
                        .get(&source_key)
                        .map(|source_record| (source_key, source_record))
                });

            let data = read_entry(Path::new(self.archive), &key, record, false)?;
            let source_record = source.as_ref().map(|(_, r)| *r);
            if let Some(payload) = self.usable_payload(&data, compiler.magic(), source_record) {
                let origin = self.origin_path(&key);
                let code = compiler.load_compiled(payload, &origin)?;
                return Ok(self.finish(kind_of(entry), code, key, origin));
            }

            // Stale or corrupt compiled form: use the paired source if there is one
            match source {
                Some((source_key, source_record)) => {
                    return self.compile_entry(compiler, entry, source_key, source_record);
                }
                None => continue,
            }
        }

        Err(ZipImportError::ModuleNotFound {
            name: name.to_string(),
            tried,
        })
    }

    /// Source text of `name`, or `None` when the archive only holds compiled forms
    pub fn source(&self, name: &str) -> Result<Option<String>, ZipImportError> {
        let kind = self
            .module_kind(name)
            .ok_or_else(|| ZipImportError::ModuleNotFound {
                name: name.to_string(),
                tried: self.candidates(name),
            })?;

        let Some(source_entry) = self
            .order
            .iter()
            .find(|entry| !entry.is_compiled && kind_of(entry) == kind)
        else {
            return Ok(None);
        };

        let key = format!("{}{}", self.module_base(name), source_entry.suffix);
        match self.index.get(&key) {
            Some(record) => {
                let data = read_entry(Path::new(self.archive), &key, record, false)?;
                decode_source(data, &self.origin_path(&key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn usable_payload<'d>(
        &self,
        data: &'d [u8],
        magic: [u8; 4],
        source: Option<&FileRecord>,
    ) -> Option<&'d [u8]> {
        let (header, payload) = CompiledHeader::parse(data)?;
        if header.magic != magic || !is_fresh(header.source_mtime, source, self.time_offset) {
            return None;
        }
        Some(payload)
    }

    fn compile_entry<C>(
        &self,
        compiler: &C,
        entry: &SearchEntry,
        key: String,
        record: &FileRecord,
    ) -> Result<ModuleResolution<C::Code>, ZipImportError>
    where
        C: CodeCompiler + ?Sized,
    {
        let origin = self.origin_path(&key);
        let data = read_entry(Path::new(self.archive), &key, record, false)?;
        let source = decode_source(data, &origin)?;
        let code = compiler.compile_source(&source, &origin)?;
        Ok(self.finish(kind_of(entry), code, key, origin))
    }

    fn finish<T>(
        &self,
        kind: ModuleKind,
        code: T,
        origin_key: String,
        origin_path: String,
    ) -> ModuleResolution<T> {
        self.overlay
            .borrow_mut()
            .entry(origin_key.clone())
            .or_insert_with(|| origin_path.clone());
        ModuleResolution {
            kind,
            code,
            origin_key,
            origin_path,
        }
    }
}

fn kind_of(entry: &SearchEntry) -> ModuleKind {
    if entry.is_package {
        ModuleKind::Package
    } else {
        ModuleKind::Module
    }
}

/// Whether a compiled entry stamped with `compiled_mtime` matches its source.
///
/// Times within one second are equal (DOS times have 2-second resolution). A
/// compiled entry without paired source is always trusted; a source record
/// with an invalid DOS stamp never matches.
pub fn is_fresh(compiled_mtime: u32, source: Option<&FileRecord>, time_offset: i64) -> bool {
    let Some(source) = source else {
        return true;
    };
    match source.modified_unix(time_offset) {
        Some(source_mtime) => (compiled_mtime as i64 - source_mtime).abs() <= 1,
        None => false,
    }
}

/// Decode source bytes and normalize `\r\n` line endings
pub fn decode_source(data: Vec<u8>, origin: &str) -> Result<String, ZipImportError> {
    let text = String::from_utf8(data).map_err(|_| ZipImportError::InvalidSource(origin.to_string()))?;
    if text.contains("\r\n") {
        Ok(text.replace("\r\n", "\n"))
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{CompressionMethod, DosDateTime};
    use crate::compiler::encode_compiled;
    use crate::config::ZipImportConfig;

    const MAGIC: [u8; 4] = *b"RYB\x01";
    /// 2020-06-15 12:30:00 UTC
    const SOURCE_TIME: u32 = 1_592_224_200;

    #[derive(Debug, PartialEq)]
    enum Code {
        Compiled(Vec<u8>),
        Source(String),
    }

    struct TestCompiler;

    impl CodeCompiler for TestCompiler {
        type Code = Code;

        fn magic(&self) -> [u8; 4] {
            MAGIC
        }

        fn compile_source(&self, source: &str, _origin: &str) -> Result<Code, ZipImportError> {
            Ok(Code::Source(source.to_string()))
        }

        fn load_compiled(&self, payload: &[u8], _origin: &str) -> Result<Code, ZipImportError> {
            Ok(Code::Compiled(payload.to_vec()))
        }
    }

    fn embedded(data: &[u8]) -> FileRecord {
        let (mod_date, mod_time) = DosDateTime {
            year: 2020,
            month: 6,
            day: 15,
            hour: 12,
            minute: 30,
            second: 0,
        }
        .pack();
        FileRecord {
            compression: CompressionMethod::Stored,
            compressed_size: data.len() as u32,
            uncompressed_size: data.len() as u32,
            data_offset: 0,
            mod_time,
            mod_date,
            crc32: 0,
            data: Some(data.into()),
        }
    }

    struct Fixture {
        index: DirectoryIndex,
        order: SearchOrder,
        overlay: RefCell<HashMap<String, String>>,
    }

    impl Fixture {
        fn new(entries: &[(&str, Vec<u8>)]) -> Self {
            let config = ZipImportConfig {
                platform: Some(PathConvention::Posix),
                ..ZipImportConfig::default()
            };
            let mut index = DirectoryIndex::new();
            for (key, data) in entries {
                index.insert(*key, embedded(data));
            }
            Self {
                index,
                order: SearchOrder::from_config(&config),
                overlay: RefCell::new(HashMap::new()),
            }
        }

        fn ctx(&self) -> ResolveContext<'_> {
            ResolveContext {
                archive: "/virtual/lib.zip",
                prefix: "",
                index: &self.index,
                order: &self.order,
                convention: PathConvention::Posix,
                time_offset: 0,
                overlay: &self.overlay,
            }
        }
    }

    #[test]
    fn test_freshness_boundary() {
        let source = embedded(b"");
        assert!(is_fresh(SOURCE_TIME, Some(&source), 0));
        assert!(is_fresh(SOURCE_TIME + 1, Some(&source), 0));
        assert!(is_fresh(SOURCE_TIME - 1, Some(&source), 0));
        assert!(!is_fresh(SOURCE_TIME + 2, Some(&source), 0));
        assert!(!is_fresh(SOURCE_TIME - 2, Some(&source), 0));
        assert!(is_fresh(0, None, 0));
    }

    #[test]
    fn test_freshness_with_offset() {
        let source = embedded(b"");
        assert!(is_fresh(SOURCE_TIME - 3600, Some(&source), 3600));
        assert!(!is_fresh(SOURCE_TIME, Some(&source), 3600));
    }

    #[test]
    fn test_invalid_source_stamp_is_stale() {
        let mut source = embedded(b"");
        source.mod_date = 0;
        assert!(!is_fresh(SOURCE_TIME, Some(&source), 0));
    }

    #[test]
    fn test_decode_source_normalizes_line_endings() {
        let text = decode_source(b"let a = 1;\r\nlet b = 2;\r\n".to_vec(), "x").unwrap();
        assert_eq!(text, "let a = 1;\nlet b = 2;\n");
        let err = decode_source(vec![0xff, 0xfe], "lib.zip/x.raya").unwrap_err();
        assert!(matches!(err, ZipImportError::InvalidSource(origin) if origin == "lib.zip/x.raya"));
    }

    #[test]
    fn test_fresh_compiled_wins() {
        let fixture = Fixture::new(&[
            ("util.ryb", encode_compiled(MAGIC, SOURCE_TIME + 1, b"bin")),
            ("util.raya", b"src".to_vec()),
        ]);
        let res = fixture.ctx().resolve(&TestCompiler, "app.util").unwrap();
        assert_eq!(res.code, Code::Compiled(b"bin".to_vec()));
        assert_eq!(res.origin_key, "util.ryb");
        assert_eq!(res.origin_path, "/virtual/lib.zip/util.ryb");
        assert!(!res.is_package());
        assert_eq!(
            fixture.overlay.borrow().get("util.ryb").map(String::as_str),
            Some("/virtual/lib.zip/util.ryb")
        );
    }

    #[test]
    fn test_stale_compiled_falls_back_to_source() {
        let fixture = Fixture::new(&[
            ("util.ryb", encode_compiled(MAGIC, SOURCE_TIME + 2, b"bin")),
            ("util.raya", b"src\r\n".to_vec()),
        ]);
        let res = fixture.ctx().resolve(&TestCompiler, "util").unwrap();
        assert_eq!(res.code, Code::Source("src\n".to_string()));
        assert_eq!(res.origin_key, "util.raya");
    }

    #[test]
    fn test_bad_magic_and_short_entries_fall_back() {
        for data in [
            encode_compiled(*b"XXXX", SOURCE_TIME, b"bin"),
            encode_compiled(MAGIC, SOURCE_TIME, b""),
        ] {
            let fixture = Fixture::new(&[("util.ryb", data), ("util.raya", b"src".to_vec())]);
            let res = fixture.ctx().resolve(&TestCompiler, "util").unwrap();
            assert_eq!(res.code, Code::Source("src".to_string()));
        }
    }

    #[test]
    fn test_unpaired_compiled_is_trusted() {
        let fixture = Fixture::new(&[("util.ryb", encode_compiled(MAGIC, 7, b"bin"))]);
        let res = fixture.ctx().resolve(&TestCompiler, "util").unwrap();
        assert_eq!(res.code, Code::Compiled(b"bin".to_vec()));
    }

    #[test]
    fn test_unusable_unpaired_package_continues_to_module() {
        let fixture = Fixture::new(&[
            ("util/index.ryb", encode_compiled(*b"XXXX", 0, b"bad")),
            ("util.raya", b"module".to_vec()),
        ]);
        let res = fixture.ctx().resolve(&TestCompiler, "util").unwrap();
        assert_eq!(res.kind, ModuleKind::Module);
        assert_eq!(res.code, Code::Source("module".to_string()));
    }

    #[test]
    fn test_package_beats_module() {
        let fixture = Fixture::new(&[
            ("util/index.raya", b"package".to_vec()),
            ("util.ryb", encode_compiled(MAGIC, 0, b"bin")),
        ]);
        let ctx = fixture.ctx();
        assert_eq!(ctx.module_kind("util"), Some(ModuleKind::Package));
        let res = ctx.resolve(&TestCompiler, "util").unwrap();
        assert!(res.is_package());
        assert_eq!(res.code, Code::Source("package".to_string()));
    }

    #[test]
    fn test_not_found_lists_candidates_and_leaves_overlay() {
        let fixture = Fixture::new(&[("other.raya", b"x".to_vec())]);
        let before = fixture.index.clone();
        let err = fixture.ctx().resolve(&TestCompiler, "missing").unwrap_err();
        match err {
            ZipImportError::ModuleNotFound { name, tried } => {
                assert_eq!(name, "missing");
                assert_eq!(
                    tried,
                    vec![
                        "missing/index.ryb",
                        "missing/index.raya",
                        "missing.ryb",
                        "missing.raya"
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fixture.index, before);
        assert!(fixture.overlay.borrow().is_empty());
    }

    #[test]
    fn test_source_lookup() {
        let fixture = Fixture::new(&[
            ("pkg/index.ryb", encode_compiled(MAGIC, 0, b"bin")),
            ("lone.ryb", encode_compiled(MAGIC, 0, b"bin")),
            ("mod.raya", b"text".to_vec()),
        ]);
        let ctx = fixture.ctx();
        assert_eq!(ctx.source("pkg").unwrap(), None);
        assert_eq!(ctx.source("lone").unwrap(), None);
        assert_eq!(ctx.source("mod").unwrap(), Some("text".to_string()));
        assert!(matches!(
            ctx.source("absent"),
            Err(ZipImportError::ModuleNotFound { .. })
        ));
    }

    #[test]
    fn test_module_base_uses_prefix_and_last_component() {
        let fixture = Fixture::new(&[]);
        let mut ctx = fixture.ctx();
        ctx.prefix = "lib/";
        assert_eq!(ctx.module_base("a.b.c"), "lib/c");
        assert_eq!(ctx.module_base("c"), "lib/c");
    }
}
