//! Inline archives
//!
//! An archive can be turned into Rust source that carries every entry as a
//! static byte slice. Including that source in a binary and calling its
//! `install` function makes the archive's modules importable with no file on
//! disk.

use std::sync::Arc;

use crate::compiler::CodeCompiler;
use crate::config::ZipImportConfig;
use crate::convention::PathConvention;
use crate::error::{IndexFormatError, ZipImportError};
use crate::hooks::{HookChain, Installation, ZipImportHook};
use crate::index::DirectoryIndex;
use crate::persist;
use crate::preload;
use crate::registry::ArchiveRegistry;

/// Bytes per line of the rendered index slice
const BYTES_PER_LINE: usize = 16;

/// Serialized, fully embedded index plus the root it installs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineArtifact {
    /// Synthetic archive path, `<raya-inline-HEX>`
    pub root: String,
    /// Index file bytes with every record embedded, keys `/`-separated
    pub payload: Vec<u8>,
}

impl InlineArtifact {
    /// Render as a Rust module suitable for `include!`
    pub fn render_source(&self) -> String {
        let mut code = String::new();
        code.push_str("// Inline module archive generated by raya-zipimport. Do not edit.\n\n");
        code.push_str("/// Archive path the inline index is registered under\n");
        code.push_str(&format!("pub const INLINE_ROOT: &str = {:?};\n\n", self.root));
        code.push_str("/// Serialized directory index with embedded entries\n");
        code.push_str("pub static INLINE_INDEX: &[u8] = &[\n");
        for chunk in self.payload.chunks(BYTES_PER_LINE) {
            let line: Vec<String> = chunk.iter().map(|b| format!("0x{:02x}", b)).collect();
            code.push_str("    ");
            code.push_str(&line.join(", "));
            code.push_str(",\n");
        }
        code.push_str("];\n\n");
        code.push_str("/// Register the inline archive and install the zipimport hook\n");
        code.push_str("pub fn install<C: raya_zipimport::CodeCompiler + 'static>(\n");
        code.push_str("    registry: &mut raya_zipimport::ArchiveRegistry,\n");
        code.push_str("    chain: &mut raya_zipimport::HookChain<C::Code>,\n");
        code.push_str("    compiler: std::sync::Arc<C>,\n");
        code.push_str("    config: std::sync::Arc<raya_zipimport::ZipImportConfig>,\n");
        code.push_str(") -> Result<raya_zipimport::Installation, raya_zipimport::ZipImportError> {\n");
        code.push_str(
            "    raya_zipimport::install_inline(INLINE_ROOT, INLINE_INDEX, registry, chain, compiler, config)\n",
        );
        code.push_str("}\n");
        code
    }
}

/// Random archive path that cannot collide with a real file
pub fn synthetic_root() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("<raya-inline-{}>", hex::encode(bytes))
}

/// Embed every record of `index` and serialize it with `/`-separated keys
pub fn generate_inline_artifact(
    index: &DirectoryIndex,
    archive: &str,
    convention: PathConvention,
) -> Result<InlineArtifact, ZipImportError> {
    let mut index = index.clone();
    preload::embed_all(&mut index, archive)?;
    let index = index.translated(convention, PathConvention::Posix);

    Ok(InlineArtifact {
        root: synthetic_root(),
        payload: persist::encode_index(&index),
    })
}

/// Register an inline index under `root` and install the zipimport hook
pub fn install_inline<C>(
    root: &str,
    payload: &[u8],
    registry: &mut ArchiveRegistry,
    chain: &mut HookChain<C::Code>,
    compiler: Arc<C>,
    config: Arc<ZipImportConfig>,
) -> Result<Installation, ZipImportError>
where
    C: CodeCompiler + 'static,
{
    let index = persist::decode_index(payload)?;
    if let Some(key) = index
        .sorted_keys()
        .into_iter()
        .find(|key| index.get(key).is_some_and(|record| !record.is_embedded()))
    {
        return Err(IndexFormatError::MissingBlob(key.to_string()).into());
    }

    let index = index.translated(PathConvention::Posix, config.convention());
    registry.insert(root, index);
    Ok(ZipImportHook::new(compiler, config).install(chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{CompressionMethod, FileRecord};

    fn record(data: Option<&[u8]>) -> FileRecord {
        FileRecord {
            compression: CompressionMethod::Stored,
            compressed_size: 2,
            uncompressed_size: 2,
            data_offset: 0,
            mod_time: 0,
            mod_date: 0,
            crc32: 0,
            data: data.map(Arc::from),
        }
    }

    struct NullCompiler;

    impl CodeCompiler for NullCompiler {
        type Code = ();

        fn magic(&self) -> [u8; 4] {
            *b"RYB\x01"
        }

        fn compile_source(&self, _source: &str, _origin: &str) -> Result<(), ZipImportError> {
            Ok(())
        }

        fn load_compiled(&self, _payload: &[u8], _origin: &str) -> Result<(), ZipImportError> {
            Ok(())
        }
    }

    #[test]
    fn test_synthetic_roots_are_unique() {
        let a = synthetic_root();
        let b = synthetic_root();
        assert!(a.starts_with("<raya-inline-") && a.ends_with('>'));
        assert_eq!(a.len(), "<raya-inline-".len() + 32 + 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_render_source_layout() {
        let artifact = InlineArtifact {
            root: "<raya-inline-00>".to_string(),
            payload: (0u8..20).collect(),
        };
        let source = artifact.render_source();
        assert!(source.contains("pub const INLINE_ROOT: &str = \"<raya-inline-00>\";"));
        assert!(source.contains("    0x00, 0x01, 0x02"));
        assert!(source.contains("    0x10, 0x11, 0x12, 0x13,\n];"));
        assert!(source.contains("raya_zipimport::install_inline(INLINE_ROOT, INLINE_INDEX"));
    }

    #[test]
    fn test_generate_from_embedded_index() {
        let mut index = DirectoryIndex::new();
        index.insert("app\\main.raya", record(Some(&b"ok"[..])));
        let artifact =
            generate_inline_artifact(&index, "/nonexistent.zip", PathConvention::Windows).unwrap();
        let decoded = persist::decode_index(&artifact.payload).unwrap();
        assert!(decoded.contains("app/main.raya"));
        assert_eq!(decoded.embedded_count(), 1);
    }

    #[test]
    fn test_install_rejects_missing_blob() {
        let mut index = DirectoryIndex::new();
        index.insert("a.raya", record(Some(&b"ok"[..])));
        index.insert("b.raya", record(None));
        let payload = persist::encode_index(&index);

        let mut registry = ArchiveRegistry::new();
        let mut chain = HookChain::new();
        let err = install_inline(
            "<raya-inline-00>",
            &payload,
            &mut registry,
            &mut chain,
            Arc::new(NullCompiler),
            Arc::new(ZipImportConfig::default()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ZipImportError::InvalidIndex(IndexFormatError::MissingBlob(key)) if key == "b.raya"
        ));
        assert!(registry.is_empty());
        assert!(chain.is_empty());
    }

    #[test]
    fn test_install_rejects_garbage_payload() {
        let mut registry = ArchiveRegistry::new();
        let mut chain = HookChain::new();
        let err = install_inline(
            "<raya-inline-00>",
            b"nope",
            &mut registry,
            &mut chain,
            Arc::new(NullCompiler),
            Arc::new(ZipImportConfig::default()),
        )
        .unwrap_err();
        assert!(matches!(err, ZipImportError::InvalidIndex(_)));
    }
}
