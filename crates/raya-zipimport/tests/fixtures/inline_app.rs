// Inline module archive generated by raya-zipimport. Do not edit.

/// Archive path the inline index is registered under
pub const INLINE_ROOT: &str = "<raya-inline-5f0c2a9e41d37b68c0e19a4f2d7b3e86>";

/// Serialized directory index with embedded entries
pub static INLINE_INDEX: &[u8] = &[
    0x52, 0x5a, 0x49, 0x58, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0xaa, 0x3a, 0xdc, 0x32,
    0x03, 0x00, 0x00, 0x00, 0x0e, 0x00, 0x00, 0x00, 0x61, 0x70, 0x70, 0x2f, 0x69, 0x6e, 0x64, 0x65,
    0x78, 0x2e, 0x72, 0x61, 0x79, 0x61, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0b, 0x00, 0x00, 0x00,
    0x0b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc0, 0x63, 0xcf, 0x50,
    0xe4, 0x64, 0x45, 0x46, 0x01, 0x0b, 0x00, 0x00, 0x00, 0x61, 0x70, 0x70, 0x20, 0x70, 0x61, 0x63,
    0x6b, 0x61, 0x67, 0x65, 0x0d, 0x00, 0x00, 0x00, 0x61, 0x70, 0x70, 0x2f, 0x75, 0x74, 0x69, 0x6c,
    0x2e, 0x72, 0x61, 0x79, 0x61, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0b, 0x00, 0x00, 0x00, 0x0b,
    0x00, 0x00, 0x00, 0x37, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc0, 0x63, 0xcf, 0x50, 0xf8,
    0x0f, 0x21, 0x4d, 0x01, 0x0b, 0x00, 0x00, 0x00, 0x75, 0x74, 0x69, 0x6c, 0x20, 0x73, 0x6f, 0x75,
    0x72, 0x63, 0x65, 0x0c, 0x00, 0x00, 0x00, 0x61, 0x70, 0x70, 0x2f, 0x75, 0x74, 0x69, 0x6c, 0x2e,
    0x72, 0x79, 0x62, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00,
    0x00, 0x6d, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc0, 0x63, 0xcf, 0x50, 0x1d, 0x0b, 0xd1,
    0xa6, 0x01, 0x15, 0x00, 0x00, 0x00, 0x52, 0x59, 0x42, 0x01, 0xc8, 0x69, 0xe7, 0x5e, 0x75, 0x74,
    0x69, 0x6c, 0x20, 0x63, 0x6f, 0x6d, 0x70, 0x69, 0x6c, 0x65, 0x64,
];

/// Register the inline archive and install the zipimport hook
pub fn install<C: raya_zipimport::CodeCompiler + 'static>(
    registry: &mut raya_zipimport::ArchiveRegistry,
    chain: &mut raya_zipimport::HookChain<C::Code>,
    compiler: std::sync::Arc<C>,
    config: std::sync::Arc<raya_zipimport::ZipImportConfig>,
) -> Result<raya_zipimport::Installation, raya_zipimport::ZipImportError> {
    raya_zipimport::install_inline(INLINE_ROOT, INLINE_INDEX, registry, chain, compiler, config)
}
