//! Host compiler boundary
//!
//! The importer never executes code. It hands source text or a compiled
//! payload to a [`CodeCompiler`] supplied by the host runtime and returns
//! whatever that produces.
//!
//! Compiled entries start with an 8-byte header:
//!
//! ```text
//! magic (4 bytes, host specific) | source mtime (u32 LE, Unix seconds) | payload
//! ```

use crate::error::ZipImportError;

/// Length of the compiled-entry header
pub const COMPILED_HEADER_LEN: usize = 8;

/// Shortest usable compiled entry: the header plus one payload byte
pub const MIN_COMPILED_LEN: usize = COMPILED_HEADER_LEN + 1;

/// Turns archive entries into executable code
pub trait CodeCompiler {
    /// Executable code produced by the host
    type Code;

    /// Magic number compiled entries must start with
    fn magic(&self) -> [u8; 4];

    /// Compile source text; `origin` is the module's full path for diagnostics
    fn compile_source(&self, source: &str, origin: &str) -> Result<Self::Code, ZipImportError>;

    /// Load a compiled payload (the bytes after the header)
    fn load_compiled(&self, payload: &[u8], origin: &str) -> Result<Self::Code, ZipImportError>;
}

/// Decoded header of a compiled entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledHeader {
    pub magic: [u8; 4],
    /// Modification time of the source the entry was compiled from
    pub source_mtime: u32,
}

impl CompiledHeader {
    /// Split `data` into header and payload; `None` if too short
    pub fn parse(data: &[u8]) -> Option<(CompiledHeader, &[u8])> {
        if data.len() < MIN_COMPILED_LEN {
            return None;
        }
        let magic = [data[0], data[1], data[2], data[3]];
        let source_mtime = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        Some((
            CompiledHeader {
                magic,
                source_mtime,
            },
            &data[COMPILED_HEADER_LEN..],
        ))
    }
}

/// Build a compiled entry from its parts
pub fn encode_compiled(magic: [u8; 4], source_mtime: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(COMPILED_HEADER_LEN + payload.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&source_mtime.to_le_bytes());
    out.extend_from_slice(payload);
    out
}
