//! ZIP container access
//!
//! - [`reader`]: central directory parsing and entry reads
//! - [`record`]: table-of-contents records
//! - [`dos_time`]: packed DOS timestamps

pub mod dos_time;
pub mod reader;
pub mod record;

pub use dos_time::{dos_to_unix, DosDateTime};
pub use reader::{parse_directory, read_entry};
pub use record::{CompressionMethod, FileRecord};
