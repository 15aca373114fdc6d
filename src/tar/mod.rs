//! Streaming tar archive parsing.
//!
//! - [`header`]: raw 512-byte header blocks, numeric fields, PAX records
//! - [`reader`]: sequential entry walker over any [`Read`](std::io::Read)
//!
//! Compressed archives are read through [`Decompressor`], a gzip inflate
//! stream. Decode errors surface from the reader as
//! [`Error::Decode`](crate::Error::Decode).
//!
//! ## Supported Features
//!
//! - POSIX ustar, including the `prefix` path field
//! - GNU long names and base-256 sizes
//! - PAX `path` and `size` overrides
//!
//! ## Limitations
//!
//! - Sparse files are treated as opaque entries
//! - No multi-volume archives

pub mod header;
pub mod reader;

pub use header::{BLOCK_SIZE, EntryType};
pub use reader::{ArchiveReader, EntryHeader, EntryKind};

use flate2::read::GzDecoder;
use std::io::Read;

/// Streaming gzip inflate over a byte stream
pub type Decompressor<R> = GzDecoder<R>;

/// Wrap a compressed stream in a [`Decompressor`]
pub fn decompress<R: Read>(reader: R) -> Decompressor<R> {
    GzDecoder::new(reader)
}
