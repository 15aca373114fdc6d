//! ZIP archive parsing and eager extraction.
//!
//! Unlike tar, a ZIP file is indexed by its Central Directory at the end of
//! the file, so it is read from a random-access source (a local file or an
//! in-memory buffer) rather than streamed.
//!
//! - [`structures`]: EOCD, ZIP64 and header records
//! - [`parser`]: Central Directory and Local File Header parsing
//! - [`extractor`]: eager extraction with the shared size and binary rules
//!
//! ## Supported Features
//!
//! - ZIP64 extensions
//! - STORED and DEFLATE methods, CRC-32 verified
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod extractor;
mod parser;
mod structures;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
