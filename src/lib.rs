//! # tarlens
//!
//! Streaming ingestion of `.tgz` archives, in memory or straight from an
//! HTTP response, without ever holding the whole archive.
//!
//! Two access modes are supported:
//!
//! - **Eager**: one pass that extracts every entry's text content, subject
//!   to a per-entry threshold and a whole-archive cap.
//! - **Lazy**: one pass that builds a byte-offset index while forwarding the
//!   decompressed tar stream to a [`RandomAccessStore`]; entries are then
//!   served on demand by range reads through an [`EntryContentResolver`].
//!
//! In-memory ZIP archives are also supported in eager mode.
//!
//! ## Example
//!
//! ```no_run
//! use tarlens::{Engine, EntryContentResolver, FetchOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Engine::global()?;
//!     let url = "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz";
//!
//!     // Index once, then read individual files on demand
//!     let (store, index) = engine.index_into_store(url, &FetchOptions::default()).await?;
//!     let resolver = EntryContentResolver::new(store);
//!     for entry in &index.files {
//!         if !entry.is_directory && !entry.is_binary {
//!             let file = resolver.read_file(&entry.path)?;
//!             println!("{}: {} chars", entry.path, file.content.len());
//!         }
//!     }
//!     resolver.store().dispose();
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod extract;
pub mod format;
pub mod index;
pub mod io;
pub mod logging;
pub mod resolver;
pub mod sniff;
pub mod store;
pub mod tar;
pub mod zip;

#[cfg(test)]
mod testutil;

pub use cli::Cli;
pub use config::{EngineConfig, FetchOptions, Limits};
pub use engine::Engine;
pub use entry::{ArchiveEntry, FileContent, IndexEntry, IndexResult, ParseResult};
pub use error::{Error, Result, StoreError};
pub use extract::{EagerExtractor, extract_tgz, parse_tgz_bytes};
pub use format::ArchiveFormat;
pub use index::{IndexingTee, index_tgz};
pub use io::{ByteSource, ChunkSink, NetworkByteSource, ReadAt, StreamAdapter};
pub use resolver::EntryContentResolver;
pub use store::RandomAccessStore;
pub use zip::ZipExtractor;
