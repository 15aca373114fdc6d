//! Entry records produced by eager extraction and lazy indexing.
//!
//! Field names serialize to the JSON shape hosts already consume
//! (`isDir`, `isBinary`, `offset`).

use serde::{Deserialize, Serialize};

/// One fully extracted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    /// Forward-slash relative path
    pub path: String,
    /// Declared uncompressed size; 0 for directories and links
    pub size: u64,
    #[serde(rename = "isDir")]
    pub is_directory: bool,
    pub is_binary: bool,
    /// Decoded text; empty for binary, oversized and non-file entries
    pub content: String,
}

impl ArchiveEntry {
    pub fn directory(path: String) -> Self {
        Self {
            path,
            size: 0,
            is_directory: true,
            is_binary: false,
            content: String::new(),
        }
    }
}

/// Ordered result of an eager pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub files: Vec<ArchiveEntry>,
}

impl ParseResult {
    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.files.iter().find(|e| e.path == path)
    }
}

/// One indexed entry: metadata plus where its data starts in the
/// decompressed stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub path: String,
    pub size: u64,
    #[serde(rename = "isDir")]
    pub is_directory: bool,
    pub is_binary: bool,
    /// Offset of the first data byte; meaningless for directories
    #[serde(rename = "offset")]
    pub raw_offset: u64,
}

/// Ordered result of an indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResult {
    pub files: Vec<IndexEntry>,
}

/// Decoded content of a single entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub content: String,
    pub is_binary: bool,
}

impl FileContent {
    pub fn binary() -> Self {
        Self {
            content: String::new(),
            is_binary: true,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let (content, is_binary) = crate::sniff::classify(data);
        Self { content, is_binary }
    }
}
