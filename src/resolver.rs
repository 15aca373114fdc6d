//! On-demand content for entries of a finalized store.

use std::sync::Arc;

use crate::entry::FileContent;
use crate::error::Result;
use crate::store::RandomAccessStore;

/// Resolves paths of an indexed archive to decoded content.
///
/// Reads are independent and read-only, so one resolver (or clones of it)
/// can serve concurrent callers.
#[derive(Clone)]
pub struct EntryContentResolver {
    store: Arc<RandomAccessStore>,
}

impl EntryContentResolver {
    pub fn new(store: Arc<RandomAccessStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RandomAccessStore> {
        &self.store
    }

    /// Content of the entry at `path`.
    ///
    /// Directories, empty entries and entries already classified as binary
    /// during indexing are answered from the index alone.
    pub fn read_file(&self, path: &str) -> Result<FileContent> {
        let entry = self.store.entry(path)?;
        if entry.is_directory || (entry.size == 0 && !entry.is_binary) {
            return Ok(FileContent::default());
        }
        if entry.is_binary {
            return Ok(FileContent::binary());
        }
        self.read_range_content(entry.raw_offset, entry.size)
    }

    /// Decode an arbitrary range of the store.
    pub fn read_range_content(&self, offset: u64, size: u64) -> Result<FileContent> {
        let data = self.store.read_range(offset, size)?;
        Ok(FileContent::from_bytes(&data))
    }
}
