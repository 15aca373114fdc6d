//! Host-side random-access store for lazily indexed archives.
//!
//! Lifecycle: created empty, filled by in-order [`append_chunk`] calls while
//! the archive streams, [`finalize`]d once with the index, queried by range
//! any number of times, then [`dispose`]d.
//!
//! [`append_chunk`]: RandomAccessStore::append_chunk
//! [`finalize`]: RandomAccessStore::finalize
//! [`dispose`]: RandomAccessStore::dispose

use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::entry::IndexEntry;
use crate::error::{Error, Result, StoreError};
use crate::io::ChunkSink;

enum State {
    Building(BytesMut),
    Ready {
        data: Bytes,
        index: HashMap<String, IndexEntry>,
    },
    Disposed,
}

pub struct RandomAccessStore {
    state: RwLock<State>,
    range_reads: AtomicU64,
}

impl Default for RandomAccessStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RandomAccessStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomAccessStore")
            .field("len", &self.len())
            .field("finalized", &self.is_finalized())
            .field("range_reads", &self.range_reads())
            .finish()
    }
}

impl RandomAccessStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Building(BytesMut::new())),
            range_reads: AtomicU64::new(0),
        }
    }

    /// New store behind an `Arc`, ready to be handed to an indexing pass as
    /// its sink while readers keep a handle
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append the next forwarded chunk.
    pub fn append_chunk(&self, chunk: &[u8]) -> Result<()> {
        match &mut *self.write_state() {
            State::Building(buf) => {
                buf.extend_from_slice(chunk);
                Ok(())
            }
            State::Ready { .. } => Err(StoreError::AlreadyFinalized.into()),
            State::Disposed => Err(StoreError::Disposed.into()),
        }
    }

    /// Freeze the accumulated bytes and attach the index.
    ///
    /// Fails if any non-directory entry points past the stored bytes.
    pub fn finalize(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut state = self.write_state();
        let buf = match &mut *state {
            State::Building(buf) => std::mem::take(buf),
            State::Ready { .. } => return Err(StoreError::AlreadyFinalized.into()),
            State::Disposed => return Err(StoreError::Disposed.into()),
        };
        let len = buf.len() as u64;

        let mut index = HashMap::with_capacity(entries.len());
        for entry in entries {
            if !entry.is_directory && entry.raw_offset.saturating_add(entry.size) > len {
                // Leave the store usable for a retry with a corrected index
                *state = State::Building(buf);
                return Err(StoreError::OutOfRange {
                    offset: entry.raw_offset,
                    size: entry.size,
                    len,
                }
                .into());
            }
            index.insert(entry.path.clone(), entry.clone());
        }

        debug!(bytes = len, entries = index.len(), "store finalized");
        *state = State::Ready {
            data: buf.freeze(),
            index,
        };
        Ok(())
    }

    /// Exactly `size` bytes starting at `offset` of the finalized range.
    pub fn read_range(&self, offset: u64, size: u64) -> Result<Bytes> {
        match &*self.read_state() {
            State::Ready { data, .. } => {
                let len = data.len() as u64;
                let end = offset.checked_add(size).filter(|&end| end <= len);
                let Some(end) = end else {
                    return Err(StoreError::OutOfRange { offset, size, len }.into());
                };
                self.range_reads.fetch_add(1, Ordering::Relaxed);
                Ok(data.slice(offset as usize..end as usize))
            }
            State::Building(_) => Err(StoreError::NotFinalized.into()),
            State::Disposed => Err(StoreError::Disposed.into()),
        }
    }

    /// Index lookup by path.
    pub fn entry(&self, path: &str) -> Result<IndexEntry> {
        match &*self.read_state() {
            State::Ready { index, .. } => index
                .get(path)
                .cloned()
                .ok_or_else(|| Error::NotFound(path.to_string())),
            State::Building(_) => Err(StoreError::NotFinalized.into()),
            State::Disposed => Err(StoreError::Disposed.into()),
        }
    }

    /// Bytes held so far (0 once disposed)
    pub fn len(&self) -> u64 {
        match &*self.read_state() {
            State::Building(buf) => buf.len() as u64,
            State::Ready { data, .. } => data.len() as u64,
            State::Disposed => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finalized(&self) -> bool {
        matches!(&*self.read_state(), State::Ready { .. })
    }

    /// Number of successful range reads served
    pub fn range_reads(&self) -> u64 {
        self.range_reads.load(Ordering::Relaxed)
    }

    /// Release bytes and index. Safe to call more than once.
    pub fn dispose(&self) {
        let mut state = self.write_state();
        if !matches!(*state, State::Disposed) {
            debug!("store disposed");
        }
        *state = State::Disposed;
    }
}

impl ChunkSink for Arc<RandomAccessStore> {
    fn append_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        RandomAccessStore::append_chunk(self, chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, offset: u64, size: u64) -> IndexEntry {
        IndexEntry {
            path: path.to_string(),
            size,
            is_directory: false,
            is_binary: false,
            raw_offset: offset,
        }
    }

    fn ready_store() -> RandomAccessStore {
        let store = RandomAccessStore::new();
        store.append_chunk(b"hello ").unwrap();
        store.append_chunk(b"world").unwrap();
        store
            .finalize(&[entry("a", 0, 5), entry("b", 6, 5)])
            .unwrap();
        store
    }

    #[test]
    fn reads_ranges_across_chunks() {
        let store = ready_store();
        assert_eq!(&store.read_range(4, 4).unwrap()[..], b"o wo");
        assert_eq!(&store.read_range(6, 5).unwrap()[..], b"world");
        assert_eq!(store.entry("b").unwrap().raw_offset, 6);
        assert_eq!(store.range_reads(), 2);
    }

    #[test]
    fn read_before_finalize_fails() {
        let store = RandomAccessStore::new();
        store.append_chunk(b"abc").unwrap();
        assert!(matches!(
            store.read_range(0, 1),
            Err(Error::Store(StoreError::NotFinalized))
        ));
    }

    #[test]
    fn out_of_range_read_fails() {
        let store = ready_store();
        assert!(matches!(
            store.read_range(8, 4),
            Err(Error::Store(StoreError::OutOfRange { len: 11, .. }))
        ));
        assert!(matches!(
            store.read_range(u64::MAX, 2),
            Err(Error::Store(StoreError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn append_and_finalize_after_finalize_fail() {
        let store = ready_store();
        assert!(matches!(
            store.append_chunk(b"x"),
            Err(Error::Store(StoreError::AlreadyFinalized))
        ));
        assert!(matches!(
            store.finalize(&[]),
            Err(Error::Store(StoreError::AlreadyFinalized))
        ));
    }

    #[test]
    fn finalize_rejects_entries_past_end() {
        let store = RandomAccessStore::new();
        store.append_chunk(b"abc").unwrap();
        assert!(store.finalize(&[entry("a", 2, 5)]).is_err());
        assert!(!store.is_finalized());
        store.finalize(&[entry("a", 0, 3)]).unwrap();
        assert_eq!(&store.read_range(0, 3).unwrap()[..], b"abc");
    }

    #[test]
    fn dispose_is_idempotent() {
        let store = ready_store();
        store.dispose();
        store.dispose();
        assert_eq!(store.len(), 0);
        assert!(matches!(
            store.read_range(0, 1),
            Err(Error::Store(StoreError::Disposed))
        ));
        assert!(matches!(
            store.entry("a"),
            Err(Error::Store(StoreError::Disposed))
        ));
    }

    #[test]
    fn missing_path_is_not_found() {
        let store = ready_store();
        assert!(matches!(store.entry("zzz"), Err(Error::NotFound(_))));
    }
}
