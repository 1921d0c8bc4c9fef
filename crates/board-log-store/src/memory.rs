//! In-memory implementation of the LogStorage trait.
//!
//! This is primarily for testing. It has the same semantics as the
//! persistent backends but keeps everything in memory.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use board_log_core::{CompactRange, EntryHash, SequencedEntry};
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, LogStorage, Payload};

/// In-memory storage implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    checkpoint: Option<Vec<u8>>,

    /// Index -> content hash.
    sequence: BTreeMap<u64, EntryHash>,

    /// Content hash -> index.
    indices: HashMap<EntryHash, u64>,

    payloads: HashMap<EntryHash, Bytes>,

    tree_state: Option<CompactRange>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Forget the entry at `index`, leaving a hole in the sequence.
    ///
    /// Only for exercising gap handling in tests.
    #[doc(hidden)]
    pub fn remove_entry(&self, index: u64) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(hash) = inner.sequence.remove(&index) {
            inner.indices.remove(&hash);
        }
        Ok(())
    }

    /// Forget the payload stored under `hash`.
    #[doc(hidden)]
    pub fn remove_payload(&self, hash: &EntryHash) -> Result<()> {
        self.write()?.payloads.remove(hash);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::InvalidData("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::InvalidData("memory store lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStorage for MemoryStore {
    fn read_checkpoint(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.checkpoint.clone())
    }

    fn create_checkpoint(&self, note: &[u8]) -> Result<()> {
        let mut inner = self.write()?;
        if inner.checkpoint.is_some() {
            return Err(StoreError::AlreadyExists("checkpoint".into()));
        }
        inner.checkpoint = Some(note.to_vec());
        Ok(())
    }

    fn replace_checkpoint(&self, note: &[u8]) -> Result<()> {
        self.write()?.checkpoint = Some(note.to_vec());
        Ok(())
    }

    fn entry_index(&self, hash: &EntryHash) -> Result<Option<u64>> {
        Ok(self.read()?.indices.get(hash).copied())
    }

    fn next_index(&self) -> Result<u64> {
        Ok(self
            .read()?
            .sequence
            .keys()
            .next_back()
            .map_or(0, |last| last + 1))
    }

    fn insert_entry(&self, hash: &EntryHash, payload: Payload) -> Result<InsertResult> {
        let bytes = payload.read()?;
        let mut inner = self.write()?;

        if inner.indices.contains_key(hash) {
            drop(inner);
            payload.release();
            return Ok(InsertResult::AlreadyExists);
        }

        let index = inner.sequence.keys().next_back().map_or(0, |last| last + 1);
        inner.payloads.insert(*hash, bytes);
        inner.sequence.insert(index, *hash);
        inner.indices.insert(*hash, index);
        drop(inner);

        payload.release();
        Ok(InsertResult::Inserted(index))
    }

    fn entries_range(&self, start: u64, end: u64) -> Result<Vec<SequencedEntry>> {
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self
            .read()?
            .sequence
            .range(start..end)
            .map(|(&index, &hash)| SequencedEntry::new(index, hash))
            .collect())
    }

    fn read_payload(&self, hash: &EntryHash) -> Result<Option<Bytes>> {
        Ok(self.read()?.payloads.get(hash).cloned())
    }

    fn has_payload(&self, hash: &EntryHash) -> Result<bool> {
        Ok(self.read()?.payloads.contains_key(hash))
    }

    fn read_tree_state(&self) -> Result<Option<CompactRange>> {
        Ok(self.read()?.tree_state.clone())
    }

    fn write_tree_state(&self, range: &CompactRange) -> Result<()> {
        self.write()?.tree_state = Some(range.clone());
        Ok(())
    }
}
