//! LogStorage trait: the abstract interface for log persistence.
//!
//! This trait allows the engine to be storage-agnostic. Implementations
//! include the filesystem layout (primary), SQLite, and in-memory (for
//! tests).

use std::path::PathBuf;

use board_log_core::{CompactRange, EntryHash, SequencedEntry};
use bytes::Bytes;

use crate::error::Result;

/// Result of inserting an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Entry was sequenced at this index.
    Inserted(u64),
    /// An entry with the same content hash is already sequenced.
    AlreadyExists,
}

/// Where an entry's payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A staging file. Ownership passes to the store, which moves it into
    /// content-addressed storage.
    TempFile(PathBuf),
    /// Payload bytes held in memory.
    Bytes(Bytes),
}

impl Payload {
    /// Read the payload without consuming the staging file.
    pub fn read(&self) -> std::io::Result<Bytes> {
        match self {
            Payload::TempFile(path) => std::fs::read(path).map(Bytes::from),
            Payload::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Drop the staging file once its bytes are stored elsewhere.
    pub(crate) fn release(&self) {
        if let Payload::TempFile(path) = self {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove staged payload");
            }
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Payload::TempFile(path)
    }
}

/// Durable state of one log instance.
///
/// All methods are synchronous and surface every failure immediately; no
/// implementation retries.
///
/// # Design Notes
///
/// - **Atomic checkpoints**: `replace_checkpoint` either leaves the old note
///   or the complete new one, never a partial write. `create_checkpoint`
///   fails with `AlreadyExists` instead of overwriting.
/// - **Deduplication**: `insert_entry` never assigns an index to a hash that
///   is already sequenced.
/// - **Contiguity is not enforced on read**: `entries_range` returns what is
///   present, and callers detect gaps.
/// - **Single integrator**: at most one caller may publish checkpoints for a
///   storage root at a time. Sequencing distinct hashes concurrently is safe.
pub trait LogStorage: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Checkpoint
    // ─────────────────────────────────────────────────────────────────────────

    /// Read the current signed checkpoint note, if the log is initialized.
    fn read_checkpoint(&self) -> Result<Option<Vec<u8>>>;

    /// Store the first checkpoint. Fails with `AlreadyExists` if one exists.
    fn create_checkpoint(&self, note: &[u8]) -> Result<()>;

    /// Atomically replace the current checkpoint.
    fn replace_checkpoint(&self, note: &[u8]) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Entries
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up the index assigned to a content hash.
    fn entry_index(&self, hash: &EntryHash) -> Result<Option<u64>>;

    /// The index the next new entry would get (max sequenced + 1, or 0).
    fn next_index(&self) -> Result<u64>;

    /// Store the payload under `hash` and assign it the next index.
    fn insert_entry(&self, hash: &EntryHash, payload: Payload) -> Result<InsertResult>;

    /// Sequenced entries with `start <= index < end`, ordered by index.
    /// Missing indices are omitted.
    fn entries_range(&self, start: u64, end: u64) -> Result<Vec<SequencedEntry>>;

    /// The entry at `index`, if sequenced.
    fn entry_at(&self, index: u64) -> Result<Option<SequencedEntry>> {
        let end = index.saturating_add(1);
        Ok(self
            .entries_range(index, end)?
            .into_iter()
            .find(|e| e.index == index))
    }

    /// Read a payload by content hash.
    fn read_payload(&self, hash: &EntryHash) -> Result<Option<Bytes>>;

    /// Whether a payload is stored under `hash`.
    fn has_payload(&self, hash: &EntryHash) -> Result<bool> {
        Ok(self.read_payload(hash)?.is_some())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tree state
    // ─────────────────────────────────────────────────────────────────────────

    /// Read the persisted tree frontier.
    fn read_tree_state(&self) -> Result<Option<CompactRange>>;

    /// Persist the tree frontier.
    fn write_tree_state(&self, range: &CompactRange) -> Result<()>;
}
