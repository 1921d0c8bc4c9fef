//! Sequencer: assigns indices to new entries.
//!
//! Each distinct content hash gets exactly one index, in submission order.
//! Resubmitting a hash is rejected as a duplicate and does not consume an
//! index.

use board_log_core::EntryHash;
use board_log_store::{InsertResult, LogStorage, Payload};
use thiserror::Error;

use crate::error::{LogError, Result};

/// An entry waiting to be sequenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub hash: EntryHash,
    pub payload: Payload,
}

impl NewEntry {
    pub fn new(hash: EntryHash, payload: impl Into<Payload>) -> Self {
        Self {
            hash,
            payload: payload.into(),
        }
    }
}

/// A batch stopped at its first failure.
#[derive(Debug, Error)]
#[error("batch stopped after {} sequenced entries: {error}", .sequenced.len())]
pub struct BatchError {
    /// Indices assigned to the entries before the failing one.
    pub sequenced: Vec<u64>,
    #[source]
    pub error: LogError,
}

impl BatchError {
    /// Position of the failing entry within the batch.
    pub fn failed_at(&self) -> usize {
        self.sequenced.len()
    }
}

impl From<BatchError> for LogError {
    fn from(batch: BatchError) -> Self {
        batch.error
    }
}

/// Appends entries to a log's storage.
pub struct Sequencer<'a, S: ?Sized> {
    storage: &'a S,
}

impl<'a, S: LogStorage + ?Sized> Sequencer<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Sequence one entry and return its index.
    pub fn sequence(&self, hash: EntryHash, payload: Payload) -> Result<u64> {
        match self.storage.insert_entry(&hash, payload) {
            Ok(InsertResult::Inserted(index)) => Ok(index),
            Ok(InsertResult::AlreadyExists) => {
                tracing::debug!(hash = %hash, "rejected duplicate entry");
                Err(LogError::DuplicateEntry { hash })
            }
            Err(source) => Err(LogError::Sequencing { hash, source }),
        }
    }

    /// Sequence entries one at a time in order, stopping at the first
    /// failure. Entries before the failure stay sequenced.
    pub fn sequence_batch<I>(&self, entries: I) -> std::result::Result<Vec<u64>, BatchError>
    where
        I: IntoIterator<Item = NewEntry>,
    {
        let mut sequenced = Vec::new();
        for entry in entries {
            match self.sequence(entry.hash, entry.payload) {
                Ok(index) => sequenced.push(index),
                Err(error) => return Err(BatchError { sequenced, error }),
            }
        }
        Ok(sequenced)
    }
}
