//! The Log: one bulletin-board log instance over a storage backend.
//!
//! Ties the sequencer, integrator and checkpoint manager together the way a
//! log service drives them: verify the current checkpoint, then act.

use board_log_core::{Checkpoint, CompactRange, EntryHash, NoteSigner, NoteVerifier, SignedCheckpoint};
use board_log_store::{LogStorage, StoreError};
use bytes::Bytes;
use tracing::instrument;

use crate::checkpoints::CheckpointManager;
use crate::config::LogConfig;
use crate::error::{LogError, Result};
use crate::integrator::Integrator;
use crate::sequencer::{BatchError, NewEntry, Sequencer};

/// Result of [`Log::integrate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrateOutcome {
    /// Nothing new was sequenced; the current checkpoint stands.
    Unchanged(Checkpoint),
    /// A larger checkpoint was signed and published.
    Advanced(SignedCheckpoint),
}

impl IntegrateOutcome {
    pub fn checkpoint(&self) -> &Checkpoint {
        match self {
            IntegrateOutcome::Unchanged(checkpoint) => checkpoint,
            IntegrateOutcome::Advanced(signed) => &signed.checkpoint,
        }
    }

    pub fn is_advanced(&self) -> bool {
        matches!(self, IntegrateOutcome::Advanced(_))
    }
}

/// A sequenced entry with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub index: u64,
    pub hash: EntryHash,
    pub payload: Bytes,
}

/// A bulletin-board log.
///
/// Integration must be single-writer: at most one `integrate` may run
/// against a storage root at a time. Sequencing and reads may run
/// concurrently with it.
pub struct Log<S> {
    storage: S,
    config: LogConfig,
}

impl<S: LogStorage> Log<S> {
    /// Create a log over `storage`. Fails if the configured origin is invalid.
    pub fn new(storage: S, config: LogConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { storage, config })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    pub fn origin(&self) -> &str {
        &self.config.origin
    }

    fn checkpoints(&self) -> CheckpointManager<'_, S> {
        CheckpointManager::new(&self.storage)
    }

    /// Create the empty log.
    pub fn initialize(&self, signer: &NoteSigner) -> Result<SignedCheckpoint> {
        let signed = self.checkpoints().initialize(&self.config.origin, signer)?;
        self.persist_tree(&CompactRange::new());
        Ok(signed)
    }

    /// The current checkpoint, verified against `verifier`.
    pub fn checkpoint(&self, verifier: &NoteVerifier) -> Result<Checkpoint> {
        self.checkpoints()
            .load_and_verify(&self.config.origin, verifier)
    }

    /// Sequence a batch after confirming the log's checkpoint verifies.
    #[instrument(skip_all, fields(origin = %self.config.origin))]
    pub fn sequence<I>(
        &self,
        verifier: &NoteVerifier,
        entries: I,
    ) -> std::result::Result<Vec<u64>, BatchError>
    where
        I: IntoIterator<Item = NewEntry>,
    {
        if let Err(error) = self.checkpoint(verifier) {
            return Err(BatchError {
                sequenced: Vec::new(),
                error,
            });
        }
        Sequencer::new(&self.storage).sequence_batch(entries)
    }

    /// Integrate new entries and publish, verifying with the signer's own key.
    pub fn integrate(&self, signer: &NoteSigner) -> Result<IntegrateOutcome> {
        self.integrate_with(&signer.verifier(), signer)
    }

    /// Verify the current checkpoint, integrate everything sequenced since,
    /// and publish the result.
    #[instrument(skip_all, fields(origin = %self.config.origin))]
    pub fn integrate_with(
        &self,
        verifier: &NoteVerifier,
        signer: &NoteSigner,
    ) -> Result<IntegrateOutcome> {
        let current = self.checkpoint(verifier)?;

        let integrator = Integrator::from_config(&self.config);
        let Some(integration) = integrator.integrate(&self.storage, &current)? else {
            return Ok(IntegrateOutcome::Unchanged(current));
        };

        let signed = self
            .checkpoints()
            .sign_and_publish(integration.checkpoint, signer)?;
        self.persist_tree(&integration.tree);

        Ok(IntegrateOutcome::Advanced(signed))
    }

    /// Look up a sequenced entry and its payload.
    pub fn entry(&self, index: u64) -> Result<Option<EntryRecord>> {
        let Some(entry) = self
            .storage
            .entry_at(index)
            .map_err(LogError::StorageRead)?
        else {
            return Ok(None);
        };
        let payload = self
            .storage
            .read_payload(&entry.hash)
            .map_err(LogError::StorageRead)?
            .ok_or_else(|| {
                LogError::StorageRead(StoreError::NotFound(format!(
                    "payload of entry {}",
                    entry.hash
                )))
            })?;
        Ok(Some(EntryRecord {
            index: entry.index,
            hash: entry.hash,
            payload,
        }))
    }

    /// Index assigned to `hash`, if sequenced.
    pub fn index_of(&self, hash: &EntryHash) -> Result<Option<u64>> {
        self.storage.entry_index(hash).map_err(LogError::StorageRead)
    }

    // The persisted frontier only speeds up the next integration, which
    // rebuilds it from entries when it is stale.
    fn persist_tree(&self, tree: &CompactRange) {
        if let Err(e) = self.storage.write_tree_state(tree) {
            tracing::warn!(size = tree.size(), error = %e, "failed to persist tree state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_log_core::{generate_key_pair, Rfc6962Hasher, TreeHasher};
    use board_log_store::{MemoryStore, Payload};

    fn signer() -> NoteSigner {
        NoteSigner::from_private_key(&generate_key_pair("board").unwrap().private_key).unwrap()
    }

    fn entry(n: u8) -> NewEntry {
        NewEntry::new(EntryHash::from_bytes([n; 32]), Payload::from(vec![n; 4]))
    }

    #[test]
    fn test_lifecycle() {
        let log = Log::new(MemoryStore::new(), LogConfig::new("test-log")).unwrap();
        let signer = signer();
        let verifier = signer.verifier();

        log.initialize(&signer).unwrap();
        assert_eq!(
            log.checkpoint(&verifier).unwrap().root_hash,
            Rfc6962Hasher.empty_root()
        );

        let outcome = log.integrate(&signer).unwrap();
        assert!(!outcome.is_advanced());
        assert_eq!(outcome.checkpoint().size, 0);

        let indices = log.sequence(&verifier, (0..3).map(entry)).unwrap();
        assert_eq!(indices, vec![0, 1, 2]);

        let outcome = log.integrate(&signer).unwrap();
        assert!(outcome.is_advanced());
        assert_eq!(outcome.checkpoint().size, 3);
        assert_eq!(log.checkpoint(&verifier).unwrap(), *outcome.checkpoint());
        assert_eq!(log.storage().read_tree_state().unwrap().unwrap().size(), 3);

        let record = log.entry(1).unwrap().unwrap();
        assert_eq!(record.payload, Bytes::from(vec![1; 4]));
        assert_eq!(log.entry(3).unwrap(), None);
        assert_eq!(log.index_of(&EntryHash::from_bytes([2; 32])).unwrap(), Some(2));
    }

    #[test]
    fn test_sequence_requires_verified_checkpoint() {
        let log = Log::new(MemoryStore::new(), LogConfig::new("test-log")).unwrap();
        let signer = signer();

        let err = log.sequence(&signer.verifier(), [entry(0)]).unwrap_err();
        assert!(matches!(err.error, LogError::ReadCheckpoint(_)));

        log.initialize(&signer).unwrap();
        let stranger = NoteVerifier::from_public_key(&generate_key_pair("board").unwrap().public_key)
            .unwrap();
        let err = log.sequence(&stranger, [entry(0)]).unwrap_err();
        assert!(matches!(err.error, LogError::CheckpointParsing(_)));
        assert_eq!(log.storage().next_index().unwrap(), 0);
    }

    #[test]
    fn test_rejects_invalid_origin() {
        assert!(matches!(
            Log::new(MemoryStore::new(), LogConfig::new("")),
            Err(LogError::OriginEmpty)
        ));
    }
}
