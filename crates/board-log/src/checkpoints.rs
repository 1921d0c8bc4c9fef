//! CheckpointManager: creation, verification and publication of the signed
//! checkpoint.
//!
//! A log has exactly one current checkpoint. It is created once, at size 0,
//! and from then on only replaced by a checkpoint that is at least as large.

use board_log_core::{
    validate_origin, Checkpoint, NoteSigner, NoteVerifier, Rfc6962Hasher, SignedCheckpoint,
    TreeHasher,
};
use board_log_store::{LogStorage, StoreError};
use tracing::instrument;

use crate::error::{LogError, Result};

/// Reads and writes the current checkpoint of one log.
pub struct CheckpointManager<'a, S: ?Sized> {
    storage: &'a S,
}

impl<'a, S: LogStorage + ?Sized> CheckpointManager<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Create and persist the empty-tree checkpoint for a new log.
    #[instrument(skip(self, signer))]
    pub fn initialize(&self, origin: &str, signer: &NoteSigner) -> Result<SignedCheckpoint> {
        validate_origin(origin).map_err(LogError::from_origin)?;

        let checkpoint = Checkpoint::new(origin, 0, Rfc6962Hasher.empty_root());
        let signed = SignedCheckpoint::sign(checkpoint, signer).map_err(LogError::Signing)?;

        match self.storage.create_checkpoint(signed.as_bytes()) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => return Err(LogError::LogAlreadyExists),
            Err(e) => return Err(LogError::WriteCheckpoint(e)),
        }

        tracing::info!(key = signer.name(), "initialized log");
        Ok(signed)
    }

    /// Read the current checkpoint and check its signature and origin.
    pub fn load_and_verify(&self, origin: &str, verifier: &NoteVerifier) -> Result<Checkpoint> {
        Ok(self.load_signed(origin, verifier)?.checkpoint)
    }

    /// Like [`load_and_verify`](Self::load_and_verify), keeping the note.
    pub fn load_signed(&self, origin: &str, verifier: &NoteVerifier) -> Result<SignedCheckpoint> {
        let note = self
            .storage
            .read_checkpoint()
            .map_err(|e| LogError::ReadCheckpoint(e.to_string()))?
            .ok_or_else(|| LogError::ReadCheckpoint("no checkpoint found".into()))?;
        SignedCheckpoint::open(&note, origin, verifier).map_err(LogError::CheckpointParsing)
    }

    /// Sign `checkpoint` and atomically make it the current one.
    ///
    /// Rejects a checkpoint smaller than the stored one, and one of equal
    /// size with a different root.
    #[instrument(skip_all, fields(origin = %checkpoint.origin, size = checkpoint.size))]
    pub fn sign_and_publish(
        &self,
        checkpoint: Checkpoint,
        signer: &NoteSigner,
    ) -> Result<SignedCheckpoint> {
        let current = self.load_signed(&checkpoint.origin, &signer.verifier())?;
        let current = current.checkpoint;
        if checkpoint.size < current.size {
            return Err(LogError::SizeRegression {
                current: current.size,
                proposed: checkpoint.size,
            });
        }
        if checkpoint.size == current.size && checkpoint.root_hash != current.root_hash {
            return Err(LogError::RootMismatch {
                size: checkpoint.size,
                expected: current.root_hash,
                computed: checkpoint.root_hash,
            });
        }

        let signed = SignedCheckpoint::sign(checkpoint, signer).map_err(LogError::Signing)?;
        self.storage
            .replace_checkpoint(signed.as_bytes())
            .map_err(LogError::WriteCheckpoint)?;

        tracing::info!(
            size = signed.checkpoint.size,
            root = %signed.checkpoint.root_hash,
            "published checkpoint"
        );
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_log_core::{generate_key_pair, Hash};
    use board_log_store::MemoryStore;

    fn keys(name: &str) -> (NoteSigner, NoteVerifier) {
        let pair = generate_key_pair(name).unwrap();
        (
            NoteSigner::from_private_key(&pair.private_key).unwrap(),
            NoteVerifier::from_public_key(&pair.public_key).unwrap(),
        )
    }

    #[test]
    fn test_initialize_empty_tree() {
        let store = MemoryStore::new();
        let (signer, verifier) = keys("board");
        let manager = CheckpointManager::new(&store);

        let signed = manager.initialize("test-log", &signer).unwrap();
        assert_eq!(signed.checkpoint.size, 0);
        assert_eq!(signed.checkpoint.root_hash, Rfc6962Hasher.empty_root());

        let loaded = manager.load_and_verify("test-log", &verifier).unwrap();
        assert_eq!(loaded, signed.checkpoint);
    }

    #[test]
    fn test_initialize_twice() {
        let store = MemoryStore::new();
        let (signer, _) = keys("board");
        let manager = CheckpointManager::new(&store);
        manager.initialize("test-log", &signer).unwrap();
        assert!(matches!(
            manager.initialize("test-log", &signer),
            Err(LogError::LogAlreadyExists)
        ));
    }

    #[test]
    fn test_initialize_rejects_bad_origin() {
        let store = MemoryStore::new();
        let (signer, _) = keys("board");
        let manager = CheckpointManager::new(&store);
        assert!(matches!(manager.initialize("", &signer), Err(LogError::OriginEmpty)));
        assert!(matches!(
            manager.initialize("two\nlines", &signer),
            Err(LogError::InvalidOrigin(_))
        ));
        assert_eq!(store.read_checkpoint().unwrap(), None);
    }

    #[test]
    fn test_load_failures() {
        let store = MemoryStore::new();
        let (signer, verifier) = keys("board");
        let (_, stranger) = keys("board");
        let manager = CheckpointManager::new(&store);

        assert!(matches!(
            manager.load_and_verify("test-log", &verifier),
            Err(LogError::ReadCheckpoint(_))
        ));

        manager.initialize("test-log", &signer).unwrap();
        assert!(matches!(
            manager.load_and_verify("test-log", &stranger),
            Err(LogError::CheckpointParsing(_))
        ));
        assert!(matches!(
            manager.load_and_verify("other-log", &verifier),
            Err(LogError::CheckpointParsing(_))
        ));
    }

    #[test]
    fn test_publish_guards_history() {
        let store = MemoryStore::new();
        let (signer, verifier) = keys("board");
        let manager = CheckpointManager::new(&store);
        manager.initialize("test-log", &signer).unwrap();

        let grown = Checkpoint::new("test-log", 2, Hash::from_bytes([2; 32]));
        manager.sign_and_publish(grown.clone(), &signer).unwrap();
        assert_eq!(manager.load_and_verify("test-log", &verifier).unwrap(), grown);

        let shrunk = Checkpoint::new("test-log", 1, Hash::from_bytes([1; 32]));
        assert!(matches!(
            manager.sign_and_publish(shrunk, &signer),
            Err(LogError::SizeRegression {
                current: 2,
                proposed: 1
            })
        ));

        let forked = Checkpoint::new("test-log", 2, Hash::from_bytes([3; 32]));
        assert!(matches!(
            manager.sign_and_publish(forked, &signer),
            Err(LogError::RootMismatch { .. })
        ));

        // Republishing the same state is allowed.
        manager.sign_and_publish(grown.clone(), &signer).unwrap();
        assert_eq!(manager.load_and_verify("test-log", &verifier).unwrap(), grown);
    }
}
