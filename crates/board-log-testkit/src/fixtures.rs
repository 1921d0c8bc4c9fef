//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a log with deterministic keys,
//! backed by a temporary directory, an in-memory SQLite database or plain
//! memory.

use std::path::Path;

use anyhow::Context;
use board_log::{Log, LogConfig, NewEntry};
use board_log_core::{Checkpoint, EntryHash, NoteSigner, NoteVerifier};
use board_log_store::{FsOptions, FsStorage, LogStorage, MemoryStore, SqliteStore};
use tempfile::TempDir;

/// Origin used by every fixture log.
pub const TEST_ORIGIN: &str = "test-log";

/// Key name of the fixture signer.
pub const TEST_KEY_NAME: &str = "test-board";

/// A log, its keys and (for disk-backed logs) the directory holding it.
pub struct TestLog<S> {
    pub log: Log<S>,
    pub signer: NoteSigner,
    pub verifier: NoteVerifier,
    dir: Option<TempDir>,
}

impl TestLog<FsStorage> {
    /// An initialized log in a fresh temporary directory.
    ///
    /// fsync is off; durability is not what these tests observe.
    pub fn on_disk(config: LogConfig) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir().context("creating log directory")?;
        let storage = FsStorage::open_with(dir.path(), FsOptions { sync: false })
            .context("opening filesystem storage")?;
        Self::start(storage, config, Some(dir))
    }

    /// Open the same directory again, as a restarted process would.
    pub fn reopen(&self) -> anyhow::Result<Log<FsStorage>> {
        let path = self.path().context("in-memory logs cannot be reopened")?;
        let storage = FsStorage::open_with(path, FsOptions { sync: false })?;
        Ok(Log::new(storage, self.log.config().clone())?)
    }
}

impl TestLog<MemoryStore> {
    /// An initialized log in memory.
    pub fn in_memory(config: LogConfig) -> anyhow::Result<Self> {
        Self::start(MemoryStore::new(), config, None)
    }
}

impl TestLog<SqliteStore> {
    /// An initialized log in an in-memory SQLite database.
    pub fn in_sqlite(config: LogConfig) -> anyhow::Result<Self> {
        let storage = SqliteStore::open_memory().context("opening sqlite storage")?;
        Self::start(storage, config, None)
    }
}

impl<S: LogStorage> TestLog<S> {
    fn start(storage: S, config: LogConfig, dir: Option<TempDir>) -> anyhow::Result<Self> {
        let signer = NoteSigner::from_seed(TEST_KEY_NAME, &[0x42; 32])?;
        let verifier = signer.verifier();
        let log = Log::new(storage, config)?;
        log.initialize(&signer).context("initializing log")?;
        Ok(Self {
            log,
            signer,
            verifier,
            dir,
        })
    }

    /// Storage directory, for disk-backed logs.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Sequence `hashes` with payloads from [`payload_for`].
    pub fn sequence(&self, hashes: &[EntryHash]) -> anyhow::Result<Vec<u64>> {
        let entries = hashes
            .iter()
            .map(|hash| NewEntry::new(*hash, payload_for(hash)));
        Ok(self.log.sequence(&self.verifier, entries)?)
    }

    /// Integrate and return the resulting checkpoint.
    pub fn integrate(&self) -> anyhow::Result<Checkpoint> {
        let outcome = self.log.integrate(&self.signer)?;
        Ok(outcome.checkpoint().clone())
    }

    /// The current verified checkpoint.
    pub fn checkpoint(&self) -> anyhow::Result<Checkpoint> {
        Ok(self.log.checkpoint(&self.verifier)?)
    }

    /// Sequence and integrate one batch at a time.
    pub fn run_batches<'h>(
        &self,
        batches: impl IntoIterator<Item = &'h [EntryHash]>,
    ) -> anyhow::Result<Vec<Checkpoint>> {
        batches
            .into_iter()
            .map(|batch| {
                self.sequence(batch)?;
                self.integrate()
            })
            .collect()
    }
}

/// Payload stored for `hash` by the fixtures.
pub fn payload_for(hash: &EntryHash) -> Vec<u8> {
    format!("payload-{}", hex::encode(hash.as_bytes())).into_bytes()
}

/// `count` distinct, deterministic entry hashes.
pub fn numbered_hashes(count: u32) -> Vec<EntryHash> {
    (0..count)
        .map(|n| {
            let mut bytes = [0u8; 32];
            bytes[..4].copy_from_slice(&n.to_be_bytes());
            bytes[31] = 0xff;
            EntryHash::from_bytes(bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_starts_empty() {
        let fixture = TestLog::in_memory(LogConfig::new(TEST_ORIGIN)).unwrap();
        assert_eq!(fixture.checkpoint().unwrap().size, 0);
        assert!(fixture.path().is_none());
        assert_eq!(fixture.verifier.name(), TEST_KEY_NAME);
    }

    #[test]
    fn test_disk_fixture_reopens() {
        let fixture = TestLog::on_disk(LogConfig::new(TEST_ORIGIN)).unwrap();
        fixture.sequence(&numbered_hashes(3)).unwrap();
        let checkpoint = fixture.integrate().unwrap();

        let reopened = fixture.reopen().unwrap();
        assert_eq!(reopened.checkpoint(&fixture.verifier).unwrap(), checkpoint);
        let record = reopened.entry(2).unwrap().unwrap();
        assert_eq!(record.payload.as_ref(), payload_for(&record.hash).as_slice());
    }

    #[test]
    fn test_sqlite_fixture_integrates() {
        let fixture = TestLog::in_sqlite(LogConfig::new(TEST_ORIGIN)).unwrap();
        fixture.sequence(&numbered_hashes(5)).unwrap();
        assert_eq!(fixture.integrate().unwrap().size, 5);
        let record = fixture.log.entry(4).unwrap().unwrap();
        assert_eq!(record.payload.as_ref(), payload_for(&record.hash).as_slice());
    }

    #[test]
    fn test_numbered_hashes_are_distinct() {
        let hashes = numbered_hashes(300);
        let unique: std::collections::BTreeSet<_> = hashes.iter().collect();
        assert_eq!(unique.len(), 300);
    }
}
