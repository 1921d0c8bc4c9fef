//! Integrator: folds sequenced entries into the Merkle tree.
//!
//! Integration reads the entries sequenced since the current checkpoint,
//! appends `leaf_hash(entry_hash)` for each to the tree frontier, and
//! produces the next checkpoint. The frontier is persisted between runs, so
//! the cost is proportional to the number of new entries. When the persisted
//! frontier is missing or disagrees with the checkpoint it is rebuilt from
//! the stored entries, and the rebuilt root must match the signed one.

use board_log_core::{Checkpoint, CompactRange, Rfc6962Hasher, TreeHasher};
use board_log_store::{LogStorage, StoreError};
use tracing::instrument;

use crate::config::LogConfig;
use crate::error::{LogError, Result};

/// Entries read per storage call when rebuilding the frontier.
const REBUILD_CHUNK: u64 = 4096;

/// The outcome of a successful integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    /// The next checkpoint, not yet signed.
    pub checkpoint: Checkpoint,
    /// Tree frontier at `checkpoint.size`.
    pub tree: CompactRange,
}

/// Extends a log's tree from its current checkpoint.
#[derive(Debug, Clone)]
pub struct Integrator<H = Rfc6962Hasher> {
    hasher: H,
    check_payloads: bool,
    max_batch: Option<u64>,
}

impl Integrator<Rfc6962Hasher> {
    pub fn new() -> Self {
        Self::with_hasher(Rfc6962Hasher)
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self::new()
            .check_payloads(config.check_payloads)
            .max_batch(config.max_batch)
    }
}

impl Default for Integrator<Rfc6962Hasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: TreeHasher> Integrator<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            hasher,
            check_payloads: true,
            max_batch: None,
        }
    }

    pub fn check_payloads(mut self, check: bool) -> Self {
        self.check_payloads = check;
        self
    }

    pub fn max_batch(mut self, max_batch: Option<u64>) -> Self {
        self.max_batch = max_batch.map(|n| n.max(1));
        self
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Integrate entries sequenced after `current`.
    ///
    /// Returns `None` when there is nothing new.
    #[instrument(skip_all, fields(origin = %current.origin, size = current.size))]
    pub fn integrate<S: LogStorage + ?Sized>(
        &self,
        storage: &S,
        current: &Checkpoint,
    ) -> Result<Option<Integration>> {
        let available = storage.next_index().map_err(LogError::StorageRead)?;
        if available < current.size {
            return Err(LogError::SizeRegression {
                current: current.size,
                proposed: available,
            });
        }
        if available == current.size {
            tracing::debug!("nothing to integrate");
            return Ok(None);
        }

        let end = match self.max_batch {
            Some(n) => available.min(current.size.saturating_add(n)),
            None => available,
        };

        let mut tree = self.load_tree(storage, current)?;
        let entries = storage
            .entries_range(current.size, end)
            .map_err(LogError::StorageRead)?;

        let mut next = current.size;
        for entry in &entries {
            if entry.index != next {
                return Err(LogError::SequenceGap { index: next });
            }
            if self.check_payloads && !storage.has_payload(&entry.hash).map_err(LogError::StorageRead)? {
                return Err(LogError::StorageRead(StoreError::NotFound(format!(
                    "payload of entry {} at index {}",
                    entry.hash, entry.index
                ))));
            }
            tree.append(&self.hasher, self.hasher.leaf_hash(entry.hash.as_bytes()));
            next += 1;
        }
        if next != end {
            return Err(LogError::SequenceGap { index: next });
        }

        let root = tree.root(&self.hasher);
        tracing::debug!(new_size = end, root = %root, "extended tree");

        Ok(Some(Integration {
            checkpoint: Checkpoint::new(current.origin.clone(), end, root),
            tree,
        }))
    }

    /// The tree frontier at `current`, from persisted state when it agrees
    /// with the checkpoint, otherwise rebuilt from stored entries.
    pub fn load_tree<S: LogStorage + ?Sized>(
        &self,
        storage: &S,
        current: &Checkpoint,
    ) -> Result<CompactRange> {
        match storage.read_tree_state() {
            Ok(Some(tree))
                if tree.size() == current.size && tree.root(&self.hasher) == current.root_hash =>
            {
                return Ok(tree);
            }
            Ok(Some(tree)) => {
                tracing::warn!(
                    stored_size = tree.size(),
                    checkpoint_size = current.size,
                    "persisted tree state does not match checkpoint, rebuilding"
                );
            }
            Ok(None) if current.size > 0 => {
                tracing::warn!(checkpoint_size = current.size, "no persisted tree state, rebuilding");
            }
            Ok(None) => {}
            Err(e @ (StoreError::Serialization(_) | StoreError::InvalidData(_))) => {
                tracing::warn!(error = %e, "unreadable tree state, rebuilding");
            }
            Err(e) => return Err(LogError::StorageRead(e)),
        }
        self.rebuild(storage, current)
    }

    fn rebuild<S: LogStorage + ?Sized>(
        &self,
        storage: &S,
        current: &Checkpoint,
    ) -> Result<CompactRange> {
        let mut tree = CompactRange::new();
        let mut next = 0;
        while next < current.size {
            let chunk_end = current.size.min(next.saturating_add(REBUILD_CHUNK));
            let entries = storage
                .entries_range(next, chunk_end)
                .map_err(LogError::StorageRead)?;
            for entry in &entries {
                if entry.index != next {
                    return Err(LogError::SequenceGap { index: next });
                }
                tree.append(&self.hasher, self.hasher.leaf_hash(entry.hash.as_bytes()));
                next += 1;
            }
            if next != chunk_end {
                return Err(LogError::SequenceGap { index: next });
            }
        }

        let computed = tree.root(&self.hasher);
        if computed != current.root_hash {
            return Err(LogError::RootMismatch {
                size: current.size,
                expected: current.root_hash,
                computed,
            });
        }
        Ok(tree)
    }
}
