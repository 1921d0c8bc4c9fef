//! Filesystem implementation of the LogStorage trait.
//!
//! Layout under the storage root:
//!
//! ```text
//! checkpoint                  signed checkpoint note
//! tree.state                  CBOR-encoded compact range
//! entries/ab/cd/<hash hex>    payload, by content hash
//! index/ab/cd/<hash hex>      decimal sequence index of that hash
//! seq/<13 hex>/<3 hex>        32-byte content hash at a sequence index
//! seq/next                    lower bound on the next free index
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place.
//! Files that must never be overwritten (sequence slots, the first
//! checkpoint) are hard-linked from the temporary file instead, which fails
//! if the target exists. Two writers therefore can never claim the same
//! sequence index.
//!
//! Sequencing writes the payload, then claims the slot, then the hash index,
//! then advances `seq/next`. `seq/next` only moves past slots whose hash
//! index exists: opening a store, and every insert, first rolls forward any
//! slot whose hash index was not written after a crash or a failed write.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use board_log_core::{CompactRange, EntryHash, SequencedEntry};
use bytes::Bytes;

use crate::codec::{decode_tree_state, encode_tree_state};
use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, LogStorage, Payload};

const CHECKPOINT_FILE: &str = "checkpoint";
const TREE_STATE_FILE: &str = "tree.state";
const ENTRIES_DIR: &str = "entries";
const INDEX_DIR: &str = "index";
const SEQ_DIR: &str = "seq";
const COUNTER_FILE: &str = "next";
const TEMP_SUFFIX: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Options for [`FsStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsOptions {
    /// fsync files and their directories after every write.
    pub sync: bool,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self { sync: true }
    }
}

/// Directory-backed storage for one log instance.
///
/// Several `FsStorage` values, in one process or many, may share a root.
/// Sequencing distinct hashes concurrently is safe; deduplication of the
/// same hash submitted at the same instant is only guaranteed within one
/// `FsStorage`.
#[derive(Debug)]
pub struct FsStorage {
    root: PathBuf,
    options: FsOptions,
    sequencing: Mutex<()>,
}

impl FsStorage {
    /// Open (creating if needed) storage rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(root, FsOptions::default())
    }

    /// Open with explicit options.
    pub fn open_with(root: impl AsRef<Path>, options: FsOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [ENTRIES_DIR, INDEX_DIR, SEQ_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }

        let storage = Self {
            root,
            options,
            sequencing: Mutex::new(()),
        };
        storage.recover()?;

        tracing::debug!(root = %storage.root.display(), sync = options.sync, "opened log storage");
        Ok(storage)
    }

    /// Open storage at an existing `root` without writing to it.
    ///
    /// No directories are created and no recovery runs; writes made through
    /// the handle create what they need and recover before sequencing.
    pub fn open_existing(root: impl AsRef<Path>, options: FsOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StoreError::NotFound(format!(
                "storage root {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            options,
            sequencing: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `note` next to the checkpoint without publishing it.
    ///
    /// The current checkpoint stays readable until [`StagedCheckpoint::commit`].
    /// Dropping the guard discards the staged note.
    pub fn stage_checkpoint(&self, note: &[u8]) -> Result<StagedCheckpoint<'_>> {
        let temp = self.write_temp(&self.checkpoint_path(), note)?;
        Ok(StagedCheckpoint {
            storage: self,
            temp,
            committed: false,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Paths
    // ─────────────────────────────────────────────────────────────────────────

    fn checkpoint_path(&self) -> PathBuf {
        self.root.join(CHECKPOINT_FILE)
    }

    fn tree_state_path(&self) -> PathBuf {
        self.root.join(TREE_STATE_FILE)
    }

    fn counter_path(&self) -> PathBuf {
        self.root.join(SEQ_DIR).join(COUNTER_FILE)
    }

    fn fanout_path(&self, dir: &str, hash: &EntryHash) -> PathBuf {
        let hex = hash.to_hex();
        self.root
            .join(dir)
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(&hex)
    }

    fn entry_path(&self, hash: &EntryHash) -> PathBuf {
        self.fanout_path(ENTRIES_DIR, hash)
    }

    fn index_path(&self, hash: &EntryHash) -> PathBuf {
        self.fanout_path(INDEX_DIR, hash)
    }

    fn seq_path(&self, index: u64) -> PathBuf {
        let hex = format!("{index:016x}");
        self.root.join(SEQ_DIR).join(&hex[..13]).join(&hex[13..])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Atomic writes
    // ─────────────────────────────────────────────────────────────────────────

    fn write_temp(&self, target: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = temp_path(target);
        if let Err(e) = write_file(&temp, bytes, self.options.sync) {
            remove_temp(&temp);
            return Err(e);
        }
        Ok(temp)
    }

    /// Replace `target` with `bytes`.
    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> io::Result<()> {
        let temp = self.write_temp(target, bytes)?;
        if let Err(e) = fs::rename(&temp, target) {
            remove_temp(&temp);
            return Err(e);
        }
        self.sync_parent(target)
    }

    /// Create `target` with `bytes`. Returns false if it already exists.
    fn write_new(&self, target: &Path, bytes: &[u8]) -> io::Result<bool> {
        let temp = self.write_temp(target, bytes)?;
        let linked = fs::hard_link(&temp, target);
        remove_temp(&temp);
        match linked {
            Ok(()) => {
                self.sync_parent(target)?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Move a staged payload file to `target`, copying across filesystems.
    fn move_into_place(&self, staged: &Path, target: &Path) -> io::Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(staged, target) {
            Ok(()) => {
                if self.options.sync {
                    File::open(target)?.sync_all()?;
                }
                self.sync_parent(target)
            }
            Err(e) if !staged.exists() => Err(e),
            Err(_) => {
                let bytes = fs::read(staged)?;
                self.write_atomic(target, &bytes)?;
                remove_temp(staged);
                Ok(())
            }
        }
    }

    fn sync_parent(&self, path: &Path) -> io::Result<()> {
        if !self.options.sync {
            return Ok(());
        }
        match path.parent() {
            Some(parent) => sync_dir(parent),
            None => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sequence bookkeeping
    // ─────────────────────────────────────────────────────────────────────────

    fn read_counter(&self) -> Result<u64> {
        match read_optional(&self.counter_path())? {
            Some(bytes) => parse_index(&bytes, "sequence counter"),
            None => Ok(0),
        }
    }

    fn advance_counter(&self, next: u64) -> Result<()> {
        if self.read_counter()? < next {
            self.write_atomic(&self.counter_path(), next.to_string().as_bytes())?;
        }
        Ok(())
    }

    fn read_slot(&self, index: u64) -> Result<Option<EntryHash>> {
        match read_optional(&self.seq_path(index))? {
            Some(bytes) => EntryHash::try_from(bytes.as_slice()).map(Some).map_err(|_| {
                StoreError::InvalidData(format!("corrupt sequence record at index {index}"))
            }),
            None => Ok(None),
        }
    }

    /// First free slot at or after the counter.
    fn probe_next(&self) -> Result<u64> {
        let mut next = self.read_counter()?;
        while self.seq_path(next).try_exists()? {
            next += 1;
        }
        Ok(next)
    }

    /// Restore hash indices for slots claimed past the counter, then move
    /// the counter past them.
    fn recover(&self) -> Result<()> {
        let start = self.read_counter()?;
        let mut index = start;
        while let Some(hash) = self.read_slot(index)? {
            let index_path = self.index_path(&hash);
            if !index_path.try_exists()? {
                tracing::warn!(index, hash = %hash, "restoring hash index after interrupted sequencing");
                self.write_atomic(&index_path, index.to_string().as_bytes())?;
            }
            index += 1;
        }
        if index != start {
            self.advance_counter(index)?;
        }
        Ok(())
    }

    fn store_payload(&self, hash: &EntryHash, payload: Payload) -> io::Result<()> {
        let target = self.entry_path(hash);
        match payload {
            Payload::Bytes(bytes) => self.write_atomic(&target, &bytes),
            Payload::TempFile(staged) => self.move_into_place(&staged, &target),
        }
    }
}

impl LogStorage for FsStorage {
    fn read_checkpoint(&self) -> Result<Option<Vec<u8>>> {
        Ok(read_optional(&self.checkpoint_path())?)
    }

    fn create_checkpoint(&self, note: &[u8]) -> Result<()> {
        if !self.write_new(&self.checkpoint_path(), note)? {
            return Err(StoreError::AlreadyExists("checkpoint".into()));
        }
        Ok(())
    }

    fn replace_checkpoint(&self, note: &[u8]) -> Result<()> {
        self.stage_checkpoint(note)?.commit()
    }

    fn entry_index(&self, hash: &EntryHash) -> Result<Option<u64>> {
        read_optional(&self.index_path(hash))?
            .map(|bytes| parse_index(&bytes, "hash index"))
            .transpose()
    }

    fn next_index(&self) -> Result<u64> {
        self.probe_next()
    }

    fn insert_entry(&self, hash: &EntryHash, payload: Payload) -> Result<InsertResult> {
        let _guard = self
            .sequencing
            .lock()
            .map_err(|_| StoreError::InvalidData("sequencing lock poisoned".into()))?;

        // A slot claimed by a failed insert must be indexed before its hash
        // can be checked for duplicates.
        self.recover()?;

        if self.entry_index(hash)?.is_some() {
            payload.release();
            return Ok(InsertResult::AlreadyExists);
        }

        self.store_payload(hash, payload)?;

        let mut index = self.probe_next()?;
        while !self.write_new(&self.seq_path(index), hash.as_bytes())? {
            index += 1;
        }
        self.write_atomic(&self.index_path(hash), index.to_string().as_bytes())?;
        // Only recovery advances the counter, so it never passes a slot
        // whose hash index is missing.
        self.recover()?;

        tracing::debug!(hash = %hash, index, "sequenced entry");
        Ok(InsertResult::Inserted(index))
    }

    fn entries_range(&self, start: u64, end: u64) -> Result<Vec<SequencedEntry>> {
        let end = end.min(self.probe_next()?);
        let mut entries = Vec::new();
        for index in start..end {
            if let Some(hash) = self.read_slot(index)? {
                entries.push(SequencedEntry::new(index, hash));
            }
        }
        Ok(entries)
    }

    fn read_payload(&self, hash: &EntryHash) -> Result<Option<Bytes>> {
        Ok(read_optional(&self.entry_path(hash))?.map(Bytes::from))
    }

    fn has_payload(&self, hash: &EntryHash) -> Result<bool> {
        Ok(self.entry_path(hash).try_exists()?)
    }

    fn read_tree_state(&self) -> Result<Option<CompactRange>> {
        read_optional(&self.tree_state_path())?
            .map(|bytes| decode_tree_state(&bytes))
            .transpose()
    }

    fn write_tree_state(&self, range: &CompactRange) -> Result<()> {
        let bytes = encode_tree_state(range)?;
        self.write_atomic(&self.tree_state_path(), &bytes)?;
        Ok(())
    }
}

/// A checkpoint note written beside the live checkpoint but not yet
/// published.
#[derive(Debug)]
pub struct StagedCheckpoint<'a> {
    storage: &'a FsStorage,
    temp: PathBuf,
    committed: bool,
}

impl StagedCheckpoint<'_> {
    /// Location of the staged note.
    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Atomically make the staged note the current checkpoint.
    pub fn commit(mut self) -> Result<()> {
        let target = self.storage.checkpoint_path();
        fs::rename(&self.temp, &target)?;
        self.committed = true;
        self.storage.sync_parent(&target)?;
        Ok(())
    }
}

impl Drop for StagedCheckpoint<'_> {
    fn drop(&mut self) {
        if !self.committed {
            remove_temp(&self.temp);
        }
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{name}.{}.{n}{TEMP_SUFFIX}", std::process::id()))
}

fn write_file(path: &Path, bytes: &[u8], sync: bool) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

fn remove_temp(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file"),
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_index(bytes: &[u8], what: &str) -> Result<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| StoreError::InvalidData(format!("corrupt {what}")))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_log_core::{Rfc6962Hasher, TreeHasher};
    use crate::memory::MemoryStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn entry_hash(n: u8) -> EntryHash {
        EntryHash::from_bytes([n; 32])
    }

    fn open(dir: &tempfile::TempDir) -> FsStorage {
        FsStorage::open_with(dir.path(), FsOptions { sync: false }).unwrap()
    }

    #[test]
    fn test_layout() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        let hash = EntryHash::from_hex(
            "abcdef0000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        storage
            .insert_entry(&hash, Payload::from(b"payload".to_vec()))
            .unwrap();

        let root = dir.path();
        assert_eq!(
            fs::read(root.join("entries/ab/cd").join(hash.to_hex())).unwrap(),
            b"payload"
        );
        assert_eq!(
            fs::read(root.join("index/ab/cd").join(hash.to_hex())).unwrap(),
            b"0"
        );
        assert_eq!(
            fs::read(root.join("seq/0000000000000/000")).unwrap(),
            hash.as_bytes()
        );
        assert_eq!(fs::read(root.join("seq/next")).unwrap(), b"1");
    }

    #[test]
    fn test_sequencing_and_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);

        for i in 0..20u8 {
            let r = storage
                .insert_entry(&entry_hash(i), Payload::from(vec![i]))
                .unwrap();
            assert_eq!(r, InsertResult::Inserted(i as u64));
        }
        let again = storage
            .insert_entry(&entry_hash(4), Payload::from(vec![4]))
            .unwrap();
        assert_eq!(again, InsertResult::AlreadyExists);
        assert_eq!(storage.next_index().unwrap(), 20);

        let range = storage.entries_range(5, 8).unwrap();
        assert_eq!(
            range,
            (5..8u8)
                .map(|i| SequencedEntry::new(i as u64, entry_hash(i)))
                .collect::<Vec<_>>()
        );
        assert_eq!(storage.entries_range(18, u64::MAX).unwrap().len(), 2);
    }

    #[test]
    fn test_temp_file_payload_is_moved() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        let staged = dir.path().join("upload.tmp");
        fs::write(&staged, b"staged bytes").unwrap();

        storage
            .insert_entry(&entry_hash(1), Payload::TempFile(staged.clone()))
            .unwrap();
        assert!(!staged.exists());
        assert_eq!(
            storage.read_payload(&entry_hash(1)).unwrap(),
            Some(Bytes::from_static(b"staged bytes"))
        );
    }

    #[test]
    fn test_missing_temp_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        let result = storage.insert_entry(
            &entry_hash(1),
            Payload::TempFile(dir.path().join("missing")),
        );
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(storage.next_index().unwrap(), 0);
        assert_eq!(storage.entry_index(&entry_hash(1)).unwrap(), None);
    }

    #[test]
    fn test_checkpoint_create_once() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        storage.create_checkpoint(b"v1").unwrap();
        assert!(matches!(
            storage.create_checkpoint(b"v2"),
            Err(StoreError::AlreadyExists(_))
        ));
        storage.replace_checkpoint(b"v3").unwrap();
        assert_eq!(storage.read_checkpoint().unwrap(), Some(b"v3".to_vec()));
    }

    #[test]
    fn test_abandoned_checkpoint_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        storage.create_checkpoint(b"old").unwrap();

        let staged = storage.stage_checkpoint(b"new").unwrap();
        assert_eq!(fs::read(staged.path()).unwrap(), b"new");
        assert_eq!(storage.read_checkpoint().unwrap(), Some(b"old".to_vec()));
        let temp = staged.path().to_path_buf();
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(storage.read_checkpoint().unwrap(), Some(b"old".to_vec()));

        storage.stage_checkpoint(b"new").unwrap().commit().unwrap();
        assert_eq!(storage.read_checkpoint().unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_recovers_interrupted_sequencing() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = open(&dir);
            storage
                .insert_entry(&entry_hash(1), Payload::from(b"one".to_vec()))
                .unwrap();
        }

        // Simulate a crash right after claiming slot 1.
        let hash = entry_hash(2);
        let hex = hash.to_hex();
        let payload_dir = dir.path().join("entries").join(&hex[0..2]).join(&hex[2..4]);
        fs::create_dir_all(&payload_dir).unwrap();
        fs::write(payload_dir.join(&hex), b"two").unwrap();
        fs::write(dir.path().join("seq/0000000000000/001"), hash.as_bytes()).unwrap();

        let storage = open(&dir);
        assert_eq!(storage.entry_index(&hash).unwrap(), Some(1));
        assert_eq!(fs::read(dir.path().join("seq/next")).unwrap(), b"2");
        assert_eq!(
            storage
                .insert_entry(&hash, Payload::from(b"two".to_vec()))
                .unwrap(),
            InsertResult::AlreadyExists
        );
    }

    /// Leave `index` claimed for `hash` with no hash index, as an insert
    /// whose index write failed does.
    fn claim_without_index(storage: &FsStorage, index: u64, hash: &EntryHash) {
        storage.store_payload(hash, Payload::from(vec![0u8])).unwrap();
        assert!(storage.write_new(&storage.seq_path(index), hash.as_bytes()).unwrap());
    }

    #[test]
    fn test_unindexed_slot_is_repaired_before_next_insert() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        let h = entry_hash(0xab);
        claim_without_index(&storage, 0, &h);

        let g = entry_hash(0x11);
        assert_eq!(
            storage.insert_entry(&g, Payload::from(b"g".to_vec())).unwrap(),
            InsertResult::Inserted(1)
        );
        assert_eq!(
            storage.insert_entry(&h, Payload::from(b"h".to_vec())).unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(storage.entry_index(&h).unwrap(), Some(0));

        let hashes: Vec<EntryHash> = open(&dir)
            .entries_range(0, u64::MAX)
            .unwrap()
            .into_iter()
            .map(|e| e.hash)
            .collect();
        assert_eq!(hashes, vec![h, g]);
    }

    #[test]
    fn test_resubmit_of_unindexed_slot_is_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        let h = entry_hash(0xab);
        claim_without_index(&storage, 0, &h);

        assert_eq!(
            storage.insert_entry(&h, Payload::from(b"h".to_vec())).unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(storage.next_index().unwrap(), 1);
        assert_eq!(fs::read(dir.path().join("seq/next")).unwrap(), b"1");
    }

    #[test]
    fn test_counter_stops_at_unindexed_slot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        storage
            .insert_entry(&entry_hash(1), Payload::from(vec![1]))
            .unwrap();
        claim_without_index(&storage, 1, &entry_hash(2));

        // Another writer on the same root repairs the slot before moving on.
        let other = FsStorage::open_existing(dir.path(), FsOptions { sync: false }).unwrap();
        assert_eq!(
            other
                .insert_entry(&entry_hash(3), Payload::from(vec![3]))
                .unwrap(),
            InsertResult::Inserted(2)
        );
        assert_eq!(storage.entry_index(&entry_hash(2)).unwrap(), Some(1));
        assert_eq!(fs::read(dir.path().join("seq/next")).unwrap(), b"3");
    }

    #[test]
    fn test_open_existing_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open_existing(dir.path(), FsOptions::default()).unwrap();
        assert_eq!(storage.read_checkpoint().unwrap(), None);
        assert_eq!(storage.next_index().unwrap(), 0);
        assert_eq!(storage.entry_index(&entry_hash(1)).unwrap(), None);
        assert_eq!(storage.entries_range(0, 10).unwrap(), Vec::new());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        assert!(matches!(
            FsStorage::open_existing(dir.path().join("absent"), FsOptions::default()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_open_existing_can_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            FsStorage::open_existing(dir.path(), FsOptions { sync: false }).unwrap();
        assert_eq!(
            storage
                .insert_entry(&entry_hash(3), Payload::from(vec![3]))
                .unwrap(),
            InsertResult::Inserted(0)
        );
        assert_eq!(storage.entry_index(&entry_hash(3)).unwrap(), Some(0));
    }

    #[test]
    fn test_stale_counter_is_probed_past() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(&dir);
        for i in 0..3u8 {
            storage
                .insert_entry(&entry_hash(i), Payload::from(vec![i]))
                .unwrap();
        }
        fs::write(dir.path().join("seq/next"), b"1").unwrap();
        assert_eq!(storage.next_index().unwrap(), 3);
        let r = storage
            .insert_entry(&entry_hash(9), Payload::from(vec![9]))
            .unwrap();
        assert_eq!(r, InsertResult::Inserted(3));
    }

    #[test]
    fn test_concurrent_writers_share_root() {
        let dir = tempfile::tempdir().unwrap();
        let a = Arc::new(open(&dir));
        let b = Arc::new(open(&dir));

        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let storage = if t % 2 == 0 { a.clone() } else { b.clone() };
                std::thread::spawn(move || {
                    for i in 0..10u8 {
                        let n = t * 10 + i;
                        storage
                            .insert_entry(&entry_hash(n), Payload::from(vec![n]))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let entries = a.entries_range(0, 100).unwrap();
        assert_eq!(entries.len(), 40);
        for (i, e) in entries.iter().enumerate() {
            assert_eq!(e.index, i as u64);
            assert_eq!(a.entry_index(&e.hash).unwrap(), Some(e.index));
        }
    }

    #[test]
    fn test_tree_state_persists() {
        let dir = tempfile::tempdir().unwrap();
        let h = Rfc6962Hasher;
        let range = CompactRange::from_leaves(&h, (0u8..5).map(|i| h.leaf_hash(&[i])));
        open(&dir).write_tree_state(&range).unwrap();
        assert_eq!(open(&dir).read_tree_state().unwrap(), Some(range));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn matches_memory_store(seeds in prop::collection::vec(any::<u8>(), 0..24)) {
            let dir = tempfile::tempdir().unwrap();
            let fs = open(&dir);
            let memory = MemoryStore::new();

            for n in &seeds {
                let payload = vec![*n; 3];
                let a = fs.insert_entry(&entry_hash(*n), Payload::from(payload.clone())).unwrap();
                let b = memory.insert_entry(&entry_hash(*n), Payload::from(payload)).unwrap();
                prop_assert_eq!(a, b);
            }
            prop_assert_eq!(fs.next_index().unwrap(), memory.next_index().unwrap());
            prop_assert_eq!(
                fs.entries_range(0, u64::MAX).unwrap(),
                memory.entries_range(0, u64::MAX).unwrap()
            );
        }
    }
}
