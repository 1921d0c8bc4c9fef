//! SQLite implementation of the LogStorage trait.
//!
//! A single database file holds entries, the checkpoint note and the tree
//! state. Useful where a directory tree of small files is awkward.

use std::path::Path;
use std::sync::Mutex;

use board_log_core::{CompactRange, EntryHash, SequencedEntry};
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use crate::codec::{decode_tree_state, encode_tree_state};
use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{InsertResult, LogStorage, Payload};

/// SQLite-based storage implementation.
///
/// Thread-safe via internal Mutex. Inserts run in a transaction so index
/// assignment and deduplication are atomic.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&mut conn)
    }
}

fn to_sql_index(index: u64) -> Result<i64> {
    i64::try_from(index).map_err(|_| StoreError::InvalidData(format!("index {index} out of range")))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<SequencedEntry> {
    let seq: i64 = row.get("seq")?;
    let hash_bytes: Vec<u8> = row.get("entry_hash")?;
    let hash = EntryHash::try_from(hash_bytes.as_slice()).map_err(|_| {
        rusqlite::Error::InvalidColumnType(1, "entry_hash".into(), rusqlite::types::Type::Blob)
    })?;
    Ok(SequencedEntry::new(seq as u64, hash))
}

impl LogStorage for SqliteStore {
    fn read_checkpoint(&self) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT note FROM checkpoint WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::from)
        })
    }

    fn create_checkpoint(&self, note: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO checkpoint (id, note, updated_at) VALUES (1, ?1, ?2)",
                params![note, now_millis()],
            )?;
            if inserted == 0 {
                return Err(StoreError::AlreadyExists("checkpoint".into()));
            }
            Ok(())
        })
    }

    fn replace_checkpoint(&self, note: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO checkpoint (id, note, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET note = excluded.note, updated_at = excluded.updated_at",
                params![note, now_millis()],
            )?;
            Ok(())
        })
    }

    fn entry_index(&self, hash: &EntryHash) -> Result<Option<u64>> {
        self.with_conn(|conn| {
            let seq: Option<i64> = conn
                .query_row(
                    "SELECT seq FROM entries WHERE entry_hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(seq.map(|s| s as u64))
        })
    }

    fn next_index(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let next: i64 = conn.query_row(
                "SELECT COALESCE(MAX(seq) + 1, 0) FROM entries",
                [],
                |row| row.get(0),
            )?;
            Ok(next as u64)
        })
    }

    fn insert_entry(&self, hash: &EntryHash, payload: Payload) -> Result<InsertResult> {
        let bytes = payload.read()?;

        let result = self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT seq FROM entries WHERE entry_hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(InsertResult::AlreadyExists);
            }

            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq) + 1, 0) FROM entries",
                [],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO entries (seq, entry_hash, payload, sequenced_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    next,
                    hash.as_bytes().as_slice(),
                    bytes.as_ref(),
                    now_millis()
                ],
            )?;
            tx.commit()?;

            Ok(InsertResult::Inserted(next as u64))
        })?;

        payload.release();
        if let InsertResult::Inserted(index) = result {
            tracing::debug!(hash = %hash, index, "sequenced entry");
        }
        Ok(result)
    }

    fn entries_range(&self, start: u64, end: u64) -> Result<Vec<SequencedEntry>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let start = to_sql_index(start)?;
        let end = to_sql_index(end.min(i64::MAX as u64))?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, entry_hash FROM entries WHERE seq >= ?1 AND seq < ?2 ORDER BY seq",
            )?;
            let entries = stmt
                .query_map(params![start, end], row_to_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    fn read_payload(&self, hash: &EntryHash) -> Result<Option<Bytes>> {
        self.with_conn(|conn| {
            let payload: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT payload FROM entries WHERE entry_hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(payload.map(Bytes::from))
        })
    }

    fn has_payload(&self, hash: &EntryHash) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM entries WHERE entry_hash = ?1",
                    params![hash.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn read_tree_state(&self) -> Result<Option<CompactRange>> {
        let state: Option<Vec<u8>> = self.with_conn(|conn| {
            conn.query_row("SELECT state FROM tree_state WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::from)
        })?;
        state.map(|bytes| decode_tree_state(&bytes)).transpose()
    }

    fn write_tree_state(&self, range: &CompactRange) -> Result<()> {
        let state = encode_tree_state(range)?;
        let size = to_sql_index(range.size())?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tree_state (id, size, state, updated_at) VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    size = excluded.size,
                    state = excluded.state,
                    updated_at = excluded.updated_at",
                params![size, state, now_millis()],
            )?;
            Ok(())
        })
    }
}
