//! # Board Log Store
//!
//! Storage abstraction for the bulletin-board log. Provides a trait-based
//! interface for persisting entries, checkpoints and tree state, with
//! filesystem, SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`LogStorage`] - The trait for all storage operations
//! - [`FsStorage`] - Directory-backed storage, safe to share between processes
//! - [`SqliteStore`] - Single-file SQLite storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of sequencing an entry
//! - [`Payload`] - Entry bytes, in memory or in a staging file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use board_log_core::EntryHash;
//! use board_log_store::{FsStorage, InsertResult, LogStorage, Payload};
//!
//! let storage = FsStorage::open("/var/lib/board").unwrap();
//! let hash = EntryHash::from_bytes([7; 32]);
//! match storage.insert_entry(&hash, Payload::from(b"hello".to_vec())).unwrap() {
//!     InsertResult::Inserted(index) => println!("sequenced at {index}"),
//!     InsertResult::AlreadyExists => println!("duplicate"),
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Create-once checkpoints**: `create_checkpoint` never overwrites
//! - **Atomic replacement**: readers see the old checkpoint or the new one
//! - **Deduplicated sequencing**: a content hash is assigned at most one index
//! - **Dense indices**: new entries take max index + 1

pub mod codec;
pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::{FsOptions, FsStorage, StagedCheckpoint};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, LogStorage, Payload};
