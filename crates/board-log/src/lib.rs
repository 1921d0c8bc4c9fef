//! # Board Log
//!
//! A verifiable, append-only bulletin-board log: entries are durably
//! sequenced, folded into an RFC 6962 Merkle tree, and summarized by a
//! signed checkpoint that anyone holding the public key can verify.
//!
//! ## Overview
//!
//! - **Sequencing**: each distinct content hash is assigned the next index;
//!   resubmissions are rejected
//! - **Integration**: entries sequenced since the last checkpoint extend the
//!   tree; one large integration and many small ones give the same root
//! - **Checkpoints**: `(origin, size, root)` as a signed note, replaced
//!   atomically and never shrinking
//!
//! ## Usage
//!
//! ```rust,no_run
//! use board_log::{Log, LogConfig, NewEntry};
//! use board_log::core::{generate_key_pair, EntryHash, NoteSigner};
//! use board_log::store::FsStorage;
//!
//! let keys = generate_key_pair("board").unwrap();
//! let signer = NoteSigner::from_private_key(&keys.private_key).unwrap();
//!
//! let storage = FsStorage::open("/var/lib/board").unwrap();
//! let log = Log::new(storage, LogConfig::new("example.org/board")).unwrap();
//! log.initialize(&signer).unwrap();
//!
//! let entry = NewEntry::new(EntryHash::from_bytes([1; 32]), b"ballot".to_vec());
//! log.sequence(&signer.verifier(), [entry]).unwrap();
//!
//! let outcome = log.integrate(&signer).unwrap();
//! assert_eq!(outcome.checkpoint().size, 1);
//! ```
//!
//! ## Host boundary
//!
//! [`boundary`] exposes `generate_keys`, `integrate`, `sequence` and
//! `read_checkpoint` over a storage directory, with string error codes and a
//! JSON result envelope.
//!
//! ## Re-exports
//!
//! - `board_log::core` - Hashing, checkpoints, notes and keys
//! - `board_log::store` - Storage trait and backends

pub mod boundary;
pub mod checkpoints;
pub mod config;
pub mod error;
pub mod integrator;
pub mod log;
pub mod sequencer;

pub use board_log_core as core;
pub use board_log_store as store;

pub use boundary::{BoundaryError, CheckpointSummary, GeneratedKeys, Response, SequenceRequest};
pub use checkpoints::CheckpointManager;
pub use config::LogConfig;
pub use error::{ErrorCode, LogError, Result};
pub use integrator::{Integration, Integrator};
pub use log::{EntryRecord, IntegrateOutcome, Log};
pub use sequencer::{BatchError, NewEntry, Sequencer};

pub use board_log_core::{Checkpoint, EntryHash, Hash, NoteSigner, NoteVerifier, SignedCheckpoint};
