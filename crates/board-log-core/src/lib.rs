//! # Board Log Core
//!
//! Pure primitives for the verifiable bulletin-board log: tree hashing,
//! compact ranges, checkpoints, signed notes and note keys.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`EntryHash`] - Content address of a submitted entry
//! - [`Hash`] - Merkle tree hash (leaf, node or root)
//! - [`Rfc6962Hasher`] - SHA-256 tree hasher with RFC 6962 domain separation
//! - [`CompactRange`] - Right frontier of the tree, for incremental extension
//! - [`Checkpoint`] / [`SignedCheckpoint`] - The authenticated log state
//! - [`NoteSigner`] / [`NoteVerifier`] - Named Ed25519 keys
//!
//! ## Wire formats
//!
//! Checkpoint text and signed notes follow the transparency-log conventions
//! used by Go's `sumdb/note`; see [`checkpoint`] and [`note`].

pub mod checkpoint;
pub mod compact;
pub mod error;
pub mod hasher;
pub mod keys;
pub mod note;
pub mod types;

pub use checkpoint::{validate_origin, Checkpoint, SignedCheckpoint};
pub use compact::CompactRange;
pub use error::{CheckpointError, CoreError, KeyError, NoteError};
pub use hasher::{Rfc6962Hasher, TreeHasher};
pub use keys::{generate_key_pair, KeyPair, NoteSigner, NoteVerifier};
pub use note::{open_note, sign_note, Note, NoteSignature};
pub use types::{EntryHash, Hash, SequencedEntry, HASH_SIZE};
