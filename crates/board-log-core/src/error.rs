//! Error types for the bulletin-board log core.

use thiserror::Error;

/// General errors from core data structures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed compact range: size {size} needs {} peaks, got {peaks}", .size.count_ones())]
    MalformedCompactRange { size: u64, peaks: usize },
}

/// Errors creating or parsing note keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid key name {0:?}: must be non-empty and contain no '+' or whitespace")]
    InvalidName(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("unsupported key algorithm {0:#04x}")]
    UnsupportedAlgorithm(u8),

    #[error("key hash {found:08x} does not match name and key material (expected {expected:08x})")]
    KeyHashMismatch { expected: u32, found: u32 },

    #[error("invalid ed25519 public key")]
    InvalidPublicKey,
}

/// Errors signing or opening a signed note.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("malformed note: {0}")]
    Malformed(String),

    #[error("invalid signature by {name}+{key_hash:08x}")]
    InvalidSignature { name: String, key_hash: u32 },

    #[error("note has no signature from a known key")]
    Unverified,
}

/// Errors encoding or decoding checkpoint text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("origin cannot be empty")]
    EmptyOrigin,

    #[error("origin {0:?} contains control characters")]
    InvalidOrigin(String),

    #[error("malformed checkpoint: {0}")]
    Malformed(String),

    #[error("checkpoint origin {found:?} does not match expected {expected:?}")]
    OriginMismatch { expected: String, found: String },

    #[error(transparent)]
    Note(#[from] NoteError),
}
