//! Error types for the log engine.

use std::fmt;

use board_log_core::{CheckpointError, EntryHash, Hash, KeyError};
use board_log_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable discriminator for every failure the engine reports.
///
/// Callers branch on the code; the accompanying description is only for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NameEmpty,
    KeyGenerationError,
    OriginEmpty,
    InvalidOrigin,
    SignerInstantiationError,
    VerifierInstantiationError,
    LogAlreadyExists,
    LogCreationError,
    ReadLogCheckpointError,
    CheckpointParsingError,
    CheckpointSigningError,
    WriteCheckpointError,
    StorageLoadError,
    StorageReadError,
    DuplicatedEntryError,
    EntrySequencingError,
    SequenceGapError,
    CheckpointSizeRegression,
    RootMismatchError,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NameEmpty => "NameEmpty",
            ErrorCode::KeyGenerationError => "KeyGenerationError",
            ErrorCode::OriginEmpty => "OriginEmpty",
            ErrorCode::InvalidOrigin => "InvalidOrigin",
            ErrorCode::SignerInstantiationError => "SignerInstantiationError",
            ErrorCode::VerifierInstantiationError => "VerifierInstantiationError",
            ErrorCode::LogAlreadyExists => "LogAlreadyExists",
            ErrorCode::LogCreationError => "LogCreationError",
            ErrorCode::ReadLogCheckpointError => "ReadLogCheckpointError",
            ErrorCode::CheckpointParsingError => "CheckpointParsingError",
            ErrorCode::CheckpointSigningError => "CheckpointSigningError",
            ErrorCode::WriteCheckpointError => "WriteCheckpointError",
            ErrorCode::StorageLoadError => "StorageLoadError",
            ErrorCode::StorageReadError => "StorageReadError",
            ErrorCode::DuplicatedEntryError => "DuplicatedEntryError",
            ErrorCode::EntrySequencingError => "EntrySequencingError",
            ErrorCode::SequenceGapError => "SequenceGapError",
            ErrorCode::CheckpointSizeRegression => "CheckpointSizeRegression",
            ErrorCode::RootMismatchError => "RootMismatchError",
        }
    }

    /// Consistency violations mean stored state is corrupt. Integration
    /// must halt rather than attempt repair.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCode::SequenceGapError
                | ErrorCode::CheckpointSizeRegression
                | ErrorCode::RootMismatchError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during log operations.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("key name cannot be empty")]
    NameEmpty,

    #[error("key generation failed: {0}")]
    KeyGeneration(KeyError),

    #[error("origin cannot be empty")]
    OriginEmpty,

    #[error("invalid origin {0:?}")]
    InvalidOrigin(String),

    #[error("cannot create signer: {0}")]
    Signer(KeyError),

    #[error("cannot create verifier: {0}")]
    Verifier(KeyError),

    #[error("log already exists")]
    LogAlreadyExists,

    #[error("cannot create log storage: {0}")]
    LogCreation(StoreError),

    #[error("cannot read checkpoint: {0}")]
    ReadCheckpoint(String),

    #[error("cannot verify checkpoint: {0}")]
    CheckpointParsing(CheckpointError),

    #[error("cannot sign checkpoint: {0}")]
    Signing(CheckpointError),

    #[error("cannot write checkpoint: {0}")]
    WriteCheckpoint(StoreError),

    #[error("cannot load storage: {0}")]
    StorageLoad(StoreError),

    #[error("storage read failed: {0}")]
    StorageRead(StoreError),

    /// The content hash is already sequenced. Recoverable: callers may treat
    /// it as "already submitted".
    #[error("entry {hash} is already sequenced")]
    DuplicateEntry { hash: EntryHash },

    #[error("cannot sequence entry {hash}: {source}")]
    Sequencing {
        hash: EntryHash,
        #[source]
        source: StoreError,
    },

    #[error("sequence gap: index {index} is missing")]
    SequenceGap { index: u64 },

    #[error("checkpoint size would regress from {current} to {proposed}")]
    SizeRegression { current: u64, proposed: u64 },

    #[error("root mismatch at size {size}: checkpoint has {expected}, entries give {computed}")]
    RootMismatch {
        size: u64,
        expected: Hash,
        computed: Hash,
    },
}

impl LogError {
    /// The discriminator reported for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LogError::NameEmpty => ErrorCode::NameEmpty,
            LogError::KeyGeneration(_) => ErrorCode::KeyGenerationError,
            LogError::OriginEmpty => ErrorCode::OriginEmpty,
            LogError::InvalidOrigin(_) => ErrorCode::InvalidOrigin,
            LogError::Signer(_) => ErrorCode::SignerInstantiationError,
            LogError::Verifier(_) => ErrorCode::VerifierInstantiationError,
            LogError::LogAlreadyExists => ErrorCode::LogAlreadyExists,
            LogError::LogCreation(_) => ErrorCode::LogCreationError,
            LogError::ReadCheckpoint(_) => ErrorCode::ReadLogCheckpointError,
            LogError::CheckpointParsing(_) => ErrorCode::CheckpointParsingError,
            LogError::Signing(_) => ErrorCode::CheckpointSigningError,
            LogError::WriteCheckpoint(_) => ErrorCode::WriteCheckpointError,
            LogError::StorageLoad(_) => ErrorCode::StorageLoadError,
            LogError::StorageRead(_) => ErrorCode::StorageReadError,
            LogError::DuplicateEntry { .. } => ErrorCode::DuplicatedEntryError,
            LogError::Sequencing { .. } => ErrorCode::EntrySequencingError,
            LogError::SequenceGap { .. } => ErrorCode::SequenceGapError,
            LogError::SizeRegression { .. } => ErrorCode::CheckpointSizeRegression,
            LogError::RootMismatch { .. } => ErrorCode::RootMismatchError,
        }
    }

    /// Map an origin validation failure.
    pub(crate) fn from_origin(error: CheckpointError) -> Self {
        match error {
            CheckpointError::EmptyOrigin => LogError::OriginEmpty,
            CheckpointError::InvalidOrigin(origin) => LogError::InvalidOrigin(origin),
            other => LogError::CheckpointParsing(other),
        }
    }
}

/// Result type for log operations.
pub type Result<T> = std::result::Result<T, LogError>;
