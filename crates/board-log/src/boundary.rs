//! Host boundary: the four operations a host process drives a log with.
//!
//! Each operation takes plain strings and paths, opens filesystem storage
//! itself, and reports failures as a [`BoundaryError`] carrying a stable
//! [`ErrorCode`]. [`Response`] is the JSON envelope for hosts that exchange
//! results as text: data fields are zeroed on failure and error fields are
//! absent on success.

use std::fmt;
use std::path::{Path, PathBuf};

use board_log_core::{
    generate_key_pair, validate_origin, Checkpoint, EntryHash, NoteSigner, NoteVerifier,
};
use board_log_store::{FsOptions, FsStorage, Payload};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LogConfig;
use crate::error::{ErrorCode, LogError};
use crate::log::Log;
use crate::sequencer::{BatchError, NewEntry};

/// A failed boundary operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {description}")]
pub struct BoundaryError {
    pub code: ErrorCode,
    pub description: String,
}

impl From<LogError> for BoundaryError {
    fn from(error: LogError) -> Self {
        Self {
            code: error.code(),
            description: error.to_string(),
        }
    }
}

impl From<BatchError> for BoundaryError {
    fn from(batch: BatchError) -> Self {
        batch.error.into()
    }
}

/// Freshly generated note keys.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedKeys {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for GeneratedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeys")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Checkpoint fields as reported to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSummary {
    pub origin: String,
    pub size: u64,
    /// Standard base64 of the 32-byte root.
    pub root_hash: String,
}

impl From<&Checkpoint> for CheckpointSummary {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            origin: checkpoint.origin.clone(),
            size: checkpoint.size,
            root_hash: checkpoint.root_hash.to_base64(),
        }
    }
}

/// One entry to sequence: its content hash and a staged payload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRequest {
    pub content_hash: [u8; 32],
    pub payload_path: PathBuf,
}

/// Indices assigned by [`sequence`], in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceResult {
    pub indices: Vec<u64>,
}

/// Result envelope: data plus error fields, mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl<T> Response<T> {
    pub fn is_ok(&self) -> bool {
        self.error_code.is_none()
    }

    pub fn into_result(self) -> Result<T, BoundaryError> {
        match self.error_code {
            None => Ok(self.data),
            Some(code) => Err(BoundaryError {
                code,
                description: self.error_description.unwrap_or_default(),
            }),
        }
    }
}

impl<T: Default> From<Result<T, BoundaryError>> for Response<T> {
    fn from(result: Result<T, BoundaryError>) -> Self {
        match result {
            Ok(data) => Self {
                data,
                error_code: None,
                error_description: None,
            },
            Err(error) => Self {
                data: T::default(),
                error_code: Some(error.code),
                error_description: Some(error.description),
            },
        }
    }
}

/// Generate a named key pair.
pub fn generate_keys(name: &str) -> Result<GeneratedKeys, BoundaryError> {
    if name.is_empty() {
        return Err(LogError::NameEmpty.into());
    }
    let pair = generate_key_pair(name).map_err(LogError::KeyGeneration)?;
    Ok(GeneratedKeys {
        public_key: pair.public_key,
        private_key: pair.private_key,
    })
}

/// Initialize a new log, or integrate pending entries into an existing one.
///
/// When there is nothing to integrate the current checkpoint is returned
/// unchanged.
pub fn integrate(
    storage_dir: &Path,
    initialize: bool,
    public_key: &str,
    private_key: &str,
    origin: &str,
) -> Result<CheckpointSummary, BoundaryError> {
    validate_origin(origin).map_err(LogError::from_origin)?;
    let signer = NoteSigner::from_private_key(private_key).map_err(LogError::Signer)?;

    if initialize {
        let storage = FsStorage::open(storage_dir).map_err(LogError::LogCreation)?;
        let log = Log::new(storage, LogConfig::new(origin))?;
        let signed = log.initialize(&signer)?;
        return Ok(CheckpointSummary::from(&signed.checkpoint));
    }

    let verifier = NoteVerifier::from_public_key(public_key).map_err(LogError::Verifier)?;
    let log = open_log(storage_dir, origin)?;
    let outcome = log.integrate_with(&verifier, &signer)?;
    Ok(CheckpointSummary::from(outcome.checkpoint()))
}

/// Sequence staged entries, returning their indices in input order.
///
/// On failure, indices assigned before the failing entry are not reported.
pub fn sequence(
    storage_dir: &Path,
    entries: &[SequenceRequest],
    public_key: &str,
    origin: &str,
) -> Result<SequenceResult, BoundaryError> {
    let verifier = NoteVerifier::from_public_key(public_key).map_err(LogError::Verifier)?;
    let log = open_log(storage_dir, origin)?;
    let entries = entries.iter().map(|request| NewEntry {
        hash: EntryHash::from_bytes(request.content_hash),
        payload: Payload::TempFile(request.payload_path.clone()),
    });
    let indices = log.sequence(&verifier, entries)?;
    Ok(SequenceResult { indices })
}

/// Read and verify the current checkpoint.
pub fn read_checkpoint(
    storage_dir: &Path,
    public_key: &str,
    origin: &str,
) -> Result<CheckpointSummary, BoundaryError> {
    let verifier = NoteVerifier::from_public_key(public_key).map_err(LogError::Verifier)?;
    let log = open_log(storage_dir, origin)?;
    let checkpoint = log.checkpoint(&verifier)?;
    Ok(CheckpointSummary::from(&checkpoint))
}

fn open_log(storage_dir: &Path, origin: &str) -> Result<Log<FsStorage>, BoundaryError> {
    if !storage_dir.is_dir() {
        return Err(LogError::ReadCheckpoint(format!(
            "no log at {}",
            storage_dir.display()
        ))
        .into());
    }
    // Reads leave the directory untouched; sequencing recovers on insert.
    let storage = FsStorage::open_existing(storage_dir, FsOptions::default())
        .map_err(LogError::StorageLoad)?;
    Ok(Log::new(storage, LogConfig::new(origin))?)
}
