//! CBOR encoding of persisted tree state.

use board_log_core::{CompactRange, Hash};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Current tree state encoding version.
pub const TREE_STATE_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct TreeStateRecord {
    version: u8,
    size: u64,
    peaks: Vec<[u8; 32]>,
}

/// Encode a compact range for storage.
pub fn encode_tree_state(range: &CompactRange) -> Result<Vec<u8>> {
    let record = TreeStateRecord {
        version: TREE_STATE_VERSION,
        size: range.size(),
        peaks: range.peaks().iter().map(|h| h.0).collect(),
    };
    let mut buf = Vec::new();
    ciborium::into_writer(&record, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Decode a stored compact range.
pub fn decode_tree_state(bytes: &[u8]) -> Result<CompactRange> {
    let record: TreeStateRecord =
        ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if record.version != TREE_STATE_VERSION {
        return Err(StoreError::InvalidData(format!(
            "unsupported tree state version {}",
            record.version
        )));
    }
    let peaks = record.peaks.into_iter().map(Hash::from_bytes).collect();
    CompactRange::from_parts(record.size, peaks)
        .map_err(|e| StoreError::InvalidData(e.to_string()))
}
