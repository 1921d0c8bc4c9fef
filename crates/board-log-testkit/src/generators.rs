//! Proptest generators for property-based testing.

use proptest::prelude::*;

use board_log_core::{EntryHash, Hash};

/// Generate a random EntryHash.
pub fn entry_hash() -> impl Strategy<Value = EntryHash> {
    any::<[u8; 32]>().prop_map(EntryHash::from_bytes)
}

/// Generate a random tree Hash.
pub fn tree_hash() -> impl Strategy<Value = Hash> {
    any::<[u8; 32]>().prop_map(Hash::from_bytes)
}

/// Generate up to `max` distinct entry hashes in arbitrary order.
pub fn distinct_hashes(max: usize) -> impl Strategy<Value = Vec<EntryHash>> {
    prop::collection::btree_set(any::<[u8; 32]>(), 0..=max)
        .prop_map(|set| set.into_iter().map(EntryHash::from_bytes).collect::<Vec<_>>())
        .prop_shuffle()
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a valid log origin.
pub fn origin() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.-]{0,15}(/[a-z0-9-]{1,8})?"
}

/// Generate a key name: non-empty, without '+' or whitespace.
pub fn key_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9._-]{0,15}"
}

/// How to cut a run of entries into integration batches.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub hashes: Vec<EntryHash>,
    /// Batch sizes, consumed in order until the hashes run out.
    pub cuts: Vec<usize>,
}

impl BatchPlan {
    /// Split the hashes into consecutive batches.
    pub fn batches(&self) -> Vec<&[EntryHash]> {
        let mut batches = Vec::new();
        let mut rest = self.hashes.as_slice();
        let mut cuts = self.cuts.iter().copied().cycle();
        while !rest.is_empty() {
            let cut = cuts.next().unwrap_or(1).clamp(1, rest.len());
            let (batch, tail) = rest.split_at(cut);
            batches.push(batch);
            rest = tail;
        }
        batches
    }
}

/// Generate a batch plan over up to `max` distinct entries.
pub fn batch_plan(max: usize) -> impl Strategy<Value = BatchPlan> {
    (
        distinct_hashes(max),
        prop::collection::vec(1usize..=8, 1..=8),
    )
        .prop_map(|(hashes, cuts)| BatchPlan { hashes, cuts })
}
