//! Compact range: the right frontier of an append-only Merkle tree.
//!
//! A tree of size `n` decomposes into one perfect subtree per set bit of `n`,
//! ordered from the largest (leftmost) to the smallest (rightmost). Keeping
//! only those subtree roots is enough to append leaves and to compute the
//! RFC 6962 root, so extending the tree costs `O(new leaves)` regardless of
//! the tree size.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hasher::TreeHasher;
use crate::types::Hash;

/// The frontier of a Merkle tree covering leaves `[0, size)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompactRange {
    size: u64,
    /// Perfect subtree roots, largest first. `peaks.len() == size.count_ones()`.
    peaks: Vec<Hash>,
}

impl CompactRange {
    /// The frontier of the empty tree.
    pub const fn new() -> Self {
        Self {
            size: 0,
            peaks: Vec::new(),
        }
    }

    /// Rebuild a frontier from previously persisted parts.
    pub fn from_parts(size: u64, peaks: Vec<Hash>) -> Result<Self, CoreError> {
        if peaks.len() != size.count_ones() as usize {
            return Err(CoreError::MalformedCompactRange {
                size,
                peaks: peaks.len(),
            });
        }
        Ok(Self { size, peaks })
    }

    /// Build the frontier over a sequence of leaf hashes.
    pub fn from_leaves<H, I>(hasher: &H, leaves: I) -> Self
    where
        H: TreeHasher + ?Sized,
        I: IntoIterator<Item = Hash>,
    {
        let mut range = Self::new();
        for leaf in leaves {
            range.append(hasher, leaf);
        }
        range
    }

    /// Number of leaves covered.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Perfect subtree roots, largest first.
    pub fn peaks(&self) -> &[Hash] {
        &self.peaks
    }

    /// Append one leaf hash, merging completed subtrees.
    pub fn append<H: TreeHasher + ?Sized>(&mut self, hasher: &H, leaf: Hash) {
        let mut node = leaf;
        let mut size = self.size;
        // Each trailing one bit is a sibling subtree of the same height.
        while size & 1 == 1 {
            match self.peaks.pop() {
                Some(left) => node = hasher.node_hash(&left, &node),
                None => break,
            }
            size >>= 1;
        }
        self.peaks.push(node);
        self.size += 1;
    }

    /// Compute the RFC 6962 root hash.
    ///
    /// For a non-power-of-two size the peaks are folded from the right:
    /// `node(p0, node(p1, ... node(p[m-1], p[m])))`.
    pub fn root<H: TreeHasher + ?Sized>(&self, hasher: &H) -> Hash {
        let mut peaks = self.peaks.iter().rev();
        let Some(last) = peaks.next() else {
            return hasher.empty_root();
        };
        peaks.fold(*last, |acc, peak| hasher.node_hash(peak, &acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Rfc6962Hasher;
    use proptest::prelude::*;

    /// Recursive reference from RFC 6962 section 2.1.
    fn reference_root(h: &Rfc6962Hasher, leaves: &[Hash]) -> Hash {
        match leaves.len() {
            0 => h.empty_root(),
            1 => leaves[0],
            n => {
                // Largest power of two strictly below n.
                let mut k = 1;
                while k * 2 < n {
                    k *= 2;
                }
                h.node_hash(
                    &reference_root(h, &leaves[..k]),
                    &reference_root(h, &leaves[k..]),
                )
            }
        }
    }

    fn leaves(n: usize) -> Vec<Hash> {
        (0..n)
            .map(|i| Rfc6962Hasher.leaf_hash(&(i as u64).to_be_bytes()))
            .collect()
    }

    #[test]
    fn test_empty_range_has_empty_root() {
        let h = Rfc6962Hasher;
        assert_eq!(CompactRange::new().root(&h), h.empty_root());
    }

    #[test]
    fn test_peaks_track_set_bits() {
        let h = Rfc6962Hasher;
        let mut range = CompactRange::new();
        for (i, leaf) in leaves(37).into_iter().enumerate() {
            range.append(&h, leaf);
            let size = (i + 1) as u64;
            assert_eq!(range.size(), size);
            assert_eq!(range.peaks().len(), size.count_ones() as usize);
        }
    }

    #[test]
    fn test_three_leaves() {
        let h = Rfc6962Hasher;
        let l = leaves(3);
        let range = CompactRange::from_leaves(&h, l.clone());
        let expected = h.node_hash(&h.node_hash(&l[0], &l[1]), &l[2]);
        assert_eq!(range.root(&h), expected);
    }

    #[test]
    fn test_matches_reference_for_small_trees() {
        let h = Rfc6962Hasher;
        for n in 0..70 {
            let l = leaves(n);
            let range = CompactRange::from_leaves(&h, l.clone());
            assert_eq!(range.root(&h), reference_root(&h, &l), "size {}", n);
        }
    }

    #[test]
    fn test_from_parts_rejects_wrong_peak_count() {
        let peaks = vec![Hash::from_bytes([1; 32])];
        assert!(CompactRange::from_parts(3, peaks.clone()).is_err());
        assert!(CompactRange::from_parts(4, peaks).is_ok());
    }

    proptest! {
        #[test]
        fn root_is_independent_of_batching(n in 0usize..200, cut in 0usize..200) {
            let h = Rfc6962Hasher;
            let l = leaves(n);
            let cut = cut.min(n);

            let whole = CompactRange::from_leaves(&h, l.clone());

            let mut split = CompactRange::from_leaves(&h, l[..cut].to_vec());
            let persisted = CompactRange::from_parts(split.size(), split.peaks().to_vec()).unwrap();
            split = persisted;
            for leaf in &l[cut..] {
                split.append(&h, *leaf);
            }

            prop_assert_eq!(whole.root(&h), split.root(&h));
            prop_assert_eq!(whole, split);
        }
    }
}
