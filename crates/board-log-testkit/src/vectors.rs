//! Golden test vectors for the Merkle tree.
//!
//! The tree roots are the RFC 6962 reference values: the root of the tree
//! over the first `n` inputs, each input hashed as a leaf.

use board_log_core::{CompactRange, Hash, Rfc6962Hasher, TreeHasher};

/// A golden tree root.
#[derive(Debug, Clone)]
pub struct TreeVector {
    /// Number of leaves from [`LEAF_INPUTS`].
    pub size: usize,
    /// Expected root (hex).
    pub expected_root: &'static str,
}

/// Leaf inputs of the reference tree.
pub const LEAF_INPUTS: [&[u8]; 8] = [
    b"",
    &[0x00],
    &[0x10],
    &[0x20, 0x21],
    &[0x30, 0x31],
    &[0x40, 0x41, 0x42, 0x43],
    &[0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57],
    &[
        0x60, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e,
        0x6f,
    ],
];

/// Root of the empty tree, as it appears in a checkpoint body.
pub const EMPTY_ROOT_BASE64: &str = "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";

/// Get all golden tree vectors.
pub fn tree_vectors() -> Vec<TreeVector> {
    vec![
        TreeVector {
            size: 1,
            expected_root: "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d",
        },
        TreeVector {
            size: 2,
            expected_root: "fac54203e7cc696cf0dfcb42c92a1d9dbaf70ad9e621f4bd8d98662f00e3c125",
        },
        TreeVector {
            size: 3,
            expected_root: "aeb6bcfe274b70a14fb067a5e5578264db0fa9b51af5e0ba159158f329e06e77",
        },
        TreeVector {
            size: 4,
            expected_root: "d37ee418976dd95753c1c73862b9398fa2a2cf9b4ff0fdfe8b30cd95209614b7",
        },
        TreeVector {
            size: 5,
            expected_root: "4e3bbb1f7b478dcfe71fb631631519a3bca12c9aefca1612bfce4c13a86264d4",
        },
        TreeVector {
            size: 6,
            expected_root: "76e67dadbcdf1e10e1b74ddc608abd2f98dfb16fbce75277b5232a127f2087ef",
        },
        TreeVector {
            size: 7,
            expected_root: "ddb89be403809e325750d3d263cd78929c2942b7942a34b77e122c9594a74c8c",
        },
        TreeVector {
            size: 8,
            expected_root: "5dc9da79a70659a9ad559cb701ded9a2ab9d823aad2f4960cfe370eff4604328",
        },
    ]
}

/// Compute the root for a vector with the compact range.
pub fn compute_root(vector: &TreeVector) -> Hash {
    let hasher = Rfc6962Hasher;
    CompactRange::from_leaves(
        &hasher,
        LEAF_INPUTS[..vector.size].iter().map(|data| hasher.leaf_hash(data)),
    )
    .root(&hasher)
}

/// Check every vector, returning `(size, matches, computed hex)`.
pub fn verify_tree_vectors() -> Vec<(usize, bool, String)> {
    tree_vectors()
        .iter()
        .map(|v| {
            let hex = compute_root(v).to_hex();
            (v.size, hex == v.expected_root, hex)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_vectors_match() {
        for (size, matches, computed) in verify_tree_vectors() {
            assert!(matches, "root of {size} leaves was {computed}");
        }
    }

    #[test]
    fn test_empty_root() {
        assert_eq!(Rfc6962Hasher.empty_root().to_base64(), EMPTY_ROOT_BASE64);
        assert_eq!(CompactRange::new().root(&Rfc6962Hasher).to_base64(), EMPTY_ROOT_BASE64);
    }

    #[test]
    fn test_roots_change_with_every_leaf() {
        let roots: Vec<Hash> = tree_vectors().iter().map(compute_root).collect();
        for pair in roots.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
