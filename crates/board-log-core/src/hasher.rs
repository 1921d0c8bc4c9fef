//! RFC 6962 Merkle tree hashing.
//!
//! Leaves and interior nodes are hashed under distinct one-byte prefixes so
//! that no leaf hash can be replayed as a node hash:
//!
//! - `leaf_hash(d) = SHA-256(0x00 || d)`
//! - `node_hash(l, r) = SHA-256(0x01 || l || r)`
//! - `empty_root() = SHA-256("")`

use sha2::{Digest, Sha256};

use crate::types::Hash;

/// Domain separation prefix for leaf hashes.
pub const LEAF_HASH_PREFIX: u8 = 0x00;

/// Domain separation prefix for interior node hashes.
pub const NODE_HASH_PREFIX: u8 = 0x01;

/// The hashing strategy used to build a log's Merkle tree.
///
/// Implementations must be pure: the same inputs always produce the same
/// output, with no side effects.
pub trait TreeHasher: Send + Sync {
    /// Hash leaf data.
    fn leaf_hash(&self, data: &[u8]) -> Hash;

    /// Hash two child nodes into their parent.
    fn node_hash(&self, left: &Hash, right: &Hash) -> Hash;

    /// The root of a tree with no leaves.
    fn empty_root(&self) -> Hash;
}

/// SHA-256 tree hasher with RFC 6962 domain separation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rfc6962Hasher;

impl Rfc6962Hasher {
    pub const fn new() -> Self {
        Self
    }
}

impl TreeHasher for Rfc6962Hasher {
    fn leaf_hash(&self, data: &[u8]) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([LEAF_HASH_PREFIX]);
        hasher.update(data);
        Hash(hasher.finalize().into())
    }

    fn node_hash(&self, left: &Hash, right: &Hash) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([NODE_HASH_PREFIX]);
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        Hash(hasher.finalize().into())
    }

    fn empty_root(&self) -> Hash {
        Hash(Sha256::digest([]).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root_is_sha256_of_nothing() {
        let root = Rfc6962Hasher.empty_root();
        assert_eq!(
            root.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_leaf_hash_of_empty_input() {
        let leaf = Rfc6962Hasher.leaf_hash(b"");
        assert_eq!(
            leaf.to_hex(),
            "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
        );
    }

    #[test]
    fn test_leaf_and_node_are_domain_separated() {
        let h = Rfc6962Hasher;
        let left = Hash::from_bytes([0x11; 32]);
        let right = Hash::from_bytes([0x22; 32]);

        // Feed the exact bytes of the node preimage (minus prefix) as leaf data.
        let mut concatenated = Vec::with_capacity(64);
        concatenated.extend_from_slice(left.as_bytes());
        concatenated.extend_from_slice(right.as_bytes());

        assert_ne!(h.leaf_hash(&concatenated), h.node_hash(&left, &right));
    }

    #[test]
    fn test_node_hash_is_order_sensitive() {
        let h = Rfc6962Hasher;
        let a = h.leaf_hash(b"a");
        let b = h.leaf_hash(b"b");
        assert_ne!(h.node_hash(&a, &b), h.node_hash(&b, &a));
    }
}
