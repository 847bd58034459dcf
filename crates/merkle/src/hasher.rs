//! Keccak256 hasher for the whitelist tree

use tiny_keccak::{Hasher, Keccak};

use crate::Hash;

/// Keccak256 hasher
#[derive(Clone, Copy, Debug, Default)]
pub struct Keccak256Hasher;

impl Keccak256Hasher {
    /// Hash a single value
    pub fn hash(data: &[u8]) -> Hash {
        let mut hasher = Keccak::v256();
        hasher.update(data);
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        output
    }

    /// Hash two 32-byte values together, in the given order
    pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
        let mut hasher = Keccak::v256();
        hasher.update(left);
        hasher.update(right);
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        output
    }

    /// Hash two nodes with the smaller digest first.
    ///
    /// The result does not depend on argument order, which is what lets a
    /// proof carry only sibling digests and no left/right flags.
    pub fn hash_sorted_pair(a: &Hash, b: &Hash) -> Hash {
        if a <= b {
            Self::hash_pair(a, b)
        } else {
            Self::hash_pair(b, a)
        }
    }

    /// Hash raw leaf data (an address) into a leaf digest
    pub fn hash_leaf(data: &[u8]) -> Hash {
        Self::hash(data)
    }
}
