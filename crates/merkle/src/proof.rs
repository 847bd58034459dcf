//! Membership proof and verification

use serde::{Deserialize, Serialize};

use crate::{hasher::Keccak256Hasher, Hash};

/// Merkle membership proof
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven
    pub leaf: Hash,
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Verify this proof against a root hash
    pub fn verify(&self, root: &Hash) -> bool {
        verify(root, &self.leaf, &self.siblings)
    }

    /// Compute root from proof
    pub fn compute_root(&self) -> Hash {
        compute_root(&self.leaf, &self.siblings)
    }

    /// Number of sibling hashes
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    /// True for a single-leaf tree, where the leaf is the root
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Siblings as `0x`-prefixed hex strings, the form contracts take `bytes32[]` in
    pub fn to_hex(&self) -> Vec<String> {
        self.siblings.iter().map(|s| format!("0x{}", hex::encode(s))).collect()
    }
}

/// Fold `leaf` with every sibling using the sorted-pair combinator
pub fn compute_root(leaf: &Hash, proof: &[Hash]) -> Hash {
    proof
        .iter()
        .fold(*leaf, |acc, sibling| Keccak256Hasher::hash_sorted_pair(&acc, sibling))
}

/// Check that `proof` links `leaf` to `root`.
///
/// Same recomputation as OpenZeppelin's `MerkleProof.verify`, so a proof
/// accepted here is accepted on-chain for the same root.
pub fn verify(root: &Hash, leaf: &Hash, proof: &[Hash]) -> bool {
    compute_root(leaf, proof) == *root
}
