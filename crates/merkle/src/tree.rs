//! Binary Merkle tree over whitelist leaves

use serde::{Deserialize, Serialize};

use crate::{error::MerkleError, hasher::Keccak256Hasher, proof::MerkleProof, Hash};

/// What happens to the last node of a level with an odd node count
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddNodePolicy {
    /// Carry the node up to the next level unchanged (merkletreejs default)
    #[default]
    Promote,
    /// Pair the node with itself
    Duplicate,
}

/// Tree construction options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOptions {
    /// Sort leaves by digest before pairing. Makes the root a function of
    /// the leaf multiset rather than of the input order.
    pub sort_leaves: bool,
    /// Odd node handling
    pub odd_node: OddNodePolicy,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self { sort_leaves: true, odd_node: OddNodePolicy::Promote }
    }
}

/// Immutable Merkle tree.
///
/// `layers[0]` holds the leaves, the last layer holds only the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<Hash>>,
    options: TreeOptions,
}

impl MerkleTree {
    /// Hash every item into a leaf and build with default options
    pub fn build<I>(items: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        Self::build_with(items, TreeOptions::default())
    }

    /// Hash every item into a leaf and build with the given options
    pub fn build_with<I>(items: I, options: TreeOptions) -> Result<Self, MerkleError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let leaves = items.into_iter().map(|item| Keccak256Hasher::hash_leaf(item.as_ref())).collect();
        Self::from_leaves(leaves, options)
    }

    /// Build from precomputed leaf digests. Duplicate leaves are kept.
    pub fn from_leaves(mut leaves: Vec<Hash>, options: TreeOptions) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        if options.sort_leaves {
            leaves.sort_unstable();
        }

        let mut layers = vec![leaves];
        loop {
            let current = &layers[layers.len() - 1];
            if current.len() == 1 {
                break;
            }
            let next = Self::next_layer(current, options.odd_node);
            layers.push(next);
        }

        Ok(Self { layers, options })
    }

    /// Combine one level into the next
    fn next_layer(nodes: &[Hash], odd_node: OddNodePolicy) -> Vec<Hash> {
        nodes
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                match (pair.get(1), odd_node) {
                    (Some(right), _) => Keccak256Hasher::hash_sorted_pair(left, right),
                    (None, OddNodePolicy::Promote) => *left,
                    (None, OddNodePolicy::Duplicate) => Keccak256Hasher::hash_sorted_pair(left, left),
                }
            })
            .collect()
    }

    /// Get the root hash
    pub fn root(&self) -> Hash {
        self.layers[self.layers.len() - 1][0]
    }

    /// Leaf digests in tree order
    pub fn leaves(&self) -> &[Hash] {
        &self.layers[0]
    }

    /// All layers, leaves first
    pub fn layers(&self) -> &[Vec<Hash>] {
        &self.layers
    }

    /// Number of levels above the leaves
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    /// Always false: an empty tree cannot be built
    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// Options the tree was built with
    pub fn options(&self) -> TreeOptions {
        self.options
    }

    /// Whether `leaf` is one of the tree's leaves
    pub fn contains_leaf(&self, leaf: &Hash) -> bool {
        self.layers[0].contains(leaf)
    }

    /// Generate a proof for an item (hashed into its leaf first)
    pub fn proof(&self, item: impl AsRef<[u8]>) -> Result<MerkleProof, MerkleError> {
        self.proof_for_leaf(&Keccak256Hasher::hash_leaf(item.as_ref()))
    }

    /// Generate a proof for a leaf digest. Duplicated leaves resolve to the
    /// first occurrence.
    pub fn proof_for_leaf(&self, leaf: &Hash) -> Result<MerkleProof, MerkleError> {
        let mut index = self.layers[0]
            .iter()
            .position(|candidate| candidate == leaf)
            .ok_or(MerkleError::NotFound(*leaf))?;

        let mut siblings = Vec::with_capacity(self.depth());
        for layer in &self.layers[..self.layers.len() - 1] {
            match layer.get(index ^ 1) {
                Some(sibling) => siblings.push(*sibling),
                // Odd tail: promoted nodes have no sibling at this level
                None => {
                    if self.options.odd_node == OddNodePolicy::Duplicate {
                        siblings.push(layer[index]);
                    }
                }
            }
            index /= 2;
        }

        Ok(MerkleProof { leaf: *leaf, siblings })
    }
}
