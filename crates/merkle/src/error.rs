//! Tree construction and proof errors

use thiserror::Error;

use crate::Hash;

/// Errors returned while building a tree or generating a proof
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// No leaves were supplied; an empty set has no root
    #[error("cannot build a merkle tree from an empty leaf set")]
    EmptyInput,

    /// The requested leaf is not part of the tree
    #[error("leaf 0x{} is not part of the tree", hex::encode(.0))]
    NotFound(Hash),
}
