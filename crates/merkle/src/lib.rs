//! Merkle tree for whitelist membership proofs
//!
//! Addresses are hashed into leaves and combined pairwise with the smaller
//! digest first, so a proof is just the list of sibling digests and can be
//! checked by the on-chain verifier without position bits.
//! Key features:
//! - Keccak256 throughout, bit compatible with Solidity verifiers
//! - Canonical leaf ordering: the root depends on the address set only
//! - Odd levels follow the merkletreejs convention (promote) by default

mod error;
mod hasher;
mod proof;
mod tree;

pub use error::MerkleError;
pub use hasher::Keccak256Hasher;
pub use proof::{compute_root, verify, MerkleProof};
pub use tree::{MerkleTree, OddNodePolicy, TreeOptions};

/// 32-byte digest
pub type Hash = [u8; 32];

/// Digest width in bytes
pub const HASH_LEN: usize = 32;
