//! Whitelist error taxonomy

use auction_core::{format_hash, ParseError};
use auction_merkle::MerkleError;
use thiserror::Error;

/// Errors surfaced by the store and its collaborators. All are recoverable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WhitelistError {
    /// No addresses to build a tree from
    #[error("cannot build a whitelist root from an empty address list")]
    EmptyInput,

    /// Address (or leaf) is not in the confirmed whitelist
    #[error("not whitelisted: {0}")]
    NotFound(String),

    /// Root submission rejected, reverted or timed out
    #[error("publish failed: {0}")]
    PublishFailure(String),

    /// Content store or local cache unreachable
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),

    /// Malformed address input
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// `initialize` was already called
    #[error("whitelist store already initialized")]
    AlreadyInitialized,

    /// Mutation attempted before `initialize`
    #[error("whitelist store not initialized")]
    NotInitialized,

    /// Contract read failed
    #[error("query failed: {0}")]
    Query(String),
}

impl WhitelistError {
    pub(crate) fn publish(err: impl std::fmt::Display) -> Self {
        Self::PublishFailure(err.to_string())
    }

    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        Self::PersistenceFailure(err.to_string())
    }

    pub(crate) fn query(err: impl std::fmt::Display) -> Self {
        Self::Query(err.to_string())
    }
}

impl From<MerkleError> for WhitelistError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::EmptyInput => Self::EmptyInput,
            MerkleError::NotFound(leaf) => Self::NotFound(format!("leaf {}", format_hash(&leaf))),
        }
    }
}

impl From<ParseError> for WhitelistError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidAddress(input) => Self::InvalidAddress(input),
            other => Self::Query(other.to_string()),
        }
    }
}

/// Result alias for this crate
pub type Result<T, E = WhitelistError> = std::result::Result<T, E>;
