//! Common types

use std::fmt;
use std::str::FromStr;

use auction_merkle::{Keccak256Hasher, HASH_LEN};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub use auction_merkle::Hash;

/// Amount type (wei)
pub type Amount = u128;

/// Auction identifier
pub type AuctionId = u64;

/// Address length in bytes
pub const ADDRESS_LEN: usize = 20;

/// Hex input errors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not `0x` followed by 40 hex characters
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Not a 32-byte hex digest
    #[error("invalid hash: {0}")]
    InvalidHash(String),
    /// Not a decimal amount
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// 20-byte account address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The zero address
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Wrap raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whitelist leaf: keccak256 of the raw address bytes
    pub fn leaf(&self) -> Hash {
        Keccak256Hasher::hash_leaf(&self.0)
    }

    /// Left-padded 32-byte word, as in ABI encoding
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[32 - ADDRESS_LEN..].copy_from_slice(&self.0);
        word
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .filter(|d| d.len() == ADDRESS_LEN * 2 && d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| ParseError::InvalidAddress(s.to_string()))?;

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Pointer into the content-addressed store (an IPFS CID)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    /// Wrap a content id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse `0x`-prefixed (or bare) hex into a 32-byte hash
pub fn parse_hash(hex_str: &str) -> Result<Hash, ParseError> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|_| ParseError::InvalidHash(hex_str.to_string()))?;
    if bytes.len() != HASH_LEN {
        return Err(ParseError::InvalidHash(hex_str.to_string()));
    }
    let mut hash = [0u8; HASH_LEN];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Render a hash as `0x`-prefixed lowercase hex
pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}
