//! Minimal ABI word encoding and decoding

use auction_core::{Address, Hash};
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// ABI word width
pub const WORD: usize = 32;

/// Return data decoding errors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Fewer bytes than the type needs
    #[error("return data truncated: need {needed} bytes, got {actual}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes available
        actual: usize,
    },
    /// Integer does not fit the target width
    #[error("integer overflow at offset {0}")]
    Overflow(usize),
    /// Word is not a canonical bool
    #[error("invalid bool at offset {0}")]
    InvalidBool(usize),
}

/// First four bytes of keccak256 of a function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    [output[0], output[1], output[2], output[3]]
}

/// Big-endian uint256 word from a u128
pub fn encode_u128(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Big-endian uint256 word from a u64
pub fn encode_u64(value: u64) -> [u8; WORD] {
    encode_u128(u128::from(value))
}

/// Append a dynamic `bytes32[]` tail (length word then elements)
pub fn encode_bytes32_array(out: &mut Vec<u8>, items: &[Hash]) {
    out.extend_from_slice(&encode_u64(items.len() as u64));
    for item in items {
        out.extend_from_slice(item);
    }
}

/// Word at `index` (counted in words from the start of `data`)
pub fn word_at(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index * WORD;
    data.get(start..start + WORD).ok_or(AbiError::Truncated { needed: start + WORD, actual: data.len() })
}

/// Decode a uint256 word into u128, rejecting larger values
pub fn decode_u128(data: &[u8], index: usize) -> Result<u128, AbiError> {
    let word = word_at(data, index)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(index * WORD));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

/// Decode a uint256 word into u64, rejecting larger values
pub fn decode_u64(data: &[u8], index: usize) -> Result<u64, AbiError> {
    u64::try_from(decode_u128(data, index)?).map_err(|_| AbiError::Overflow(index * WORD))
}

/// Decode an address word (low 20 bytes)
pub fn decode_address(data: &[u8], index: usize) -> Result<Address, AbiError> {
    let word = word_at(data, index)?;
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Address::new(bytes))
}

/// Decode a bool word
pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, AbiError> {
    match decode_u128(data, index) {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        _ => Err(AbiError::InvalidBool(index * WORD)),
    }
}

/// Decode a bytes32 word
pub fn decode_hash(data: &[u8], index: usize) -> Result<Hash, AbiError> {
    let word = word_at(data, index)?;
    let mut hash = [0u8; WORD];
    hash.copy_from_slice(word);
    Ok(hash)
}

/// Split a returned dynamic array of static tuples into element slices.
///
/// Layout: offset word, then at the offset a length word followed by
/// `length * words_per_item` words.
pub fn decode_static_array(data: &[u8], words_per_item: usize) -> Result<Vec<&[u8]>, AbiError> {
    let offset = usize::try_from(decode_u64(data, 0)?).map_err(|_| AbiError::Overflow(0))?;
    let tail = data.get(offset..).ok_or(AbiError::Truncated { needed: offset, actual: data.len() })?;
    let len = usize::try_from(decode_u64(tail, 0)?).map_err(|_| AbiError::Overflow(offset))?;

    let item_len = words_per_item * WORD;
    let body = &tail[WORD..];
    let needed = len.checked_mul(item_len).ok_or(AbiError::Overflow(offset))?;
    if body.len() < needed {
        return Err(AbiError::Truncated { needed: offset + WORD + needed, actual: data.len() });
    }
    Ok(body[..needed].chunks(item_len).collect())
}
