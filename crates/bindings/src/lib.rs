//! Contract bindings
//!
//! Call encoding and return decoding for the NFT (whitelist, mint) and
//! auction contracts. The interface is written by hand against the deployed
//! ABIs; only the functions this client calls are covered.

pub mod abi;

use auction_core::{Address, Auction, AuctionId, Bid, Hash};
use serde::{Deserialize, Serialize};

pub use abi::{selector, AbiError};

use abi::{
    decode_address, decode_bool, decode_hash, decode_static_array, decode_u128, decode_u64,
    encode_bytes32_array, encode_u64, WORD,
};

/// Function signatures
pub mod signatures {
    /// Admin: publish a new whitelist root
    pub const UPDATE_WHITELIST_ROOT: &str = "updateWhitelistMerkleRoot(bytes32)";
    /// Current whitelist root
    pub const WHITELIST_ROOT: &str = "whitelistMerkleRoot()";
    /// Mint paying in ETH
    pub const MINT_NFT: &str = "mintNFT(bytes32[])";
    /// Mint paying in an ERC-20
    pub const MINT_NFT_WITH_TOKEN: &str = "mintNFTWithToken(address,bytes32[])";
    /// Single auction by id
    pub const GET_AUCTION: &str = "getAuction(uint256)";
    /// All auctions
    pub const GET_AUCTIONS: &str = "getAuctions()";
    /// Bids of `msg.sender`
    pub const GET_MY_BIDS: &str = "getMyBids()";
    /// Bid on an auction (payable)
    pub const BID: &str = "bid(uint256)";
    /// Settle an ended auction
    pub const FINALIZE_AUCTION: &str = "finalizeAuction(uint256)";
}

/// Words per encoded `Auction` tuple
pub const AUCTION_WORDS: usize = 9;

/// Words per encoded `Bid` tuple
pub const BID_WORDS: usize = 3;

/// `eth_sendTransaction` request object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Sender (an unlocked node account)
    pub from: Address,
    /// Contract
    pub to: Address,
    /// `0x`-prefixed calldata
    pub data: String,
    /// `0x`-prefixed gas limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    /// `0x`-prefixed wei value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// `eth_call` request object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Caller; matters for `msg.sender`-scoped views
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Contract
    pub to: Address,
    /// `0x`-prefixed calldata
    pub data: String,
}

/// Render calldata as `0x`-prefixed hex
pub fn to_hex_data(calldata: &[u8]) -> String {
    format!("0x{}", hex::encode(calldata))
}

fn call_without_args(signature: &str) -> Vec<u8> {
    selector(signature).to_vec()
}

fn call_with_word(signature: &str, word: &[u8; WORD]) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(4 + WORD);
    calldata.extend_from_slice(&selector(signature));
    calldata.extend_from_slice(word);
    calldata
}

/// `updateWhitelistMerkleRoot(bytes32)`
pub fn update_whitelist_root(root: &Hash) -> Vec<u8> {
    call_with_word(signatures::UPDATE_WHITELIST_ROOT, root)
}

/// `whitelistMerkleRoot()`
pub fn whitelist_root() -> Vec<u8> {
    call_without_args(signatures::WHITELIST_ROOT)
}

/// `mintNFT(bytes32[])`
pub fn mint_nft(proof: &[Hash]) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(4 + WORD * (2 + proof.len()));
    calldata.extend_from_slice(&selector(signatures::MINT_NFT));
    calldata.extend_from_slice(&encode_u64(WORD as u64)); // offset of the array
    encode_bytes32_array(&mut calldata, proof);
    calldata
}

/// `mintNFTWithToken(address,bytes32[])`
pub fn mint_nft_with_token(token: &Address, proof: &[Hash]) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(4 + WORD * (3 + proof.len()));
    calldata.extend_from_slice(&selector(signatures::MINT_NFT_WITH_TOKEN));
    calldata.extend_from_slice(&token.to_word());
    calldata.extend_from_slice(&encode_u64(2 * WORD as u64));
    encode_bytes32_array(&mut calldata, proof);
    calldata
}

/// `getAuction(uint256)`
pub fn get_auction(id: AuctionId) -> Vec<u8> {
    call_with_word(signatures::GET_AUCTION, &encode_u64(id))
}

/// `getAuctions()`
pub fn get_auctions() -> Vec<u8> {
    call_without_args(signatures::GET_AUCTIONS)
}

/// `getMyBids()`
pub fn get_my_bids() -> Vec<u8> {
    call_without_args(signatures::GET_MY_BIDS)
}

/// `bid(uint256)`
pub fn bid(id: AuctionId) -> Vec<u8> {
    call_with_word(signatures::BID, &encode_u64(id))
}

/// `finalizeAuction(uint256)`
pub fn finalize_auction(id: AuctionId) -> Vec<u8> {
    call_with_word(signatures::FINALIZE_AUCTION, &encode_u64(id))
}

/// Decode the `bytes32` returned by `whitelistMerkleRoot()`
pub fn decode_whitelist_root(data: &[u8]) -> Result<Hash, AbiError> {
    decode_hash(data, 0)
}

/// Decode one `Auction` tuple.
///
/// Field order: id, nftContract, tokenId, seller, initialPrice,
/// highestBidder, highestBidAmount, endTime, finalized.
pub fn decode_auction(data: &[u8]) -> Result<Auction, AbiError> {
    Ok(Auction {
        id: decode_u64(data, 0)?,
        nft_contract: decode_address(data, 1)?,
        token_id: decode_u64(data, 2)?,
        seller: decode_address(data, 3)?,
        initial_price: decode_u128(data, 4)?,
        highest_bidder: decode_address(data, 5)?,
        highest_bid_amount: decode_u128(data, 6)?,
        end_time: decode_u64(data, 7)?,
        finalized: decode_bool(data, 8)?,
    })
}

/// Decode the `Auction[]` returned by `getAuctions()`
pub fn decode_auctions(data: &[u8]) -> Result<Vec<Auction>, AbiError> {
    decode_static_array(data, AUCTION_WORDS)?.into_iter().map(decode_auction).collect()
}

/// Decode one `Bid` tuple (auctionId, bidAmount, endTime)
pub fn decode_bid(data: &[u8]) -> Result<Bid, AbiError> {
    Ok(Bid {
        auction_id: decode_u64(data, 0)?,
        bid_amount: decode_u128(data, 1)?,
        end_time: decode_u64(data, 2)?,
    })
}

/// Decode the `Bid[]` returned by `getMyBids()`
pub fn decode_bids(data: &[u8]) -> Result<Vec<Bid>, AbiError> {
    decode_static_array(data, BID_WORDS)?.into_iter().map(decode_bid).collect()
}
