//! Read-only views of auction contract state

use serde::{Deserialize, Serialize};

use crate::format::{format_address, format_price_in_eth, format_time_difference};
use crate::types::{Address, Amount, AuctionId};

/// Auction as returned by the auction contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    /// Auction id
    pub id: AuctionId,
    /// Collection the auctioned token belongs to
    pub nft_contract: Address,
    /// Auctioned token
    pub token_id: u64,
    /// Account that listed the token
    pub seller: Address,
    /// Reserve price in wei
    pub initial_price: Amount,
    /// Zero address until the first bid
    pub highest_bidder: Address,
    /// Highest bid in wei, zero without bids
    pub highest_bid_amount: Amount,
    /// Unix seconds
    pub end_time: u64,
    /// Set once the seller has settled the auction
    pub finalized: bool,
}

impl Auction {
    /// Whether the bidding window has closed
    pub fn has_ended(&self, now: u64) -> bool {
        self.end_time < now
    }

    /// Whether anyone has bid yet
    pub fn has_bids(&self) -> bool {
        self.highest_bid_amount > 0
    }

    /// Bids are open to everyone except the seller until the end time
    pub fn accepts_bid_from(&self, bidder: &Address, now: u64) -> bool {
        self.end_time > now && self.seller != *bidder
    }

    /// Only the seller finalizes, once, after the end time
    pub fn can_finalize(&self, caller: &Address, now: u64) -> bool {
        self.seller == *caller && !self.finalized && self.has_ended(now)
    }
}

/// A bid placed by the calling account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Auction the bid was placed on
    pub auction_id: AuctionId,
    /// Bid in wei
    pub bid_amount: Amount,
    /// Unix seconds
    pub end_time: u64,
}

impl Bid {
    /// Whether the auction the bid belongs to is still running
    pub fn is_active(&self, now: u64) -> bool {
        self.end_time > now
    }
}

/// ERC-20 token accepted as mint currency
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedToken {
    /// Ticker, e.g. `USDC`
    pub symbol: String,
    /// ERC-20 contract
    pub token: Address,
}

/// Auction with display fields, as seen by an optional viewer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionView {
    /// Contract record
    #[serde(flatten)]
    pub auction: Auction,
    /// Reserve price in ether, four decimals
    pub initial_price_eth: String,
    /// Highest bid in ether, `None` without bids
    pub highest_bid_eth: Option<String>,
    /// Shortened seller address
    pub seller_short: String,
    /// Countdown, `Ended` once closed
    pub time_left: String,
    /// Bidding window closed
    pub has_ended: bool,
    /// Viewer may bid; absent without a viewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_bid: Option<bool>,
    /// Viewer may finalize; absent without a viewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_finalize: Option<bool>,
}

impl AuctionView {
    /// Display view at `now_ms` (unix milliseconds)
    pub fn new(auction: Auction, viewer: Option<&Address>, now_ms: u64) -> Self {
        let now = now_ms / 1_000;
        Self {
            initial_price_eth: format_price_in_eth(auction.initial_price),
            highest_bid_eth: auction.has_bids().then(|| format_price_in_eth(auction.highest_bid_amount)),
            seller_short: format_address(&auction.seller),
            time_left: format_time_difference(auction.end_time, now_ms),
            has_ended: auction.has_ended(now),
            can_bid: viewer.map(|v| auction.accepts_bid_from(v, now)),
            can_finalize: viewer.map(|v| auction.can_finalize(v, now)),
            auction,
        }
    }
}

/// Bid with display fields
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    /// Contract record
    #[serde(flatten)]
    pub bid: Bid,
    /// Bid in ether, four decimals
    pub bid_amount_eth: String,
    /// Countdown, `Ended` once closed
    pub time_left: String,
    /// Auction still running
    pub active: bool,
}

impl BidView {
    /// Display view at `now_ms` (unix milliseconds)
    pub fn new(bid: Bid, now_ms: u64) -> Self {
        Self {
            bid_amount_eth: format_price_in_eth(bid.bid_amount),
            time_left: format_time_difference(bid.end_time, now_ms),
            active: bid.is_active(now_ms / 1_000),
            bid,
        }
    }
}
