//! NFT auction client core types
//!
//! This crate contains the domain values shared between:
//! - The host (whitelist store, contract adapters)
//! - The binaries (JSON-RPC node, proof CLI)

pub mod auction;
pub mod format;
pub mod types;
pub mod whitelist;

pub use auction::{Auction, AuctionView, Bid, BidView, SupportedToken};
pub use types::*;
pub use whitelist::Whitelist;
