//! Auction query descriptors and their dispatcher

use async_trait::async_trait;
use auction_bindings::{self as bindings, CallRequest};
use auction_core::{Address, Auction, AuctionId, Bid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, WhitelistError};
use crate::rpc::RpcClient;

/// What a view wants fetched
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "arg", rename_all = "camelCase")]
pub enum AuctionQuery {
    /// Nothing
    #[default]
    NoFetch,
    /// One auction by id
    FetchAuction(AuctionId),
    /// Every auction
    FetchAuctions,
    /// Bids placed by an account
    FetchBids(Address),
}

/// Result of a dispatched query, one variant per query kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    /// `NoFetch`
    Nothing,
    /// `FetchAuction`
    Auction(Auction),
    /// `FetchAuctions`
    Auctions(Vec<Auction>),
    /// `FetchBids`
    Bids(Vec<Bid>),
}

/// Read access to the auction contract
#[async_trait]
pub trait AuctionReader: Send + Sync {
    /// `getAuction(id)`
    async fn auction(&self, id: AuctionId) -> Result<Auction>;

    /// `getAuctions()`
    async fn auctions(&self) -> Result<Vec<Auction>>;

    /// `getMyBids()` as seen by `account`
    async fn bids(&self, account: &Address) -> Result<Vec<Bid>>;
}

/// Interprets [`AuctionQuery`] values against one reader
#[derive(Clone)]
pub struct FetchDispatcher {
    reader: Arc<dyn AuctionReader>,
}

impl std::fmt::Debug for FetchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchDispatcher").finish_non_exhaustive()
    }
}

impl FetchDispatcher {
    /// Dispatcher over `reader`
    pub fn new(reader: Arc<dyn AuctionReader>) -> Self {
        Self { reader }
    }

    /// Run `query`
    pub async fn dispatch(&self, query: &AuctionQuery) -> Result<QueryResult> {
        debug!(?query, "Dispatching auction query");
        Ok(match query {
            AuctionQuery::NoFetch => QueryResult::Nothing,
            AuctionQuery::FetchAuction(id) => QueryResult::Auction(self.reader.auction(*id).await?),
            AuctionQuery::FetchAuctions => QueryResult::Auctions(self.reader.auctions().await?),
            AuctionQuery::FetchBids(account) => QueryResult::Bids(self.reader.bids(account).await?),
        })
    }
}

/// Auction contract over JSON-RPC `eth_call`
#[derive(Clone, Debug)]
pub struct RpcAuctionReader {
    client: RpcClient,
    contract: Address,
}

impl RpcAuctionReader {
    /// Reader for the auction contract at `contract`
    pub fn new(client: RpcClient, contract: Address) -> Self {
        Self { client, contract }
    }

    async fn call(&self, from: Option<Address>, calldata: Vec<u8>) -> Result<Vec<u8>> {
        let request = CallRequest { from, to: self.contract, data: bindings::to_hex_data(&calldata) };
        self.client.eth_call(&request).await.map_err(WhitelistError::query)
    }
}

#[async_trait]
impl AuctionReader for RpcAuctionReader {
    async fn auction(&self, id: AuctionId) -> Result<Auction> {
        let data = self.call(None, bindings::get_auction(id)).await?;
        bindings::decode_auction(&data).map_err(WhitelistError::query)
    }

    async fn auctions(&self) -> Result<Vec<Auction>> {
        let data = self.call(None, bindings::get_auctions()).await?;
        bindings::decode_auctions(&data).map_err(WhitelistError::query)
    }

    async fn bids(&self, account: &Address) -> Result<Vec<Bid>> {
        let data = self.call(Some(*account), bindings::get_my_bids()).await?;
        bindings::decode_bids(&data).map_err(WhitelistError::query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockReader {
        calls: AtomicUsize,
    }

    fn auction(id: AuctionId) -> Auction {
        Auction {
            id,
            nft_contract: Address::new([1; 20]),
            token_id: id,
            seller: Address::new([2; 20]),
            initial_price: 10,
            highest_bidder: Address::ZERO,
            highest_bid_amount: 0,
            end_time: 100,
            finalized: false,
        }
    }

    #[async_trait]
    impl AuctionReader for MockReader {
        async fn auction(&self, id: AuctionId) -> Result<Auction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if id == 404 {
                return Err(WhitelistError::Query("execution reverted".to_string()));
            }
            Ok(auction(id))
        }

        async fn auctions(&self) -> Result<Vec<Auction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![auction(1), auction(2)])
        }

        async fn bids(&self, account: &Address) -> Result<Vec<Bid>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Bid { auction_id: u64::from(account.as_bytes()[0]), bid_amount: 5, end_time: 100 }])
        }
    }

    fn dispatcher() -> (FetchDispatcher, Arc<MockReader>) {
        let reader = Arc::new(MockReader { calls: AtomicUsize::new(0) });
        (FetchDispatcher::new(reader.clone()), reader)
    }

    #[tokio::test]
    async fn test_no_fetch_makes_no_call() {
        let (dispatcher, reader) = dispatcher();
        assert_eq!(dispatcher.dispatch(&AuctionQuery::NoFetch).await, Ok(QueryResult::Nothing));
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dispatch_each_kind() {
        let (dispatcher, reader) = dispatcher();

        assert_eq!(dispatcher.dispatch(&AuctionQuery::FetchAuction(7)).await, Ok(QueryResult::Auction(auction(7))));
        assert!(matches!(
            dispatcher.dispatch(&AuctionQuery::FetchAuctions).await,
            Ok(QueryResult::Auctions(list)) if list.len() == 2
        ));
        assert!(matches!(
            dispatcher.dispatch(&AuctionQuery::FetchBids(Address::new([9; 20]))).await,
            Ok(QueryResult::Bids(bids)) if bids[0].auction_id == 9
        ));
        assert_eq!(reader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_dispatch_error() {
        let (dispatcher, _) = dispatcher();
        assert!(matches!(dispatcher.dispatch(&AuctionQuery::FetchAuction(404)).await, Err(WhitelistError::Query(_))));
    }

    #[test]
    fn test_dispatcher_debug() {
        let (dispatcher, _) = dispatcher();
        assert_eq!(format!("{:?}", dispatcher), "FetchDispatcher { .. }");
    }

    #[test]
    fn test_query_json() {
        let query: AuctionQuery = serde_json::from_str(r#"{"kind":"fetchAuction","arg":3}"#).unwrap();
        assert_eq!(query, AuctionQuery::FetchAuction(3));
        let query: AuctionQuery = serde_json::from_str(r#"{"kind":"noFetch"}"#).unwrap();
        assert_eq!(query, AuctionQuery::NoFetch);
    }
}
