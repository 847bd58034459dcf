//! Whitelist node
//!
//! A small JSON-RPC service that:
//! - Loads the confirmed whitelist at startup, retrying until it succeeds
//! - Serves membership proofs and mint calldata
//! - Applies admin edits (add/remove, set, publish)
//! - Forwards auction reads through the query dispatcher and builds bid and
//!   finalize transactions

use anyhow::Result;
use auction_bindings::{self as bindings, TransactionRequest};
use auction_core::format::parse_price_in_wei;
use auction_core::{
    format_hash, Address, Auction, AuctionId, AuctionView, BidView, SupportedToken, Whitelist,
};
use auction_host::{
    AuctionQuery, Config, FetchDispatcher, QueryResult, RpcAuctionReader, RpcClient, WhitelistError,
    WhitelistStore,
};
use axum::{
    extract::State as AxumState,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Delay between whitelist load attempts after a failed startup load
const LOAD_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Shared node state
struct NodeState {
    store: Arc<WhitelistStore>,
    /// Absent when no auction contract is configured
    dispatcher: Option<FetchDispatcher>,
    nft_contract: Option<Address>,
    auction_contract: Option<Address>,
    /// ERC-20 mint currencies
    tokens: Vec<SupportedToken>,
}

impl NodeState {
    fn token(&self, symbol: &str) -> Result<Address, RpcError> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .map(|t| t.token)
            .ok_or_else(|| RpcError::invalid_params(format!("unsupported token: {}", symbol)))
    }
}

type SharedState = Arc<NodeState>;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting whitelist node...");

    let config = Config::from_env();
    info!("  RPC URL:        {}", config.rpc_url);
    info!("  Registry mode:  {:?}", config.registry_mode);
    info!("  Content mode:   {:?}", config.content_mode);
    if let Some(dir) = &config.cache_dir {
        info!("  Cache dir:      {}", dir.display());
    }

    let store = Arc::new(WhitelistStore::from_config(&config)?);
    match store.initialize().await {
        Ok(state) => info!(?state, "Whitelist store initialized"),
        Err(e) => {
            warn!("Whitelist load failed, retrying every {:?}: {}", LOAD_RETRY_INTERVAL, e);
            tokio::spawn(retry_load(store.clone()));
        }
    }

    let mut notifications = store.subscribe();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            info!(root = %notification.root, status = ?notification.status, "Publish notification");
        }
    });

    let dispatcher = config.auction_contract.map(|contract| {
        let client = RpcClient::new(&config.rpc_url);
        FetchDispatcher::new(Arc::new(RpcAuctionReader::new(client, contract)))
    });

    let tokens = config
        .usdc_contract
        .map(|token| SupportedToken { symbol: "USDC".to_string(), token })
        .into_iter()
        .collect();

    let state = Arc::new(NodeState {
        store,
        dispatcher,
        nft_contract: config.nft_contract,
        auction_contract: config.auction_contract,
        tokens,
    });

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/", post(rpc_handler))
        .with_state(state);

    info!("RPC server listening on {}", config.rpc_addr);
    let listener = tokio::net::TcpListener::bind(&config.rpc_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Keep loading until the store accepts a published list
async fn retry_load(store: Arc<WhitelistStore>) {
    loop {
        tokio::time::sleep(LOAD_RETRY_INTERVAL).await;
        match store.initialize().await {
            Ok(state) => {
                info!(?state, "Whitelist store initialized");
                return;
            }
            Err(WhitelistError::AlreadyInitialized) => return,
            Err(e) => warn!("Whitelist load failed: {}", e),
        }
    }
}

/// Health check endpoint
async fn health() -> &'static str {
    "ok"
}

/// JSON-RPC request
#[derive(Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Value,
}

/// JSON-RPC error object
#[derive(Debug, PartialEq, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn method_not_found(method: &str) -> Self {
        Self { code: -32601, message: format!("method not found: {}", method) }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: -32602, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { code: -32603, message: message.into() }
    }

    fn not_configured(what: &str) -> Self {
        Self { code: -32000, message: format!("{} not configured", what) }
    }

    /// Contract rules would revert the transaction
    fn rejected(message: impl Into<String>) -> Self {
        Self { code: -32003, message: message.into() }
    }
}

impl From<WhitelistError> for RpcError {
    fn from(err: WhitelistError) -> Self {
        let code = match err {
            WhitelistError::InvalidAddress(_) => -32602,
            WhitelistError::NotFound(_) => -32004,
            WhitelistError::EmptyInput => -32005,
            WhitelistError::PublishFailure(_) => -32010,
            WhitelistError::PersistenceFailure(_) => -32011,
            _ => -32000,
        };
        Self { code, message: err.to_string() }
    }
}

/// JSON-RPC response
#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Value,
}

/// RPC handler
async fn rpc_handler(AxumState(state): AxumState<SharedState>, Json(req): Json<RpcRequest>) -> Json<RpcResponse> {
    let params = req.params.unwrap_or(Value::Null);
    let (result, error) = match handle(&state, &req.method, &params).await {
        Ok(value) => (Some(value), None),
        Err(e) => {
            warn!(method = %req.method, code = e.code, "RPC error: {}", e.message);
            (None, Some(e))
        }
    };

    Json(RpcResponse { jsonrpc: "2.0", result, error, id: req.id })
}

async fn handle(state: &NodeState, method: &str, params: &Value) -> Result<Value, RpcError> {
    let store = &state.store;

    let result = match method {
        "wl_status" => json!(store.status().await),
        "wl_getWhitelist" => json!({
            "current": store.whitelist().await,
            "confirmed": store.confirmed_whitelist().await,
        }),
        "wl_getRoot" => json!(store.confirmed_root().await.as_ref().map(format_hash)),
        "wl_getProof" => {
            let address = address_param(params, 0)?;
            let proof = store.proof(&address).await?;
            json!({
                "address": address,
                "leaf": format_hash(&proof.leaf),
                "proof": proof.to_hex(),
                "root": store.confirmed_root().await.as_ref().map(format_hash),
            })
        }
        "wl_isWhitelisted" => {
            let address = address_param(params, 0)?;
            json!(store.is_whitelisted(&address).await?)
        }
        "wl_getMintCalldata" => {
            let address = address_param(params, 0)?;
            let token = match param(params, 1).and_then(Value::as_str) {
                None => None,
                Some(symbol) if symbol.eq_ignore_ascii_case("eth") => None,
                Some(other) if other.starts_with("0x") => Some(parse_address(other)?),
                Some(symbol) => Some(state.token(symbol)?),
            };
            let calldata = store.mint_calldata(&address, token.as_ref()).await?;
            json!({
                "to": state.nft_contract,
                "data": bindings::to_hex_data(&calldata),
            })
        }
        "wl_getSupportedTokens" => json!(state.tokens),
        "wl_initialize" => json!(store.initialize().await?),
        "wl_setWhitelist" => {
            let whitelist = whitelist_param(params, 0)?;
            store.set_whitelist(whitelist).await?;
            json!(store.status().await)
        }
        "wl_publish" => {
            let whitelist = match param(params, 0) {
                Some(_) => whitelist_param(params, 0)?,
                None => store.whitelist().await,
            };
            json!({ "root": format_hash(&store.publish(whitelist).await?) })
        }
        "wl_addAddress" => {
            let address = address_param(params, 0)?;
            json!({ "root": format_hash(&store.add_address(address).await?) })
        }
        "wl_removeAddress" => {
            let address = address_param(params, 0)?;
            json!({ "root": format_hash(&store.remove_address(&address).await?) })
        }
        "auction_getAuction" => {
            let id = auction_id_param(params, 0)?;
            let viewer = optional_address_param(params, 1)?;
            let auction = fetch_auction(state, id).await?;
            to_json(&AuctionView::new(auction, viewer.as_ref(), now_ms()))?
        }
        "auction_getAuctions" => {
            let viewer = optional_address_param(params, 0)?;
            let now = now_ms();
            let auctions = match query(state, AuctionQuery::FetchAuctions).await? {
                QueryResult::Auctions(auctions) => auctions,
                other => return Err(unexpected(&other)),
            };
            let views: Vec<_> = auctions.into_iter().map(|a| AuctionView::new(a, viewer.as_ref(), now)).collect();
            to_json(&views)?
        }
        "auction_getMyBids" => {
            let account = address_param(params, 0)?;
            let now = now_ms();
            let bids = match query(state, AuctionQuery::FetchBids(account)).await? {
                QueryResult::Bids(bids) => bids,
                other => return Err(unexpected(&other)),
            };
            let views: Vec<_> = bids.into_iter().map(|b| BidView::new(b, now)).collect();
            to_json(&views)?
        }
        "auction_getBidCalldata" => {
            let id = auction_id_param(params, 0)?;
            let amount = param(params, 1)
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::invalid_params("expected bid amount in ether at position 1"))?;
            let value = parse_price_in_wei(amount).map_err(|e| RpcError::invalid_params(e.to_string()))?;
            if value == 0 {
                return Err(RpcError::invalid_params("bid amount must be positive"));
            }
            let bidder = address_param(params, 2)?;

            let auction = fetch_auction(state, id).await?;
            if !auction.accepts_bid_from(&bidder, now_ms() / 1_000) {
                return Err(RpcError::rejected(format!("auction {} does not accept bids from {}", id, bidder)));
            }
            to_json(&TransactionRequest {
                from: bidder,
                to: auction_contract(state)?,
                data: bindings::to_hex_data(&bindings::bid(id)),
                gas: None,
                value: Some(format!("0x{:x}", value)),
            })?
        }
        "auction_getFinalizeCalldata" => {
            let id = auction_id_param(params, 0)?;
            let caller = address_param(params, 1)?;

            let auction = fetch_auction(state, id).await?;
            if !auction.can_finalize(&caller, now_ms() / 1_000) {
                return Err(RpcError::rejected(format!("auction {} cannot be finalized by {}", id, caller)));
            }
            to_json(&TransactionRequest {
                from: caller,
                to: auction_contract(state)?,
                data: bindings::to_hex_data(&bindings::finalize_auction(id)),
                gas: None,
                value: None,
            })?
        }
        _ => return Err(RpcError::method_not_found(method)),
    };

    Ok(result)
}

async fn query(state: &NodeState, query: AuctionQuery) -> Result<QueryResult, RpcError> {
    let dispatcher = state
        .dispatcher
        .as_ref()
        .ok_or_else(|| RpcError::not_configured("AUCTION_CONTRACT_ADDRESS"))?;
    Ok(dispatcher.dispatch(&query).await?)
}

async fn fetch_auction(state: &NodeState, id: AuctionId) -> Result<Auction, RpcError> {
    match query(state, AuctionQuery::FetchAuction(id)).await? {
        QueryResult::Auction(auction) => Ok(auction),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(result: &QueryResult) -> RpcError {
    RpcError::internal(format!("unexpected query result: {:?}", result))
}

fn auction_contract(state: &NodeState) -> Result<Address, RpcError> {
    state.auction_contract.ok_or_else(|| RpcError::not_configured("AUCTION_CONTRACT_ADDRESS"))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal(e.to_string()))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

fn param(params: &Value, index: usize) -> Option<&Value> {
    params.as_array().and_then(|arr| arr.get(index))
}

fn parse_address(s: &str) -> Result<Address, RpcError> {
    s.parse::<Address>().map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn auction_id_param(params: &Value, index: usize) -> Result<AuctionId, RpcError> {
    param(params, index)
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::invalid_params(format!("expected auction id at position {}", index)))
}

fn optional_address_param(params: &Value, index: usize) -> Result<Option<Address>, RpcError> {
    match param(params, index) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => address_param(params, index).map(Some),
    }
}

fn address_param(params: &Value, index: usize) -> Result<Address, RpcError> {
    let s = param(params, index)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params(format!("expected address at position {}", index)))?;
    parse_address(s)
}

fn whitelist_param(params: &Value, index: usize) -> Result<Whitelist, RpcError> {
    let value = param(params, index)
        .cloned()
        .ok_or_else(|| RpcError::invalid_params(format!("expected address list at position {}", index)))?;
    serde_json::from_value(value).map_err(|e| RpcError::invalid_params(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use auction_core::Bid;
    use auction_host::{AuctionReader, MemoryContentStore, MemoryRootRegistry};

    const AAA: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BBB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const CCC: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    async fn node() -> NodeState {
        let store = WhitelistStore::new(Arc::new(MemoryContentStore::new()), Arc::new(MemoryRootRegistry::new()));
        store.initialize().await.unwrap();
        NodeState {
            store: Arc::new(store),
            dispatcher: None,
            nft_contract: None,
            auction_contract: None,
            tokens: Vec::new(),
        }
    }

    const SELLER: Address = Address::new([0x5e; 20]);
    const AUCTION_CONTRACT: Address = Address::new([0xac; 20]);
    // Far enough out to stay open for the lifetime of these tests
    const OPEN_UNTIL: u64 = 4_000_000_000;

    /// Auction 1 is open, auction 2 has ended with a bid
    struct FixedReader;

    fn fixed_auction(id: AuctionId) -> Auction {
        Auction {
            id,
            nft_contract: Address::new([0x0f; 20]),
            token_id: id,
            seller: SELLER,
            initial_price: 1_000_000_000_000_000_000,
            highest_bidder: if id == 1 { Address::ZERO } else { Address::new([0xbb; 20]) },
            highest_bid_amount: if id == 1 { 0 } else { 2_500_000_000_000_000_000 },
            end_time: if id == 1 { OPEN_UNTIL } else { 1 },
            finalized: false,
        }
    }

    #[async_trait]
    impl AuctionReader for FixedReader {
        async fn auction(&self, id: AuctionId) -> auction_host::Result<Auction> {
            match id {
                1 | 2 => Ok(fixed_auction(id)),
                _ => Err(WhitelistError::Query("execution reverted".to_string())),
            }
        }

        async fn auctions(&self) -> auction_host::Result<Vec<Auction>> {
            Ok(vec![fixed_auction(1), fixed_auction(2)])
        }

        async fn bids(&self, _account: &Address) -> auction_host::Result<Vec<Bid>> {
            Ok(vec![Bid { auction_id: 2, bid_amount: 2_500_000_000_000_000_000, end_time: 1 }])
        }
    }

    async fn auction_node() -> NodeState {
        let mut state = node().await;
        state.dispatcher = Some(FetchDispatcher::new(Arc::new(FixedReader)));
        state.auction_contract = Some(AUCTION_CONTRACT);
        state
    }

    #[tokio::test]
    async fn test_admin_and_membership_flow() {
        let state = node().await;

        handle(&state, "wl_addAddress", &json!([AAA])).await.unwrap();
        let added = handle(&state, "wl_addAddress", &json!([BBB])).await.unwrap();
        let root = handle(&state, "wl_getRoot", &json!([])).await.unwrap();
        assert_eq!(added["root"], root);

        assert_eq!(handle(&state, "wl_isWhitelisted", &json!([AAA])).await.unwrap(), json!(true));
        assert_eq!(handle(&state, "wl_isWhitelisted", &json!([CCC])).await.unwrap(), json!(false));

        let proof = handle(&state, "wl_getProof", &json!([AAA])).await.unwrap();
        assert_eq!(proof["proof"].as_array().unwrap().len(), 1);
        assert_eq!(proof["root"], root);

        let err = handle(&state, "wl_getProof", &json!([CCC])).await.unwrap_err();
        assert_eq!(err.code, -32004);
    }

    #[tokio::test]
    async fn test_set_then_publish() {
        let state = node().await;

        let status = handle(&state, "wl_setWhitelist", &json!([[AAA, BBB]])).await.unwrap();
        assert_eq!(status["dirty"], json!(true));
        assert_eq!(handle(&state, "wl_getRoot", &json!([])).await.unwrap(), Value::Null);

        handle(&state, "wl_publish", &json!([])).await.unwrap();
        let status = handle(&state, "wl_status", &json!([])).await.unwrap();
        assert_eq!(status["dirty"], json!(false));
        assert_eq!(status["confirmedEntries"], json!(2));
    }

    #[tokio::test]
    async fn test_mint_calldata() {
        let state = node().await;
        handle(&state, "wl_addAddress", &json!([AAA])).await.unwrap();

        let result = handle(&state, "wl_getMintCalldata", &json!([AAA])).await.unwrap();
        let expected = bindings::to_hex_data(&bindings::mint_nft(&[]));
        assert_eq!(result["data"], json!(expected));

        let err = handle(&state, "wl_getMintCalldata", &json!([AAA, "usdc"])).await.unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_supported_token_mint() {
        let mut state = node().await;
        let usdc = Address::new([0x0c; 20]);
        state.tokens.push(SupportedToken { symbol: "USDC".to_string(), token: usdc });
        handle(&state, "wl_addAddress", &json!([AAA])).await.unwrap();

        let tokens = handle(&state, "wl_getSupportedTokens", &json!([])).await.unwrap();
        assert_eq!(tokens, json!([{ "symbol": "USDC", "token": usdc.to_string() }]));

        let result = handle(&state, "wl_getMintCalldata", &json!([AAA, "usdc"])).await.unwrap();
        let expected = bindings::to_hex_data(&bindings::mint_nft_with_token(&usdc, &[]));
        assert_eq!(result["data"], json!(expected));
        assert_eq!(handle(&state, "wl_getMintCalldata", &json!([AAA, "dai"])).await.unwrap_err().code, -32602);
    }

    #[tokio::test]
    async fn test_auction_views() {
        let state = auction_node().await;

        let open = handle(&state, "auction_getAuction", &json!([1, BBB])).await.unwrap();
        assert_eq!(open["initialPriceEth"], "1.0000");
        assert_eq!(open["highestBidEth"], Value::Null);
        assert_eq!(open["hasEnded"], false);
        assert_eq!(open["canBid"], true);
        assert_eq!(open["sellerShort"], "0x5e5e...5e5e");

        let all = handle(&state, "auction_getAuctions", &json!([])).await.unwrap();
        let ended = &all.as_array().unwrap()[1];
        assert_eq!(ended["highestBidEth"], "2.5000");
        assert_eq!(ended["timeLeft"], "Ended");
        assert!(ended.get("canFinalize").is_none());

        let bids = handle(&state, "auction_getMyBids", &json!([BBB])).await.unwrap();
        assert_eq!(bids[0]["bidAmountEth"], "2.5000");
        assert_eq!(bids[0]["active"], false);

        assert_eq!(handle(&state, "auction_getAuction", &json!([9])).await.unwrap_err().code, -32000);
    }

    #[tokio::test]
    async fn test_bid_calldata() {
        let state = auction_node().await;
        let bidder: Address = BBB.parse().unwrap();

        let tx = handle(&state, "auction_getBidCalldata", &json!([1, "1.5", BBB])).await.unwrap();
        assert_eq!(tx["to"], AUCTION_CONTRACT.to_string());
        assert_eq!(tx["from"], bidder.to_string());
        assert_eq!(tx["data"], bindings::to_hex_data(&bindings::bid(1)));
        assert_eq!(tx["value"], "0x14d1120d7b160000");

        let seller = SELLER.to_string();
        assert_eq!(handle(&state, "auction_getBidCalldata", &json!([1, "1", seller])).await.unwrap_err().code, -32003);
        assert_eq!(handle(&state, "auction_getBidCalldata", &json!([2, "3", BBB])).await.unwrap_err().code, -32003);
        assert_eq!(handle(&state, "auction_getBidCalldata", &json!([1, "0", BBB])).await.unwrap_err().code, -32602);
        assert_eq!(handle(&state, "auction_getBidCalldata", &json!([1, "x", BBB])).await.unwrap_err().code, -32602);
    }

    #[tokio::test]
    async fn test_finalize_calldata() {
        let state = auction_node().await;
        let seller = SELLER.to_string();

        let tx = handle(&state, "auction_getFinalizeCalldata", &json!([2, seller])).await.unwrap();
        assert_eq!(tx["data"], bindings::to_hex_data(&bindings::finalize_auction(2)));
        assert!(tx.get("value").is_none());

        assert_eq!(handle(&state, "auction_getFinalizeCalldata", &json!([1, seller])).await.unwrap_err().code, -32003);
        assert_eq!(handle(&state, "auction_getFinalizeCalldata", &json!([2, BBB])).await.unwrap_err().code, -32003);
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let state = node().await;
        assert_eq!(handle(&state, "wl_nope", &Value::Null).await.unwrap_err().code, -32601);
        assert_eq!(handle(&state, "wl_isWhitelisted", &json!(["0x12"])).await.unwrap_err().code, -32602);
        assert_eq!(handle(&state, "wl_removeAddress", &json!([AAA])).await.unwrap_err().code, -32004);
        assert_eq!(handle(&state, "auction_getAuctions", &json!([])).await.unwrap_err().code, -32000);
        assert_eq!(handle(&state, "wl_initialize", &json!([])).await.unwrap_err().code, -32000);
    }
}
