//! Published root registry (the on-chain verifier side)

use async_trait::async_trait;
use auction_bindings::{self as bindings, CallRequest, TransactionRequest};
use auction_core::{format_hash, Address, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Result, WhitelistError};
use crate::rpc::RpcClient;

/// Gas limit sent with root updates
pub const ROOT_UPDATE_GAS: &str = "0x100000";

/// Holder of the published whitelist root
#[async_trait]
pub trait RootRegistry: Send + Sync {
    /// Publish `root`; returns once the update is confirmed.
    /// Submitting the root already published is a no-op for verification.
    async fn submit_root(&self, root: &Hash) -> Result<()>;

    /// Currently published root; `None` when never set
    async fn published_root(&self) -> Result<Option<Hash>>;

    /// Check a membership proof against the published root
    async fn verify(&self, leaf: &Hash, proof: &[Hash]) -> Result<bool> {
        Ok(match self.published_root().await? {
            Some(root) => auction_merkle::verify(&root, leaf, proof),
            None => false,
        })
    }
}

/// In-process registry
#[derive(Debug, Default)]
pub struct MemoryRootRegistry {
    root: RwLock<Option<Hash>>,
    submissions: AtomicUsize,
}

impl MemoryRootRegistry {
    /// Registry with no root
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `root` already published
    pub fn with_root(root: Hash) -> Self {
        Self { root: RwLock::new(Some(root)), submissions: AtomicUsize::new(0) }
    }

    /// Number of accepted submissions
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RootRegistry for MemoryRootRegistry {
    async fn submit_root(&self, root: &Hash) -> Result<()> {
        *self.root.write().await = Some(*root);
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn published_root(&self) -> Result<Option<Hash>> {
        Ok(*self.root.read().await)
    }
}

/// NFT contract over JSON-RPC
#[derive(Clone, Debug)]
pub struct RpcRootRegistry {
    client: RpcClient,
    contract: Address,
    admin: Address,
}

impl RpcRootRegistry {
    /// `admin` must be an account the node can sign for
    pub fn new(client: RpcClient, contract: Address, admin: Address) -> Self {
        Self { client, contract, admin }
    }
}

#[async_trait]
impl RootRegistry for RpcRootRegistry {
    async fn submit_root(&self, root: &Hash) -> Result<()> {
        info!(root = %format_hash(root), contract = %self.contract, "Submitting whitelist root");

        let request = TransactionRequest {
            from: self.admin,
            to: self.contract,
            data: bindings::to_hex_data(&bindings::update_whitelist_root(root)),
            gas: Some(ROOT_UPDATE_GAS.to_string()),
            value: None,
        };
        let tx_hash = self.client.send_transaction(&request).await.map_err(WhitelistError::publish)?;
        self.client.wait_for_receipt(&tx_hash).await.map_err(WhitelistError::publish)?;
        Ok(())
    }

    async fn published_root(&self) -> Result<Option<Hash>> {
        let request = CallRequest {
            from: None,
            to: self.contract,
            data: bindings::to_hex_data(&bindings::whitelist_root()),
        };
        let data = self.client.eth_call(&request).await.map_err(WhitelistError::query)?;
        let root = bindings::decode_whitelist_root(&data).map_err(WhitelistError::query)?;
        Ok((root != [0u8; 32]).then_some(root))
    }
}
