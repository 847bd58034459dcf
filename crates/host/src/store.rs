//! Whitelist store
//!
//! Owns the address list, the last confirmed root and the content pointer.
//! Two lists are tracked: `current` (what the admin last set, possibly
//! unpublished) and `confirmed` (what the published root was built from).
//! Proofs always come from `confirmed`. Confirmed state only moves after the
//! registry has accepted the new root.

use anyhow::anyhow;
use auction_bindings as bindings;
use auction_core::{format_hash, Address, ContentId, Hash, Whitelist};
use auction_merkle::MerkleProof;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};

use crate::cache::{CachedWhitelist, LocalCache};
use crate::config::{Config, ContentMode, RegistryMode};
use crate::content::{ContentStore, MemoryContentStore, PinataStore};
use crate::error::{Result, WhitelistError};
use crate::notify::{Notification, Notifier};
use crate::registry::{MemoryRootRegistry, RootRegistry, RpcRootRegistry};
use crate::retry::RetryPolicy;
use crate::rpc::RpcClient;

/// Stored documents inspected when looking for the published list
const LOAD_SCAN_DEPTH: usize = 10;

/// Store lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    /// `initialize` not called yet
    Uninitialized,
    /// `initialize` in progress
    Loading,
    /// A confirmed list is loaded
    Ready,
    /// Nothing loaded: no published root, or the last load failed
    Empty,
}

impl StoreState {
    fn is_initialized(self) -> bool {
        matches!(self, Self::Ready | Self::Empty)
    }
}

/// Point-in-time view of the store
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    /// Lifecycle state
    pub state: StoreState,
    /// Entries in the current list
    pub entries: usize,
    /// Entries in the confirmed list
    pub confirmed_entries: usize,
    /// Confirmed root, `0x` hex
    pub root: Option<String>,
    /// Content pointer of the confirmed list
    pub content_id: Option<ContentId>,
    /// Current list differs from the confirmed one
    pub dirty: bool,
    /// Why the last load failed; mutations are refused while set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

#[derive(Debug)]
struct Inner {
    state: StoreState,
    current: Whitelist,
    confirmed: Whitelist,
    confirmed_root: Option<Hash>,
    content_id: Option<ContentId>,
    load_error: Option<String>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: StoreState::Uninitialized,
            current: Whitelist::default(),
            confirmed: Whitelist::default(),
            confirmed_root: None,
            content_id: None,
            load_error: None,
        }
    }
}

/// Whitelist store. Construct once, share behind an `Arc`.
pub struct WhitelistStore {
    inner: RwLock<Inner>,
    writer: Mutex<()>,
    content: Arc<dyn ContentStore>,
    registry: Arc<dyn RootRegistry>,
    cache: Option<LocalCache>,
    retry: RetryPolicy,
    notifier: Notifier,
}

impl std::fmt::Debug for WhitelistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhitelistStore")
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl WhitelistStore {
    /// Create an uninitialized store over the given collaborators
    pub fn new(content: Arc<dyn ContentStore>, registry: Arc<dyn RootRegistry>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            writer: Mutex::new(()),
            content,
            registry,
            cache: None,
            retry: RetryPolicy::default(),
            notifier: Notifier::default(),
        }
    }

    /// Mirror the list to a local cache
    pub fn with_cache(mut self, cache: LocalCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Retry policy for root submission
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the store and its adapters from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let content: Arc<dyn ContentStore> = match config.content_mode {
            ContentMode::Memory => Arc::new(MemoryContentStore::new()),
            ContentMode::Pinata => Arc::new(PinataStore::new(config.pinata.clone())?),
        };

        let registry: Arc<dyn RootRegistry> = match config.registry_mode {
            RegistryMode::Memory => Arc::new(MemoryRootRegistry::new()),
            RegistryMode::Rpc => {
                let contract = config.nft_contract.ok_or_else(|| anyhow!("NFT_CONTRACT_ADDRESS not configured"))?;
                let admin = config.admin_address.ok_or_else(|| anyhow!("ADMIN_ADDRESS not configured"))?;
                let client = RpcClient::new(&config.rpc_url)
                    .with_receipt_polling(config.receipt_poll_interval, config.receipt_poll_attempts);
                Arc::new(RpcRootRegistry::new(client, contract, admin))
            }
        };

        let mut store = Self::new(content, registry).with_retry(config.retry);
        if let Some(dir) = &config.cache_dir {
            store = store.with_cache(LocalCache::new(dir));
        }
        Ok(store)
    }

    /// Load the last confirmed list.
    ///
    /// Only a stored document whose root equals the published root is
    /// accepted. The cached content pointer is tried first, then the content
    /// store's most recent documents. With no published root the store starts
    /// `Empty` (`Ok`). When no matching document can be fetched the store is
    /// left `Empty`, returns `PersistenceFailure` and refuses mutations until
    /// a later `initialize` succeeds.
    pub async fn initialize(&self) -> Result<StoreState> {
        let _writer = self.writer.lock().await;
        {
            let mut inner = self.inner.write().await;
            let retry = inner.state == StoreState::Empty && inner.load_error.is_some();
            if inner.state != StoreState::Uninitialized && !retry {
                return Err(WhitelistError::AlreadyInitialized);
            }
            inner.state = StoreState::Loading;
        }

        let cached = match &self.cache {
            Some(cache) => cache.load().await.unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring unreadable whitelist cache");
                None
            }),
            None => None,
        };

        let published = match self.registry.published_root().await {
            Ok(root) => root,
            Err(e) => return Err(self.fail_initialize(e).await),
        };

        let Some(published) = published else {
            let mut inner = self.inner.write().await;
            if let Some(cached) = cached {
                inner.current = cached.whitelist;
            }
            inner.state = StoreState::Empty;
            inner.load_error = None;
            info!("No published whitelist root");
            return Ok(StoreState::Empty);
        };

        let pointer = cached.as_ref().and_then(|c| c.content_id.clone());
        let (content_id, confirmed) = match self.find_published(pointer, &published).await {
            Ok(found) => found,
            Err(e) => return Err(self.fail_initialize(e).await),
        };

        // Local edits made against this pointer survive a restart
        let current = match cached {
            Some(c) if c.content_id.as_ref() == Some(&content_id) => c.whitelist,
            _ => confirmed.clone(),
        };

        info!(cid = %content_id, entries = confirmed.len(), root = %format_hash(&published), "Whitelist loaded");

        let mut inner = self.inner.write().await;
        inner.current = current;
        inner.confirmed = confirmed;
        inner.confirmed_root = Some(published);
        inner.content_id = Some(content_id);
        inner.state = StoreState::Ready;
        inner.load_error = None;
        Ok(StoreState::Ready)
    }

    /// First stored document whose root is `published`
    async fn find_published(&self, pointer: Option<ContentId>, published: &Hash) -> Result<(ContentId, Whitelist)> {
        let mut candidates: Vec<ContentId> = pointer.into_iter().collect();
        match self.content.recent(LOAD_SCAN_DEPTH).await {
            Ok(ids) => {
                for id in ids {
                    if !candidates.contains(&id) {
                        candidates.push(id);
                    }
                }
            }
            Err(e) if candidates.is_empty() => return Err(e),
            Err(e) => warn!(error = %e, "Could not list stored whitelists"),
        }

        let mut last_err = None;
        for id in candidates {
            match self.content.get(&id).await {
                Ok(list) if list.root().ok().as_ref() == Some(published) => return Ok((id, list)),
                Ok(list) => warn!(
                    cid = %id,
                    entries = list.len(),
                    published = %format_hash(published),
                    "Skipping stored whitelist that does not match the published root"
                ),
                Err(e) => {
                    warn!(cid = %id, error = %e, "Could not fetch stored whitelist");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            WhitelistError::PersistenceFailure(format!(
                "no stored whitelist matches published root {}",
                format_hash(published)
            ))
        }))
    }

    async fn fail_initialize(&self, err: WhitelistError) -> WhitelistError {
        warn!(error = %err, "Whitelist load failed, mutations disabled until it succeeds");
        let err = match err {
            WhitelistError::PersistenceFailure(_) => err,
            other => WhitelistError::persistence(other),
        };
        let mut inner = self.inner.write().await;
        inner.state = StoreState::Empty;
        inner.load_error = Some(err.to_string());
        err
    }

    async fn ensure_initialized(&self) -> Result<()> {
        let inner = self.inner.read().await;
        if let Some(reason) = &inner.load_error {
            return Err(WhitelistError::PersistenceFailure(format!("whitelist not loaded: {}", reason)));
        }
        if inner.state.is_initialized() {
            Ok(())
        } else {
            Err(WhitelistError::NotInitialized)
        }
    }

    /// Replace the current (unpublished) list and persist it locally.
    /// The in-memory change stands even if the cache write fails.
    pub async fn set_whitelist(&self, whitelist: Whitelist) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.ensure_initialized().await?;

        let content_id = {
            let mut inner = self.inner.write().await;
            inner.current = whitelist.clone();
            inner.content_id.clone()
        };

        if let Some(cache) = &self.cache {
            cache.save(&CachedWhitelist { whitelist, content_id }).await?;
        }
        Ok(())
    }

    /// Publish `whitelist`: upload, submit its root, then move confirmed state.
    /// Nothing confirmed changes unless the root submission succeeds.
    pub async fn publish(&self, whitelist: Whitelist) -> Result<Hash> {
        let _writer = self.writer.lock().await;
        self.ensure_initialized().await?;
        self.publish_locked(whitelist).await
    }

    /// Add `address` to the confirmed list and publish. Adding a member
    /// returns the current root without publishing.
    pub async fn add_address(&self, address: Address) -> Result<Hash> {
        let _writer = self.writer.lock().await;
        self.ensure_initialized().await?;

        let confirmed = self.inner.read().await.confirmed.clone();
        if confirmed.contains(&address) {
            return Ok(confirmed.root()?);
        }
        self.publish_locked(confirmed.with_added(address)).await
    }

    /// Remove `address` from the confirmed list and publish
    pub async fn remove_address(&self, address: &Address) -> Result<Hash> {
        let _writer = self.writer.lock().await;
        self.ensure_initialized().await?;

        let confirmed = self.inner.read().await.confirmed.clone();
        if !confirmed.contains(address) {
            return Err(WhitelistError::NotFound(address.to_string()));
        }
        self.publish_locked(confirmed.without(address)).await
    }

    async fn publish_locked(&self, whitelist: Whitelist) -> Result<Hash> {
        let root = whitelist.root()?;
        self.notifier.pending(&root);

        let content_id = match self.content.put(&whitelist).await {
            Ok(id) => id,
            Err(e) => {
                warn!(root = %format_hash(&root), error = %e, "Whitelist upload failed");
                self.notifier.failure(&root, &e);
                return Err(e);
            }
        };

        let registry = &self.registry;
        if let Err(e) = self.retry.run("submit_root", || registry.submit_root(&root)).await {
            // A timed out attempt may still have landed
            if self.root_is_published(&root).await {
                warn!(root = %format_hash(&root), error = %e, "Root submission reported failure but the root is published");
            } else {
                warn!(root = %format_hash(&root), error = %e, "Root submission failed, keeping previous root");
                self.notifier.failure(&root, &e);
                return Err(match e {
                    WhitelistError::PublishFailure(_) => e,
                    other => WhitelistError::publish(other),
                });
            }
        }

        {
            let mut inner = self.inner.write().await;
            inner.confirmed = whitelist.clone();
            inner.current = whitelist.clone();
            inner.confirmed_root = Some(root);
            inner.content_id = Some(content_id.clone());
            inner.state = StoreState::Ready;
        }

        if let Some(cache) = &self.cache {
            let cached = CachedWhitelist { whitelist: whitelist.clone(), content_id: Some(content_id.clone()) };
            if let Err(e) = cache.save(&cached).await {
                warn!(error = %e, "Published whitelist but could not update the local cache");
            }
        }

        info!(root = %format_hash(&root), cid = %content_id, entries = whitelist.len(), "Whitelist published");
        self.notifier.success(&root);
        Ok(root)
    }

    async fn root_is_published(&self, root: &Hash) -> bool {
        match self.registry.published_root().await {
            Ok(published) => published == Some(*root),
            Err(e) => {
                warn!(error = %e, "Could not read the published root");
                false
            }
        }
    }

    /// Lifecycle state
    pub async fn state(&self) -> StoreState {
        self.inner.read().await.state
    }

    /// Current list (may be unpublished)
    pub async fn whitelist(&self) -> Whitelist {
        self.inner.read().await.current.clone()
    }

    /// List the published root was built from
    pub async fn confirmed_whitelist(&self) -> Whitelist {
        self.inner.read().await.confirmed.clone()
    }

    /// Last confirmed root
    pub async fn confirmed_root(&self) -> Option<Hash> {
        self.inner.read().await.confirmed_root
    }

    /// Content pointer of the confirmed list
    pub async fn content_id(&self) -> Option<ContentId> {
        self.inner.read().await.content_id.clone()
    }

    /// Current list differs from the confirmed one
    pub async fn is_dirty(&self) -> bool {
        let inner = self.inner.read().await;
        inner.current != inner.confirmed
    }

    /// Snapshot for status reporting
    pub async fn status(&self) -> StoreStatus {
        let inner = self.inner.read().await;
        StoreStatus {
            state: inner.state,
            entries: inner.current.len(),
            confirmed_entries: inner.confirmed.len(),
            root: inner.confirmed_root.as_ref().map(format_hash),
            content_id: inner.content_id.clone(),
            dirty: inner.current != inner.confirmed,
            load_error: inner.load_error.clone(),
        }
    }

    /// Membership proof for `address` from the confirmed list
    pub async fn proof(&self, address: &Address) -> Result<MerkleProof> {
        let inner = self.inner.read().await;
        if !inner.confirmed.contains(address) {
            return Err(WhitelistError::NotFound(address.to_string()));
        }
        Ok(inner.confirmed.proof(address)?)
    }

    /// Whether `address` can prove membership against the published root
    pub async fn is_whitelisted(&self, address: &Address) -> Result<bool> {
        let proof = match self.proof(address).await {
            Ok(proof) => proof,
            Err(WhitelistError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.registry.verify(&proof.leaf, &proof.siblings).await
    }

    /// Calldata for `mintNFT(proof)`, or `mintNFTWithToken(token, proof)`
    /// when paying with an ERC-20
    pub async fn mint_calldata(&self, address: &Address, token: Option<&Address>) -> Result<Vec<u8>> {
        let proof = self.proof(address).await?;
        Ok(match token {
            Some(token) => bindings::mint_nft_with_token(token, &proof.siblings),
            None => bindings::mint_nft(&proof.siblings),
        })
    }

    /// Subscribe to publish notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Root registry in use
    pub fn registry(&self) -> &Arc<dyn RootRegistry> {
        &self.registry
    }
}
