//! Content-addressed whitelist storage

use async_trait::async_trait;
use auction_core::{ContentId, Whitelist};
use auction_merkle::Keccak256Hasher;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::PinataConfig;
use crate::error::{Result, WhitelistError};

/// File name used for uploaded whitelist documents
pub const WHITELIST_FILE_NAME: &str = "whitelist.json";

/// External content-addressed store holding whitelist documents
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a list, returning its content id
    async fn put(&self, whitelist: &Whitelist) -> Result<ContentId>;

    /// Fetch the list stored under `id`
    async fn get(&self, id: &ContentId) -> Result<Whitelist>;

    /// Up to `limit` stored documents, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<ContentId>>;

    /// Most recently stored document, if any
    async fn latest(&self) -> Result<Option<ContentId>> {
        Ok(self.recent(1).await?.into_iter().next())
    }
}

/// In-process content store. Ids are the hex Keccak of the JSON body, so
/// storing the same list twice yields the same id.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    inner: RwLock<MemoryContent>,
}

#[derive(Debug, Default)]
struct MemoryContent {
    documents: HashMap<ContentId, Vec<u8>>,
    // Oldest first; a re-stored document moves to the end
    order: Vec<ContentId>,
}

impl MemoryContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct documents stored
    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    /// No documents stored
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.documents.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, whitelist: &Whitelist) -> Result<ContentId> {
        let body = serde_json::to_vec(whitelist).map_err(WhitelistError::persistence)?;
        let id = ContentId::new(hex::encode(Keccak256Hasher::hash(&body)));

        let mut inner = self.inner.write().await;
        inner.documents.insert(id.clone(), body);
        inner.order.retain(|existing| *existing != id);
        inner.order.push(id.clone());
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Whitelist> {
        let inner = self.inner.read().await;
        let body = inner
            .documents
            .get(id)
            .ok_or_else(|| WhitelistError::PersistenceFailure(format!("no document under {}", id)))?;
        serde_json::from_slice(body).map_err(WhitelistError::persistence)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ContentId>> {
        Ok(self.inner.read().await.order.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Debug, Deserialize)]
struct PinataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PinataFile {
    cid: String,
}

#[derive(Debug, Deserialize)]
struct PinataFileList {
    #[serde(default)]
    files: Vec<PinataFile>,
}

/// Pinata (IPFS) backed store
#[derive(Clone, Debug)]
pub struct PinataStore {
    config: PinataConfig,
    http_client: reqwest::Client,
}

impl PinataStore {
    /// Create a store. Fails when the JWT or gateway is missing.
    pub fn new(config: PinataConfig) -> Result<Self> {
        if config.jwt.is_empty() {
            return Err(WhitelistError::PersistenceFailure("PINATA_JWT not configured".to_string()));
        }
        if config.gateway.is_empty() {
            return Err(WhitelistError::PersistenceFailure("PINATA_GATEWAY not configured".to_string()));
        }
        Ok(Self { config, http_client: reqwest::Client::new() })
    }

    fn gateway_url(&self, id: &ContentId) -> String {
        let gateway = self.config.gateway.trim_end_matches('/');
        if gateway.starts_with("http://") || gateway.starts_with("https://") {
            format!("{}/ipfs/{}", gateway, id)
        } else {
            format!("https://{}/ipfs/{}", gateway, id)
        }
    }

    async fn upload(&self, body: Vec<u8>) -> anyhow::Result<ContentId> {
        let part = reqwest::multipart::Part::bytes(body)
            .file_name(WHITELIST_FILE_NAME)
            .mime_str("application/json")?;
        let form = reqwest::multipart::Form::new().part("file", part).text("network", "public");

        let response: PinataEnvelope<PinataFile> = self
            .http_client
            .post(&self.config.upload_url)
            .bearer_auth(&self.config.jwt)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ContentId::new(response.data.cid))
    }

    async fn fetch(&self, id: &ContentId) -> anyhow::Result<Whitelist> {
        let whitelist = self
            .http_client
            .get(self.gateway_url(id))
            .send()
            .await?
            .error_for_status()?
            .json::<Whitelist>()
            .await?;
        Ok(whitelist)
    }

    async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<ContentId>> {
        let url = format!("{}/v3/files/public", self.config.api_url.trim_end_matches('/'));
        let response: PinataEnvelope<PinataFileList> = self
            .http_client
            .get(url)
            .query(&[("order", "DESC".to_string()), ("limit", limit.to_string())])
            .bearer_auth(&self.config.jwt)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.data.files.into_iter().map(|f| ContentId::new(f.cid)).collect())
    }
}

#[async_trait]
impl ContentStore for PinataStore {
    async fn put(&self, whitelist: &Whitelist) -> Result<ContentId> {
        let body = serde_json::to_vec(whitelist).map_err(WhitelistError::persistence)?;
        let id = self.upload(body).await.map_err(WhitelistError::persistence)?;
        info!(cid = %id, entries = whitelist.len(), "Uploaded whitelist to IPFS");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Whitelist> {
        debug!(cid = %id, "Fetching whitelist from gateway");
        self.fetch(id).await.map_err(WhitelistError::persistence)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ContentId>> {
        self.list_recent(limit).await.map_err(WhitelistError::persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::Address;

    fn list(bytes: &[u8]) -> Whitelist {
        bytes.iter().map(|b| Address::new([*b; 20])).collect()
    }

    #[tokio::test]
    async fn test_memory_put_get() {
        let store = MemoryContentStore::new();
        assert_eq!(store.latest().await.unwrap(), None);

        let whitelist = list(&[1, 2, 3]);
        let id = store.put(&whitelist).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), whitelist);
        assert_eq!(store.latest().await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn test_memory_content_addressing() {
        let store = MemoryContentStore::new();
        let a = store.put(&list(&[1, 2])).await.unwrap();
        let b = store.put(&list(&[3])).await.unwrap();
        let a_again = store.put(&list(&[1, 2])).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(a, a_again);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.latest().await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_memory_recent_order() {
        let store = MemoryContentStore::new();
        assert!(store.recent(5).await.unwrap().is_empty());

        let a = store.put(&list(&[1])).await.unwrap();
        let b = store.put(&list(&[2])).await.unwrap();
        let c = store.put(&list(&[3])).await.unwrap();
        assert_eq!(store.recent(5).await.unwrap(), vec![c.clone(), b.clone(), a.clone()]);
        assert_eq!(store.recent(2).await.unwrap(), vec![c.clone(), b.clone()]);

        store.put(&list(&[1])).await.unwrap();
        assert_eq!(store.recent(3).await.unwrap(), vec![a, c, b]);
    }

    #[tokio::test]
    async fn test_memory_missing_document() {
        let store = MemoryContentStore::new();
        let err = store.get(&ContentId::new("bafy-missing")).await.unwrap_err();
        assert!(matches!(err, WhitelistError::PersistenceFailure(_)));
    }

    #[test]
    fn test_pinata_requires_credentials() {
        assert!(PinataStore::new(PinataConfig::default()).is_err());

        let config = PinataConfig {
            jwt: "jwt".to_string(),
            gateway: "example.mypinata.cloud".to_string(),
            ..PinataConfig::default()
        };
        let store = PinataStore::new(config).unwrap();
        assert_eq!(
            store.gateway_url(&ContentId::new("bafy123")),
            "https://example.mypinata.cloud/ipfs/bafy123"
        );
    }

    #[test]
    fn test_pinata_response_shapes() {
        let upload: PinataEnvelope<PinataFile> =
            serde_json::from_str(r#"{"data":{"id":"x","name":"whitelist.json","cid":"bafyabc","size":10}}"#)
                .unwrap();
        assert_eq!(upload.data.cid, "bafyabc");

        let listing: PinataEnvelope<PinataFileList> =
            serde_json::from_str(r#"{"data":{"files":[{"cid":"bafynew"},{"cid":"bafyold"}],"next_page_token":""}}"#)
                .unwrap();
        assert_eq!(listing.data.files[0].cid, "bafynew");
    }
}
