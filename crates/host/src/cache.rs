//! Local whitelist cache

use auction_core::{ContentId, Whitelist};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, WhitelistError};

const CACHE_FILE_NAME: &str = "whitelist.json";

/// What the cache file holds
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedWhitelist {
    /// Last list set locally (may be unpublished)
    pub whitelist: Whitelist,
    /// Last confirmed content pointer
    pub content_id: Option<ContentId>,
}

/// JSON file cache in a directory
#[derive(Clone, Debug)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    /// Cache stored as `whitelist.json` under `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(CACHE_FILE_NAME) }
    }

    /// Cache file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache. A missing file is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<CachedWhitelist>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WhitelistError::persistence(e)),
        };
        let cached = serde_json::from_slice(&bytes).map_err(WhitelistError::persistence)?;
        Ok(Some(cached))
    }

    /// Replace the cache contents. Writes a sibling temp file then renames it.
    pub async fn save(&self, cached: &CachedWhitelist) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(WhitelistError::persistence)?;
        }
        let body = serde_json::to_vec_pretty(cached).map_err(WhitelistError::persistence)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(WhitelistError::persistence)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(WhitelistError::persistence)?;
        debug!(path = %self.path.display(), entries = cached.whitelist.len(), "Wrote whitelist cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_core::Address;

    #[tokio::test]
    async fn test_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path());
        assert_eq!(cache.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("nested"));
        let cached = CachedWhitelist {
            whitelist: Whitelist::new(vec![Address::new([9; 20])]),
            content_id: Some(ContentId::new("bafy1")),
        };

        cache.save(&cached).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), Some(cached.clone()));

        let replaced = CachedWhitelist { content_id: None, ..cached };
        cache.save(&replaced).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), Some(replaced));
    }

    #[tokio::test]
    async fn test_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path());
        std::fs::write(cache.path(), b"not json").unwrap();
        assert!(matches!(cache.load().await, Err(WhitelistError::PersistenceFailure(_))));
    }
}
