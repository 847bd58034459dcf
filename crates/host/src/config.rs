//! Configuration

use auction_core::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::retry::RetryPolicy;

/// Where whitelist roots are published
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistryMode {
    /// In-process registry (for testing and local demos)
    #[default]
    Memory,
    /// NFT contract over JSON-RPC (requires NFT_CONTRACT_ADDRESS and ADMIN_ADDRESS)
    Rpc,
}

impl From<&str> for RegistryMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "rpc" | "contract" => Self::Rpc,
            _ => Self::Memory,
        }
    }
}

/// Where whitelist documents are stored
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentMode {
    /// In-process content store
    #[default]
    Memory,
    /// Pinata IPFS pinning (requires PINATA_JWT and PINATA_GATEWAY)
    Pinata,
}

impl From<&str> for ContentMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pinata" | "ipfs" => Self::Pinata,
            _ => Self::Memory,
        }
    }
}

/// Pinata configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PinataConfig {
    /// API JWT
    pub jwt: String,
    /// Gateway host, e.g. `example.mypinata.cloud`
    pub gateway: String,
    /// Upload endpoint
    pub upload_url: String,
    /// REST API base
    pub api_url: String,
}

impl PinataConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self {
            jwt: env::var("PINATA_JWT").unwrap_or_default(),
            gateway: env::var("PINATA_GATEWAY").unwrap_or_default(),
            upload_url: env::var("PINATA_UPLOAD_URL")
                .unwrap_or_else(|_| "https://uploads.pinata.cloud/v3/files".to_string()),
            api_url: env::var("PINATA_API_URL").unwrap_or_else(|_| "https://api.pinata.cloud".to_string()),
        }
    }
}

/// Host configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Chain RPC URL
    pub rpc_url: String,
    /// NFT contract (holds the whitelist root, mints)
    pub nft_contract: Option<Address>,
    /// Auction contract
    pub auction_contract: Option<Address>,
    /// ERC-20 accepted for token mints
    pub usdc_contract: Option<Address>,
    /// Admin account used as `from` for root updates (node-unlocked)
    pub admin_address: Option<Address>,
    /// Root registry backend
    pub registry_mode: RegistryMode,
    /// Content store backend
    pub content_mode: ContentMode,
    /// Pinata settings
    pub pinata: PinataConfig,
    /// Local cache directory; no cache when unset
    pub cache_dir: Option<PathBuf>,
    /// Root submission retry
    pub retry: RetryPolicy,
    /// Delay between receipt polls
    pub receipt_poll_interval: Duration,
    /// Receipt polls before giving up
    pub receipt_poll_attempts: u32,
    /// JSON-RPC listen address of the node
    pub rpc_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            nft_contract: None,
            auction_contract: None,
            usdc_contract: None,
            admin_address: None,
            registry_mode: RegistryMode::Memory,
            content_mode: ContentMode::Memory,
            pinata: PinataConfig::default(),
            cache_dir: None,
            retry: RetryPolicy::default(),
            receipt_poll_interval: Duration::from_secs(1),
            receipt_poll_attempts: 30,
            rpc_addr: "0.0.0.0:8547".to_string(),
        }
    }
}

impl Config {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let retry = RetryPolicy {
            max_attempts: env_parse("PUBLISH_MAX_ATTEMPTS").unwrap_or(defaults.retry.max_attempts),
            backoff: env_parse("PUBLISH_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.backoff),
            attempt_timeout: env_parse("PUBLISH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.attempt_timeout),
        };

        Self {
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),
            nft_contract: env_address("NFT_CONTRACT_ADDRESS"),
            auction_contract: env_address("AUCTION_CONTRACT_ADDRESS"),
            usdc_contract: env_address("USDC_CONTRACT_ADDRESS"),
            admin_address: env_address("ADMIN_ADDRESS"),
            registry_mode: env::var("REGISTRY_MODE")
                .map(|s| RegistryMode::from(s.as_str()))
                .unwrap_or_default(),
            content_mode: env::var("CONTENT_MODE")
                .map(|s| ContentMode::from(s.as_str()))
                .unwrap_or_default(),
            pinata: PinataConfig::from_env(),
            cache_dir: env::var("CACHE_DIR").ok().map(PathBuf::from),
            retry,
            receipt_poll_interval: env_parse("RECEIPT_POLL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.receipt_poll_interval),
            receipt_poll_attempts: env_parse("RECEIPT_POLL_ATTEMPTS").unwrap_or(defaults.receipt_poll_attempts),
            rpc_addr: env::var("RPC_ADDR").unwrap_or(defaults.rpc_addr),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_address(key: &str) -> Option<Address> {
    let value = env::var(key).ok()?;
    match value.parse() {
        Ok(address) => Some(address),
        Err(e) => {
            warn!(key, error = %e, "Ignoring malformed address in environment");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(RegistryMode::from("RPC"), RegistryMode::Rpc);
        assert_eq!(RegistryMode::from("anything"), RegistryMode::Memory);
        assert_eq!(ContentMode::from("ipfs"), ContentMode::Pinata);
        assert_eq!(ContentMode::from(""), ContentMode::Memory);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry_mode, RegistryMode::Memory);
        assert!(config.cache_dir.is_none());
        assert_eq!(config.retry.max_attempts, 3);
    }
}
