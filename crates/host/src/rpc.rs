//! Ethereum JSON-RPC client

use anyhow::{anyhow, Result};
use auction_bindings::{CallRequest, TransactionRequest};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Thin JSON-RPC client over a single endpoint
#[derive(Clone, Debug)]
pub struct RpcClient {
    url: String,
    http_client: reqwest::Client,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl RpcClient {
    /// Create a client with the default receipt polling (1s, 30 attempts)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
            poll_interval: Duration::from_secs(1),
            poll_attempts: 30,
        }
    }

    /// Override receipt polling
    pub fn with_receipt_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts.max(1);
        self
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw JSON-RPC call; returns `result` or fails on `error`
    pub async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(anyhow!("{} failed: {}", method, error));
        }

        response.get("result").cloned().ok_or_else(|| anyhow!("No result in {} response", method))
    }

    /// `eth_call` at the latest block; returns the decoded return data
    pub async fn eth_call(&self, request: &CallRequest) -> Result<Vec<u8>> {
        let result = self.call("eth_call", serde_json::json!([request, "latest"])).await?;
        let data = result.as_str().ok_or_else(|| anyhow!("eth_call returned non-string result"))?;
        Ok(hex::decode(data.trim_start_matches("0x"))?)
    }

    /// `eth_sendTransaction` from a node-unlocked account; returns the tx hash
    pub async fn send_transaction(&self, request: &TransactionRequest) -> Result<String> {
        let result = self.call("eth_sendTransaction", serde_json::json!([request])).await?;
        let tx_hash = result.as_str().ok_or_else(|| anyhow!("No tx hash in response"))?;
        debug!(tx_hash, "Transaction sent");
        Ok(tx_hash.to_string())
    }

    /// Poll `eth_getTransactionReceipt` until mined. Fails on revert or when
    /// polling runs out.
    pub async fn wait_for_receipt(&self, tx_hash: &str) -> Result<serde_json::Value> {
        for _ in 0..self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let receipt = self.call("eth_getTransactionReceipt", serde_json::json!([tx_hash])).await?;
            if receipt.is_null() {
                continue;
            }

            let status = receipt.get("status").and_then(|s| s.as_str());
            if status == Some("0x1") {
                info!(tx_hash, "Transaction confirmed");
                return Ok(receipt);
            }
            warn!(tx_hash, ?status, "Transaction reverted");
            return Err(anyhow!("transaction {} reverted (status {:?})", tx_hash, status));
        }

        Err(anyhow!("no receipt for {} after {} polls", tx_hash, self.poll_attempts))
    }
}
