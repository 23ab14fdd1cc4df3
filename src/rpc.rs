//! Ethereum JSON-RPC backend for submission and receipt polling.

use bevy::log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::address::AccountId;
use crate::call::CallDescriptor;
use crate::config::DeskSettings;
use crate::coordinator::{ReceiptWatcher, SettlementOutcome, SubmissionProvider, TxHandle};
use crate::error::ProviderError;

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    pub value: String,
}

impl TransactionRequest {
    pub fn new(from: AccountId, call: &CallDescriptor) -> Self {
        Self {
            from: from.to_checksum(),
            to: call.contract.to_checksum(),
            data: format!("0x{}", hex::encode(call.calldata())),
            value: format!("0x{:x}", call.value),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// "0x1" on success, "0x0" on revert.
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn outcome(&self) -> SettlementOutcome {
        match self.status.as_deref() {
            Some("0x1") => SettlementOutcome::Success,
            Some(_) => SettlementOutcome::Failure("transaction reverted".to_string()),
            None => SettlementOutcome::Failure("receipt carries no status".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    rpc_url: String,
    max_retries: u32,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(settings: &DeskSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rpc_url: settings.rpc_url.clone(),
            max_retries: settings.max_retries,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<Option<T>, ProviderError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("📤 {} -> {}", method, self.rpc_url);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".to_string())
                } else if e.is_connect() {
                    ProviderError::Network(format!("Connection failed: {}", e))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status_code = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!("📡 {} response status {}: {}", method, status_code, body);

        if !status_code.is_success() {
            error!("❌ {} failed with status {}: {}", method, status_code, body);
            return Err(ProviderError::Api(format!("{} failed with status {}: {}", method, status_code, body)));
        }

        let parsed: RpcResponse<T> = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse {} response: {}", method, e)))?;

        if let Some(err) = parsed.error {
            if err.code == USER_REJECTED_CODE {
                return Err(ProviderError::UserRejected);
            }
            return Err(ProviderError::Api(format!("{} (code {})", err.message, err.code)));
        }
        Ok(parsed.result)
    }

    // Retry with exponential backoff; only safe for read-only calls
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(ProviderError::Network(msg)) if attempt < self.max_retries => {
                    let delay_ms = 250u64 << attempt; // 250ms, 500ms, 1s, ...
                    info!("Request failed ({}), retrying in {}ms (attempt {}/{})", msg, delay_ms, attempt + 1, self.max_retries + 1);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn send_transaction(&self, from: AccountId, call: &CallDescriptor) -> Result<TxHandle, ProviderError> {
        let request = TransactionRequest::new(from, call);
        info!("🔐 eth_sendTransaction {} to {} (value {})", call.function().signature(), request.to, request.value);

        let hash: Option<String> = self.call("eth_sendTransaction", json!([request])).await?;
        match hash {
            Some(hash) if is_tx_hash(&hash) => Ok(TxHandle(hash)),
            Some(other) => Err(ProviderError::Parse(format!("Unexpected transaction hash: {}", other))),
            None => Err(ProviderError::Parse("eth_sendTransaction returned no hash".to_string())),
        }
    }

    /// `None` while the transaction is still pending.
    pub async fn transaction_receipt(&self, handle: &TxHandle) -> Result<Option<TransactionReceipt>, ProviderError> {
        self.retry_request(move || self.call("eth_getTransactionReceipt", json!([handle.0]))).await
    }

    // Blocking wrapper that creates its own Tokio runtime
    fn run_with_tokio<F, R>(&self, future: F) -> Result<R, ProviderError>
    where
        F: std::future::Future<Output = Result<R, ProviderError>>,
    {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create Tokio runtime: {}", e)))?;
        rt.block_on(future)
    }
}

impl SubmissionProvider for RpcClient {
    fn send(&self, from: AccountId, call: &CallDescriptor) -> Result<TxHandle, ProviderError> {
        self.run_with_tokio(self.send_transaction(from, call))
    }
}

impl ReceiptWatcher for RpcClient {
    fn poll(&self, handle: &TxHandle) -> Result<Option<SettlementOutcome>, ProviderError> {
        let receipt = self.run_with_tokio(self.transaction_receipt(handle))?;
        Ok(receipt.map(|r| r.outcome()))
    }
}

fn is_tx_hash(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|digits| digits.len() == 64 && digits.chars().all(|c| c.is_ascii_hexdigit()))
}
