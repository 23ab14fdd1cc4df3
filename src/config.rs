use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::address::AccountId;
use crate::amount::MAX_DECIMALS;
use crate::error::ConfigError;

/// Receipt lookups back off as `250ms << attempt`, so the longest single
/// wait stays near two minutes.
pub const MAX_RETRIES: u32 = 10;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskSettings {
    /// JSON-RPC endpoint of the node (e.g. "http://localhost:8545")
    pub rpc_url: String,
    /// Deployed bond market contract
    pub contract_address: String,
    /// Fixed-point precision for face value, coupon rate and price
    pub amount_decimals: u8,

    // Transaction watching
    pub confirmation_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    /// Retries for receipt lookups. Submissions are never retried.
    pub max_retries: u32,
    pub request_timeout_secs: u64,

    // Wallet session
    pub keychain_service: String,
    pub keychain_username: String,
    /// Use this account instead of the keychain wallet (node-managed signer).
    pub from_address: Option<String>,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            contract_address: "0x742d35Cc6634C0532925A3B8D4C9dB96C4B4d8B6".to_string(),
            amount_decimals: 18,
            confirmation_timeout_secs: 300,
            receipt_poll_interval_ms: 2000,
            max_retries: 3,
            request_timeout_secs: 30,
            keychain_service: "Bloom-Bond-Desk".to_string(),
            keychain_username: "default-wallet".to_string(),
            from_address: None,
        }
    }
}

impl DeskSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let settings: DeskSettings = serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.contract()?;
        self.from_account()?;
        if self.amount_decimals > MAX_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "amount_decimals must be at most {}, got {}",
                MAX_DECIMALS, self.amount_decimals
            )));
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::Invalid("confirmation_timeout_secs must be greater than zero".to_string()));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES, self.max_retries
            )));
        }
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url is empty".to_string()));
        }
        Ok(())
    }

    pub fn contract(&self) -> Result<AccountId, ConfigError> {
        AccountId::parse(&self.contract_address).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn from_account(&self) -> Result<Option<AccountId>, ConfigError> {
        self.from_address
            .as_deref()
            .map(AccountId::parse)
            .transpose()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
