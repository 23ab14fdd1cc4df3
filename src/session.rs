//! Wallet sessions: who is submitting.

use bevy::log::{info, warn};
use bip39::{Language, Mnemonic};
use keyring::Entry;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::address::AccountId;
use crate::config::DeskSettings;
use crate::coordinator::WalletSession;
use crate::error::SessionError;

/// A session pinned to one account (or to none), e.g. a node-managed signer.
#[derive(Debug, Clone, Default)]
pub struct FixedSession(pub Option<AccountId>);

impl WalletSession for FixedSession {
    fn current_address(&self) -> Option<AccountId> {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWallet {
    pub mnemonic: String,
    pub created_at: u64, // Unix timestamp
}

/// Session backed by a mnemonic kept in the OS keychain.
pub struct KeychainSession {
    service_name: String,
    username: String,
    address: RwLock<Option<AccountId>>,
}

impl KeychainSession {
    pub fn new(service_name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            username: username.into(),
            address: RwLock::new(None),
        }
    }

    pub fn from_settings(settings: &DeskSettings) -> Self {
        Self::new(settings.keychain_service.clone(), settings.keychain_username.clone())
    }

    fn entry(&self) -> Result<Entry, SessionError> {
        Entry::new(&self.service_name, &self.username)
            .map_err(|e| SessionError::Access(format!("Failed to create keychain entry: {}", e)))
    }

    fn load_wallet(&self) -> Result<StoredWallet, SessionError> {
        let json_data = self.entry()?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => SessionError::NotFound,
            _ => SessionError::Access(format!("Failed to load wallet from keychain: {}", e)),
        })?;

        serde_json::from_str(&json_data)
            .map_err(|e| SessionError::Access(format!("Stored wallet is corrupt: {}", e)))
    }

    /// Load the stored wallet and expose its address.
    pub fn connect(&self) -> Result<AccountId, SessionError> {
        let wallet = self.load_wallet()?;
        let account = derive_account(&wallet.mnemonic)?;
        self.set_address(Some(account));
        info!("🔓 Wallet {} connected from keychain service {}", account, self.service_name);
        Ok(account)
    }

    pub fn disconnect(&self) {
        self.set_address(None);
        info!("Wallet disconnected");
    }

    /// Validate a phrase, store it in the keychain and connect to it.
    pub fn import_mnemonic(&self, phrase: &str) -> Result<AccountId, SessionError> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let account = derive_account(&normalized)?;

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let json_data = serde_json::to_string(&StoredWallet { mnemonic: normalized, created_at })
            .map_err(|e| SessionError::Access(format!("Failed to serialize wallet: {}", e)))?;

        self.entry()?
            .set_password(&json_data)
            .map_err(|e| SessionError::Access(format!("Failed to store wallet in keychain: {}", e)))?;

        self.set_address(Some(account));
        info!("Wallet stored securely in OS keychain service: {}", self.service_name);
        Ok(account)
    }

    fn set_address(&self, account: Option<AccountId>) {
        match self.address.write() {
            Ok(mut guard) => *guard = account,
            Err(poisoned) => {
                warn!("Session lock poisoned, recovering");
                *poisoned.into_inner() = account;
            }
        }
    }
}

impl WalletSession for KeychainSession {
    fn current_address(&self) -> Option<AccountId> {
        match self.address.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// The first 32 bytes of the BIP39 seed are used directly as the secp256k1
/// key; no BIP32 path is applied.
pub fn derive_account(phrase: &str) -> Result<AccountId, SessionError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| SessionError::InvalidMnemonic(e.to_string()))?;
    let seed = mnemonic.to_seed("");

    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(&seed[..32])
        .map_err(|e| SessionError::InvalidMnemonic(format!("Failed to create private key: {}", e)))?;
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);

    Ok(AccountId::from_uncompressed_public_key(&public_key.serialize_uncompressed()))
}
