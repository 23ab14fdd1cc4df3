//! 20-byte account identifiers in `0x`-prefixed hex form.
//!
//! Input is accepted when it is all-lowercase or all-uppercase hex, or when
//! its mixed casing matches the EIP-55 checksum. Output is always EIP-55.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId([u8; 20]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAddress(pub String);

impl fmt::Display for InvalidAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid account address: {}", self.0)
    }
}

impl std::error::Error for InvalidAddress {}

impl AccountId {
    pub const ZERO: AccountId = AccountId([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn parse(input: &str) -> Result<Self, InvalidAddress> {
        let invalid = || InvalidAddress(input.to_string());

        let digits = input.trim().strip_prefix("0x").ok_or_else(invalid)?;
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && to_checksum_hex(digits) != digits {
            return Err(invalid());
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }

    /// EIP-55 mixed-case form, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        format!("0x{}", to_checksum_hex(&hex::encode(self.0)))
    }

    /// Derive the account of an uncompressed secp256k1 public key
    /// (65 bytes, leading 0x04 tag).
    pub fn from_uncompressed_public_key(public_key: &[u8; 65]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(&public_key[1..]);
        let digest = hasher.finalize();

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]); // last 20 bytes
        Self(bytes)
    }
}

// EIP-55: uppercase every hex letter whose nibble in keccak(lowercase) is >= 8
fn to_checksum_hex(digits: &str) -> String {
    let lower = digits.to_lowercase();
    let hash = {
        let mut hasher = Keccak256::new();
        hasher.update(lower.as_bytes());
        hex::encode(hasher.finalize())
    };

    lower
        .chars()
        .zip(hash.chars())
        .map(|(c, h)| if c.is_ascii_alphabetic() && h >= '8' { c.to_ascii_uppercase() } else { c })
        .collect()
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for AccountId {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AccountId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
