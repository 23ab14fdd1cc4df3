//! Fixed-point conversion between human decimal input and on-chain base units.
//!
//! All arithmetic is done on `U256`; nothing here ever goes through a float.
//! Digits beyond the configured precision are truncated (rounded toward zero).

use alloy_primitives::U256;

use crate::error::AmountError;

/// Largest precision for which `10^decimals` still fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

/// An unsigned decimal number as typed by the user, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    whole: String,
    fraction: String,
}

impl Decimal {
    /// Accepts `123`, `123.45`, `0.5`. Rejects signs, exponents, empty parts
    /// around the point (`.5`, `5.`) and anything non-numeric.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let malformed = || AmountError::MalformedNumber(input.to_string());
        let trimmed = input.trim();

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        if trimmed.contains('.') && fraction.is_empty() {
            return Err(malformed());
        }
        if !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let whole = whole.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');
        Ok(Self {
            whole: if whole.is_empty() { "0".to_string() } else { whole.to_string() },
            fraction: fraction.to_string(),
        })
    }

    pub fn is_zero(&self) -> bool {
        self.whole == "0" && self.fraction.is_empty()
    }

    pub fn to_base_units(&self, decimals: u8) -> Result<U256, AmountError> {
        let scale = pow10(decimals)?;
        let whole = parse_digits(&self.whole)?;

        let kept = &self.fraction[..self.fraction.len().min(decimals as usize)];
        let fraction = if kept.is_empty() {
            U256::ZERO
        } else {
            let padding = pow10(decimals - kept.len() as u8)?;
            parse_digits(kept)?.checked_mul(padding).ok_or(AmountError::Overflow)?
        };

        whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add(fraction))
            .ok_or(AmountError::Overflow)
    }
}

impl std::fmt::Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fraction.is_empty() {
            write!(f, "{}", self.whole)
        } else {
            write!(f, "{}.{}", self.whole, self.fraction)
        }
    }
}

pub fn to_base_units(input: &str, decimals: u8) -> Result<U256, AmountError> {
    Decimal::parse(input)?.to_base_units(decimals)
}

/// Inverse of [`to_base_units`]: shortest decimal string for `amount`.
pub fn from_base_units(amount: U256, decimals: u8) -> Result<String, AmountError> {
    let scale = pow10(decimals)?;
    let whole = amount / scale;
    let fraction = amount % scale;

    if fraction.is_zero() {
        return Ok(whole.to_string());
    }
    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    Ok(format!("{}.{}", whole, padded.trim_end_matches('0')))
}

/// A non-negative integer field such as a bond id or a quantity.
pub fn parse_integer(input: &str) -> Result<U256, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::MalformedNumber(input.to_string()));
    }
    parse_digits(trimmed)
}

pub fn purchase_total(quantity: U256, price_per_unit: U256) -> Result<U256, AmountError> {
    quantity.checked_mul(price_per_unit).ok_or(AmountError::Overflow)
}

/// Exact `quantity * price` rendered as a decimal, for the purchase form.
pub fn total_cost_preview(quantity: &str, price: &str, decimals: u8) -> Result<String, AmountError> {
    let quantity = parse_integer(quantity)?;
    let price = to_base_units(price, decimals)?;
    from_base_units(purchase_total(quantity, price)?, decimals)
}

fn pow10(decimals: u8) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::Overflow);
    }
    U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or(AmountError::Overflow)
}

// Caller guarantees ascii digits; the only failure left is width.
fn parse_digits(digits: &str) -> Result<U256, AmountError> {
    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow)
}
