//! Raw form input and its validation into typed requests.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::address::AccountId;
use crate::amount::{self, Decimal};
use crate::call::OperationKind;
use crate::error::{AmountError, FieldErrorKind, ValidationErrors};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuanceForm {
    pub name: String,
    pub symbol: String,
    pub description: String,
    #[serde(rename = "faceValue")]
    pub face_value: String,
    #[serde(rename = "couponRate")]
    pub coupon_rate: String,
    #[serde(rename = "maturityPeriod")]
    pub maturity_period: String,
    #[serde(rename = "totalSupply")]
    pub total_supply: String,
}

/// Shared by the purchase and trade forms; `seller` only matters for trades.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeForm {
    #[serde(rename = "bondId")]
    pub bond_id: String,
    pub quantity: String,
    pub price: String,
    pub seller: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OperationForm {
    Issue(IssuanceForm),
    Purchase(TradeForm),
    Trade(TradeForm),
}

impl OperationForm {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationForm::Issue(_) => OperationKind::Issue,
            OperationForm::Purchase(_) => OperationKind::Purchase,
            OperationForm::Trade(_) => OperationKind::Trade,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondIssuanceRequest {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub face_value: Decimal,
    /// Percent, e.g. `5` for 5%.
    pub coupon_rate: Decimal,
    pub maturity_period_days: U256,
    pub total_supply: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    pub bond_id: U256,
    pub quantity: U256,
    pub price: Decimal,
    pub seller: Option<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Issue(BondIssuanceRequest),
    Purchase(TradeRequest),
    Trade(TradeRequest),
}

pub fn validate_issuance(form: &IssuanceForm) -> Result<BondIssuanceRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = required_text("name", &form.name, &mut errors);
    let symbol = required_text("symbol", &form.symbol, &mut errors);
    let face_value = positive_decimal("faceValue", &form.face_value, &mut errors);
    let coupon_rate = non_negative_decimal("couponRate", &form.coupon_rate, &mut errors);
    let maturity_period_days = positive_integer("maturityPeriod", &form.maturity_period, &mut errors);
    let total_supply = positive_integer("totalSupply", &form.total_supply, &mut errors);

    match (name, symbol, face_value, coupon_rate, maturity_period_days, total_supply) {
        (Some(name), Some(symbol), Some(face_value), Some(coupon_rate), Some(maturity_period_days), Some(total_supply))
            if errors.is_empty() =>
        {
            Ok(BondIssuanceRequest {
                name,
                symbol,
                description: form.description.clone(),
                face_value,
                coupon_rate,
                maturity_period_days,
                total_supply,
            })
        }
        _ => Err(errors),
    }
}

pub fn validate_trade(form: &TradeForm, require_seller: bool) -> Result<TradeRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let bond_id = non_negative_integer("bondId", &form.bond_id, &mut errors);
    let quantity = positive_integer("quantity", &form.quantity, &mut errors);
    let price = positive_decimal("price", &form.price, &mut errors);
    let seller = if require_seller {
        match AccountId::parse(&form.seller) {
            Ok(account) => Some(account),
            Err(_) => {
                errors.push("seller", FieldErrorKind::InvalidAddress);
                None
            }
        }
    } else {
        None
    };

    match (bond_id, quantity, price) {
        (Some(bond_id), Some(quantity), Some(price)) if errors.is_empty() => Ok(TradeRequest {
            bond_id,
            quantity,
            price,
            seller,
        }),
        _ => Err(errors),
    }
}

pub fn validate(form: &OperationForm) -> Result<OperationRequest, ValidationErrors> {
    match form {
        OperationForm::Issue(f) => validate_issuance(f).map(OperationRequest::Issue),
        OperationForm::Purchase(f) => validate_trade(f, false).map(OperationRequest::Purchase),
        OperationForm::Trade(f) => validate_trade(f, true).map(OperationRequest::Trade),
    }
}

fn required_text(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(field, FieldErrorKind::EmptyField);
        return None;
    }
    Some(value.to_string())
}

// Splits off a leading minus so "-5" reads as a negative number rather than garbage.
fn signed_decimal(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<(bool, Decimal)> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(field, FieldErrorKind::EmptyField);
        return None;
    }
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    match Decimal::parse(digits) {
        Ok(decimal) => Some((negative && !decimal.is_zero(), decimal)),
        Err(_) => {
            errors.push(field, FieldErrorKind::MalformedNumber);
            None
        }
    }
}

fn positive_decimal(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<Decimal> {
    let (negative, decimal) = signed_decimal(field, raw, errors)?;
    if negative || decimal.is_zero() {
        errors.push(field, FieldErrorKind::NotPositive);
        return None;
    }
    Some(decimal)
}

fn non_negative_decimal(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<Decimal> {
    let (negative, decimal) = signed_decimal(field, raw, errors)?;
    if negative {
        errors.push(field, FieldErrorKind::OutOfRange);
        return None;
    }
    Some(decimal)
}

fn signed_integer(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<(bool, U256)> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(field, FieldErrorKind::EmptyField);
        return None;
    }
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    match amount::parse_integer(digits) {
        Ok(n) => Some((negative && !n.is_zero(), n)),
        Err(AmountError::Overflow) => {
            errors.push(field, FieldErrorKind::OutOfRange);
            None
        }
        Err(AmountError::MalformedNumber(_)) => {
            errors.push(field, FieldErrorKind::MalformedNumber);
            None
        }
    }
}

fn positive_integer(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<U256> {
    let (negative, n) = signed_integer(field, raw, errors)?;
    if negative || n.is_zero() {
        errors.push(field, FieldErrorKind::NotPositive);
        return None;
    }
    Some(n)
}

fn non_negative_integer(field: &'static str, raw: &str, errors: &mut ValidationErrors) -> Option<U256> {
    let (negative, n) = signed_integer(field, raw, errors)?;
    if negative {
        errors.push(field, FieldErrorKind::OutOfRange);
        return None;
    }
    Some(n)
}
