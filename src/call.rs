//! Mapping validated requests onto concrete contract calls.

use alloy_primitives::U256;
use alloy_sol_types::{SolCall, SolInterface};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::abi::{BondMarketCalls, executeTradeCall, issueBondCall, purchaseBondCall};
use crate::address::AccountId;
use crate::amount::{self, MAX_DECIMALS};
use crate::error::{AmountError, BuildError, PrepareError};
use crate::form::{self, BondIssuanceRequest, OperationForm, OperationRequest, TradeRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Issue,
    Purchase,
    Trade,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [OperationKind::Issue, OperationKind::Purchase, OperationKind::Trade];

    pub fn index(self) -> usize {
        match self {
            OperationKind::Issue => 0,
            OperationKind::Purchase => 1,
            OperationKind::Trade => 2,
        }
    }

    pub fn function(self) -> ContractFunction {
        match self {
            OperationKind::Issue => ContractFunction::IssueBond,
            OperationKind::Purchase => ContractFunction::PurchaseBond,
            OperationKind::Trade => ContractFunction::ExecuteTrade,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Issue => write!(f, "issue"),
            OperationKind::Purchase => write!(f, "purchase"),
            OperationKind::Trade => write!(f, "trade"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFunction {
    IssueBond,
    PurchaseBond,
    ExecuteTrade,
}

impl ContractFunction {
    pub fn signature(self) -> &'static str {
        match self {
            ContractFunction::IssueBond => issueBondCall::SIGNATURE,
            ContractFunction::PurchaseBond => purchaseBondCall::SIGNATURE,
            ContractFunction::ExecuteTrade => executeTradeCall::SIGNATURE,
        }
    }

    pub fn selector(self) -> [u8; 4] {
        match self {
            ContractFunction::IssueBond => issueBondCall::SELECTOR,
            ContractFunction::PurchaseBond => purchaseBondCall::SELECTOR,
            ContractFunction::ExecuteTrade => executeTradeCall::SELECTOR,
        }
    }

    pub fn is_payable(self) -> bool {
        matches!(self, ContractFunction::PurchaseBond)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub kind: OperationKind,
    pub contract: AccountId,
    pub call: BondMarketCalls,
    /// Wei attached to the call; non-zero only for purchases.
    pub value: U256,
}

impl CallDescriptor {
    pub fn function(&self) -> ContractFunction {
        self.kind.function()
    }

    pub fn selector(&self) -> [u8; 4] {
        self.call.selector()
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn calldata(&self) -> Vec<u8> {
        self.call.abi_encode()
    }
}

#[derive(Debug, Clone)]
pub struct CallBuilder {
    contract: AccountId,
    decimals: u8,
}

impl CallBuilder {
    pub fn new(contract: AccountId, decimals: u8) -> Result<Self, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::Overflow);
        }
        Ok(Self { contract, decimals })
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn issue(&self, request: &BondIssuanceRequest) -> Result<CallDescriptor, BuildError> {
        let face_value = request.face_value.to_base_units(self.decimals)?;
        let coupon_rate = request.coupon_rate.to_base_units(self.decimals)?;

        Ok(CallDescriptor {
            kind: OperationKind::Issue,
            contract: self.contract,
            call: BondMarketCalls::issueBond(issueBondCall {
                name: request.name.clone(),
                symbol: request.symbol.clone(),
                description: request.description.clone(),
                faceValue: face_value,
                couponRate: coupon_rate,
                maturityPeriod: request.maturity_period_days,
                totalSupply: request.total_supply,
            }),
            value: U256::ZERO,
        })
    }

    pub fn purchase(&self, request: &TradeRequest) -> Result<CallDescriptor, BuildError> {
        let price = request.price.to_base_units(self.decimals)?;
        let value = amount::purchase_total(request.quantity, price)?;

        Ok(CallDescriptor {
            kind: OperationKind::Purchase,
            contract: self.contract,
            call: BondMarketCalls::purchaseBond(purchaseBondCall {
                bondId: request.bond_id,
                quantity: request.quantity,
                price,
            }),
            value,
        })
    }

    pub fn trade(&self, request: &TradeRequest) -> Result<CallDescriptor, BuildError> {
        let seller = request.seller.ok_or(BuildError::MissingRequiredField("seller"))?;
        let price = request.price.to_base_units(self.decimals)?;

        Ok(CallDescriptor {
            kind: OperationKind::Trade,
            contract: self.contract,
            call: BondMarketCalls::executeTrade(executeTradeCall {
                bondId: request.bond_id,
                quantity: request.quantity,
                price,
                seller: seller.into(),
            }),
            value: U256::ZERO,
        })
    }

    pub fn build(&self, request: &OperationRequest) -> Result<CallDescriptor, BuildError> {
        match request {
            OperationRequest::Issue(r) => self.issue(r),
            OperationRequest::Purchase(r) => self.purchase(r),
            OperationRequest::Trade(r) => self.trade(r),
        }
    }

    /// Validate a raw form and build its call in one step.
    pub fn prepare(&self, form: &OperationForm) -> Result<CallDescriptor, PrepareError> {
        let request = form::validate(form).map_err(PrepareError::Invalid)?;
        self.build(&request).map_err(PrepareError::Build)
    }
}
