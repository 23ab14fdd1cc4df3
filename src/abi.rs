//! Solidity interface of the bond market contract.
//!
//! `sol!` generates one call struct per function (`issueBondCall`, ...) and
//! the `BondMarketCalls` enum over all of them; both encode straight to
//! calldata (selector followed by the ABI-encoded arguments).

use alloy_primitives::Address;
use alloy_sol_types::sol;

use crate::address::AccountId;

sol! {
    #[sol(all_derives)]
    #[derive(Debug, PartialEq, Eq)]
    interface BondMarket {
        function issueBond(
            string name,
            string symbol,
            string description,
            uint256 faceValue,
            uint256 couponRate,
            uint256 maturityPeriod,
            uint256 totalSupply
        ) external;

        function purchaseBond(uint256 bondId, uint256 quantity, uint256 price) external payable;

        function executeTrade(uint256 bondId, uint256 quantity, uint256 price, address seller) external;
    }
}

pub use BondMarket::{BondMarketCalls, executeTradeCall, issueBondCall, purchaseBondCall};

impl From<AccountId> for Address {
    fn from(account: AccountId) -> Self {
        Address::from(*account.as_bytes())
    }
}

// `sol!` derives `Clone` on the call structs but not on the calls enum, and a
// contract-level `#[derive(Clone)]` would collide with the structs' own derive.
impl Clone for BondMarketCalls {
    fn clone(&self) -> Self {
        match self {
            Self::issueBond(call) => Self::issueBond(call.clone()),
            Self::purchaseBond(call) => Self::purchaseBond(call.clone()),
            Self::executeTrade(call) => Self::executeTrade(call.clone()),
        }
    }
}
