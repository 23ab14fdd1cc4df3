//! Transaction desk for an on-chain bond market.
//!
//! Turns issue / purchase / trade forms into contract calls, submits them
//! through a wallet provider and tracks each operation's lifecycle until it
//! settles on-chain.

pub mod abi;
pub mod address;
pub mod amount;
pub mod call;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod form;
pub mod plugin;
pub mod rpc;
pub mod runner;
pub mod session;
pub mod status;

#[cfg(test)]
mod tests;

pub use address::AccountId;
pub use call::{CallBuilder, CallDescriptor, OperationKind};
pub use config::DeskSettings;
pub use coordinator::{LifecycleState, TransactionCoordinator, TxHandle};
pub use plugin::BondDeskPlugin;
pub use status::SlotStatus;
