//! # auctionhouse-contracts
//!
//! **Pure deterministic verification of AuctionHouse transactions.**
//!
//! Contracts are the rule sets every party runs before signing and the
//! sequencer runs before committing. They have:
//!
//! - **Zero side effects**: no ledger reads, no clock, no I/O
//! - **Deterministic output**: same transaction -> same verdict and reason on every node
//! - **Closed command sets**: one rule set per (contract, command), dispatched by `match`

pub mod auction;
pub mod cash;
pub mod engine;
pub mod item;
mod requirements;

#[cfg(test)]
mod testkit;

pub use auction::AuctionContract;
pub use cash::CashContract;
pub use engine::{Contract, contracts, select_command, verify_transaction};
pub use item::AuctionItemContract;
