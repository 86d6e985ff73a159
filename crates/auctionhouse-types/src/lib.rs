//! # auctionhouse-types
//!
//! Shared types, errors, and configuration for the **AuctionHouse** ledger layer.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UniqueId`], [`TxId`], [`StateRef`]
//! - **Money**: [`Amount`], [`Currency`]
//! - **Parties**: [`Party`], [`PartyKey`], [`Identity`]
//! - **States**: [`AuctionItemState`], [`AuctionState`], [`CashState`], [`LedgerState`]
//! - **Transactions**: [`Transaction`], [`Command`], [`CommandData`], [`TimeWindow`],
//!   [`SignedTransaction`], [`CommittedTransaction`]
//! - **Configuration**: [`FlowConfig`], [`RetryConfig`], [`SequencerConfig`]
//! - **Errors**: [`AuctionError`] with `AH_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod party;
pub mod state;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use auctionhouse_types::{AuctionState, Transaction, Amount, ...};

pub use amount::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use party::*;
pub use state::*;
pub use transaction::*;

// Constants are accessed via `auctionhouse_types::constants::FOO`
// (not re-exported to avoid name collisions).
