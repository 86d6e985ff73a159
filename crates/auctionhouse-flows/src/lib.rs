//! # auctionhouse-flows
//!
//! **Orchestration plane**: builds proposals, collects countersignatures,
//! submits them to the sequencer and schedules settlement.
//!
//! ## Architecture
//!
//! A flow runs against a [`NodeContext`] and:
//! 1. Reads the latest state versions from the vault
//! 2. Runs local pre-checks (ownership, self-bids, balance)
//! 3. Builds and verifies a transaction, signs it as initiator
//! 4. Collects counterparty signatures over [`Session`]s
//! 5. Finalizes with the [`Sequencer`], rerunning on `ConflictingInput`
//! 6. Distributes the result and updates settlement triggers
//!
//! ## In-process node set
//!
//! - [`Ledger`]: append-only store, doubles as every node's vault
//! - [`LocalSequencer`]: validating single-authority sequencer
//! - [`LocalNetwork`]: JSON-over-memory sessions to each node's [`Responder`]
//! - [`SettlementScheduler`]: one trigger per auction, superseded by version

pub mod builder;
pub mod clock;
pub mod context;
pub mod flows;
pub mod ledger;
pub mod network;
pub mod queries;
pub mod retry;
pub mod scheduler;
pub mod sequencer;
pub mod services;
pub mod supply;

pub use builder::{TransactionBuilder, finalize};
pub use clock::{ManualClock, SystemClock};
pub use context::NodeContext;
pub use flows::{
    SettleOutcome, bid, end_auction, issue_cash, issue_item, list_item, on_trigger,
    run_scheduled, settle,
};
pub use ledger::{Ledger, LedgerEntry};
pub use network::{LocalNetwork, LocalSession, Responder, ResponderPolicy};
pub use retry::with_conflict_retry;
pub use scheduler::{SettlementScheduler, track_committed};
pub use sequencer::LocalSequencer;
pub use services::{
    Clock, Scheduler, Sequencer, Session, SessionFactory, SettlementTrigger, VaultQuery,
};
pub use supply::CashSupply;
