//! Collaborators a flow talks to.
//!
//! Flows never reach for globals: everything they touch arrives through a
//! [`NodeContext`](crate::NodeContext) holding these trait objects. The
//! in-process implementations live in [`clock`](crate::clock),
//! [`ledger`](crate::ledger), [`network`](crate::network),
//! [`sequencer`](crate::sequencer) and [`scheduler`](crate::scheduler).

use auctionhouse_types::{
    CommittedTransaction, ContractKind, Party, Result, SignedTransaction, StateAndRef, StateRef,
    UniqueId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Read access to unconsumed ledger states.
pub trait VaultQuery: Send + Sync {
    /// Current unconsumed version of the linear state `id`.
    fn find_latest_by_id(&self, id: UniqueId) -> Option<StateAndRef>;

    /// Every unconsumed state governed by `kind`, in commit order.
    fn find_all_by_type(&self, kind: ContractKind) -> Vec<StateAndRef>;
}

/// One request/response conversation with a counterparty.
pub trait Session {
    fn counterparty(&self) -> &Party;

    /// Ask the counterparty to check and countersign.
    fn send(&mut self, stx: &SignedTransaction) -> Result<()>;

    /// The counterparty's answer to the last [`send`](Session::send).
    fn receive(&mut self) -> Result<SignedTransaction>;

    /// Tell the counterparty a transaction it takes part in was committed.
    fn send_committed(&mut self, committed: &CommittedTransaction) -> Result<()>;
}

/// Opens sessions to other parties.
pub trait SessionFactory: Send + Sync {
    fn open(&self, counterparty: &Party) -> Result<Box<dyn Session>>;
}

/// The single authority that orders transactions and rejects stale inputs.
pub trait Sequencer: Send + Sync {
    fn party(&self) -> Party;

    /// Check and commit a fully signed transaction.
    ///
    /// # Errors
    /// - `MissingSignature` / `InvalidSignature` for bad signatures
    /// - contract violations from re-verification
    /// - `ConflictingInput` when an input was already consumed
    /// - `SequencerRejected` for anything else the sequencer refuses
    fn finalize(
        &self,
        stx: SignedTransaction,
        participants: &[Party],
    ) -> Result<CommittedTransaction>;
}

/// A pending settlement for one auction version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTrigger {
    pub auction_id: UniqueId,
    /// The auction version this trigger was scheduled for.
    pub state_ref: StateRef,
    pub at: DateTime<Utc>,
}

/// Timed settlement triggers, at most one per auction.
pub trait Scheduler: Send + Sync {
    /// Schedule `trigger`, superseding any earlier trigger for the same auction.
    fn schedule_at(&self, trigger: SettlementTrigger);

    /// Drop the trigger for `auction_id`, returning it if one was pending.
    fn cancel(&self, auction_id: UniqueId) -> Option<SettlementTrigger>;

    /// Remove and return every trigger strictly due before `now`, oldest first.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<SettlementTrigger>;

    /// Snapshot of pending triggers, oldest first.
    fn pending(&self) -> Vec<SettlementTrigger>;
}
