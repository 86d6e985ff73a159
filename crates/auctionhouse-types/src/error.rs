//! Error types for the AuctionHouse ledger layer.
//!
//! All errors use the `AH_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Contract violations (deterministic, never retried)
//! - 2xx: Signature errors
//! - 3xx: Ledger / vault errors
//! - 4xx: Flow (orchestration) errors
//! - 5xx: Sequencer errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Currency, PartyKey, StateRef, UniqueId};

/// Central error enum for all AuctionHouse operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    // =================================================================
    // Contract Violations (1xx)
    // =================================================================
    /// A contract rule did not hold. `reason` names the failing requirement.
    #[error("AH_ERR_100: Contract violation in {contract}: {reason}")]
    ContractViolation {
        contract: &'static str,
        reason: String,
    },

    /// The command requires a time window with a `from` bound and none was attached.
    #[error("AH_ERR_101: Missing timestamp: {reason}")]
    MissingTimestamp { reason: String },

    /// States of a contract appear in the transaction but no command of that contract does.
    #[error("AH_ERR_102: Required command missing for {contract}")]
    RequiredCommandMissing { contract: &'static str },

    /// More than one command of the same contract is attached.
    #[error("AH_ERR_103: Ambiguous command: {count} commands for {contract}")]
    AmbiguousCommand {
        contract: &'static str,
        count: usize,
    },

    /// Arithmetic or comparison between amounts of different currencies.
    #[error("AH_ERR_104: Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    /// Amount arithmetic overflowed or went below zero.
    #[error("AH_ERR_105: Amount out of range")]
    AmountOutOfRange,

    // =================================================================
    // Signature Errors (2xx)
    // =================================================================
    /// A key required by one of the commands did not sign.
    #[error("AH_ERR_200: Missing signature from {0}")]
    MissingSignature(PartyKey),

    /// A signature did not verify against the transaction id.
    #[error("AH_ERR_201: Invalid signature from {0}")]
    InvalidSignature(PartyKey),

    // =================================================================
    // Ledger Errors (3xx)
    // =================================================================
    /// No unconsumed state with this linear id exists.
    #[error("AH_ERR_300: State not found: {0}")]
    StateNotFound(UniqueId),

    /// The input was already consumed or is not the current version.
    #[error("AH_ERR_301: Conflicting input: {0} is not the current version")]
    ConflictingInput(StateRef),

    /// The state reference does not point at any recorded state.
    #[error("AH_ERR_302: Unknown state reference: {0}")]
    UnknownStateRef(StateRef),

    /// Unspent cash no longer adds up to what was issued.
    #[error("AH_ERR_303: Cash supply invariant violated: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Flow Errors (4xx)
    // =================================================================
    /// A counterparty declined to countersign.
    #[error("AH_ERR_400: Counterparty {party} rejected the transaction: {reason}")]
    CounterpartyRejected { party: String, reason: String },

    /// The seller tried to bid on their own auction.
    #[error("AH_ERR_401: The seller cannot bid on their own auction")]
    SelfBid,

    /// Only the seller may perform this operation.
    #[error("AH_ERR_402: Only the seller can {action}")]
    NotSeller { action: &'static str },

    /// Only the owner of the item may perform this operation.
    #[error("AH_ERR_403: Only the owner of item {0} can list it")]
    NotOwner(UniqueId),

    /// The item is already listed in an auction.
    #[error("AH_ERR_404: Auction item {0} is already listed")]
    AlreadyListed(UniqueId),

    /// The bounded retry budget for conflicting inputs ran out.
    #[error("AH_ERR_405: Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<AuctionError> },

    /// The caller does not hold enough cash to build the spend.
    #[error("AH_ERR_406: Insufficient cash: need {needed}, have {available}")]
    InsufficientCash { needed: String, available: String },

    // =================================================================
    // Sequencer Errors (5xx)
    // =================================================================
    /// The sequencer refused to finalize the transaction.
    #[error("AH_ERR_500: Sequencer rejected transaction: {reason}")]
    SequencerRejected { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("AH_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("AH_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("AH_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl AuctionError {
    /// Shorthand for a contract rule failure.
    pub fn violation(contract: &'static str, reason: impl Into<String>) -> Self {
        Self::ContractViolation {
            contract,
            reason: reason.into(),
        }
    }

    /// Whether this error is a deterministic rule failure. Missing signatures
    /// count as violations even though the sequencer is the one reporting them.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::ContractViolation { .. }
                | Self::MissingTimestamp { .. }
                | Self::RequiredCommandMissing { .. }
                | Self::AmbiguousCommand { .. }
                | Self::CurrencyMismatch { .. }
                | Self::AmountOutOfRange
                | Self::MissingSignature(_)
        )
    }

    /// Whether re-reading the ledger and rebuilding the transaction may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictingInput(_))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AuctionError>;

impl From<serde_json::Error> for AuctionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
