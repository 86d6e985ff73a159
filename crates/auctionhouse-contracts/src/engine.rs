//! Transaction verification entry point.
//!
//! Every contract whose states appear in a transaction must find exactly one
//! of its own commands attached; that command's rule set then runs against
//! the whole transaction. Contracts run in a fixed order and the first
//! failure is reported, so every party reaches the same verdict with the
//! same reason.
//!
//! ```text
//! verify_transaction(&Transaction) -> Result<()>
//! ```

use auctionhouse_types::{AuctionError, Command, ContractKind, Result, Transaction};
use tracing::debug;

use crate::{AuctionContract, AuctionItemContract, CashContract};

/// A rule set for one family of states.
pub trait Contract {
    fn kind(&self) -> ContractKind;

    /// Check `tx` against the rules of `command`.
    fn verify(&self, tx: &Transaction, command: &Command) -> Result<()>;
}

/// Every registered contract, in verification order.
#[must_use]
pub fn contracts() -> [&'static dyn Contract; 3] {
    [&AuctionItemContract, &AuctionContract, &CashContract]
}

/// Pick the single command of `kind`.
///
/// Returns `Ok(None)` when the contract neither has states nor commands in
/// the transaction.
///
/// # Errors
/// - `RequiredCommandMissing` if states of `kind` are present without a command
/// - `AmbiguousCommand` if more than one command of `kind` is attached
pub fn select_command(tx: &Transaction, kind: ContractKind) -> Result<Option<&Command>> {
    match tx.commands_for(kind).as_slice() {
        [] if tx.touches(kind) => Err(AuctionError::RequiredCommandMissing {
            contract: kind.name(),
        }),
        [] => Ok(None),
        [command] => Ok(Some(*command)),
        many => Err(AuctionError::AmbiguousCommand {
            contract: kind.name(),
            count: many.len(),
        }),
    }
}

/// Verify `tx` against every contract it involves.
///
/// Pure and deterministic: no clock, no I/O. The time window is part of
/// the transaction.
pub fn verify_transaction(tx: &Transaction) -> Result<()> {
    if tx.inputs.is_empty() && tx.outputs.is_empty() {
        return Err(AuctionError::violation(
            "Transaction",
            "A transaction must consume or produce at least one state",
        ));
    }
    for contract in contracts() {
        let kind = contract.kind();
        let Some(command) = select_command(tx, kind)? else {
            continue;
        };
        if let Err(err) = contract.verify(tx, command) {
            debug!(contract = %kind, command = %command.value, error = %err, "Transaction rejected");
            return Err(err);
        }
        debug!(contract = %kind, command = %command.value, "Contract verified");
    }
    Ok(())
}
