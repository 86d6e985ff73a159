//! In-process, append-only ledger.
//!
//! Holds every committed transaction, every recorded state version, and the
//! set of versions still unconsumed. [`Ledger::commit`] is the
//! compare-and-swap the sequencer relies on: inputs are checked and consumed
//! under one lock, so two transactions spending the same version can never
//! both commit.
//!
//! The ledger also serves as every node's vault ([`VaultQuery`]).

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use auctionhouse_types::{
    Amount, AuctionError, CashCommand, CommandData, CommittedTransaction, ContractKind,
    LedgerState, Party, Result, StateAndRef, StateRef, Transaction, TxId, UniqueId,
};
use tracing::debug;

use crate::{services::VaultQuery, supply::CashSupply};

/// A committed transaction plus the parties it was distributed to.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub committed: CommittedTransaction,
    pub participants: Vec<Party>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    log: Vec<LedgerEntry>,
    committed: HashSet<TxId>,
    states: HashMap<StateRef, LedgerState>,
    /// Every recorded output, in commit order.
    order: Vec<StateRef>,
    unconsumed: HashSet<StateRef>,
    /// Newest recorded version of each linear state.
    latest: HashMap<UniqueId, StateRef>,
    supply: CashSupply,
}

impl LedgerInner {
    fn check_inputs(&self, tx: &Transaction) -> Result<()> {
        let mut seen = HashSet::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let r = input.state_ref;
            let recorded = self
                .states
                .get(&r)
                .ok_or(AuctionError::UnknownStateRef(r))?;
            if !seen.insert(r) || !self.unconsumed.contains(&r) || *recorded != input.state {
                return Err(AuctionError::ConflictingInput(r));
            }
        }
        Ok(())
    }
}

/// Shared in-memory ledger.
#[derive(Debug, Default)]
pub struct Ledger {
    inner: Mutex<LedgerInner>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check that every input of `tx` is recorded, unconsumed, and unchanged.
    ///
    /// # Errors
    /// - `UnknownStateRef` if an input was never recorded
    /// - `ConflictingInput` if an input is consumed, repeated, or differs
    ///   from the recorded version
    pub fn check_inputs(&self, tx: &Transaction) -> Result<()> {
        self.lock().check_inputs(tx)
    }

    /// Atomically consume the inputs and record the outputs of `committed`.
    ///
    /// # Errors
    /// - `SequencerRejected` if the transaction was already committed
    /// - the errors of [`Ledger::check_inputs`]
    /// - `AmountOutOfRange` if issued cash overflows the supply counter
    pub fn commit(&self, committed: CommittedTransaction, participants: &[Party]) -> Result<()> {
        let mut inner = self.lock();
        let txid = committed.id();
        if inner.committed.contains(&txid) {
            return Err(AuctionError::SequencerRejected {
                reason: format!("{txid} already committed"),
            });
        }
        let tx = committed.tx();
        inner.check_inputs(tx)?;

        let issues_cash = tx
            .commands
            .iter()
            .any(|c| c.value == CommandData::Cash(CashCommand::Issue));
        if issues_cash {
            let mut supply = inner.supply.clone();
            for cash in tx.output_cash() {
                supply.record_issue(&cash.amount)?;
            }
            inner.supply = supply;
        }

        for input in &tx.inputs {
            inner.unconsumed.remove(&input.state_ref);
        }
        for output in committed.output_refs() {
            if let Some(id) = output.state.linear_id() {
                inner.latest.insert(id, output.state_ref);
            }
            inner.order.push(output.state_ref);
            inner.unconsumed.insert(output.state_ref);
            inner.states.insert(output.state_ref, output.state);
        }
        inner.committed.insert(txid);
        debug!(
            tx = %txid,
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            "Recorded transaction"
        );
        inner.log.push(LedgerEntry {
            committed,
            participants: participants.to_vec(),
        });
        Ok(())
    }

    /// The recorded state at `state_ref`, consumed or not.
    #[must_use]
    pub fn state(&self, state_ref: &StateRef) -> Option<LedgerState> {
        self.lock().states.get(state_ref).cloned()
    }

    #[must_use]
    pub fn is_unconsumed(&self, state_ref: &StateRef) -> bool {
        self.lock().unconsumed.contains(state_ref)
    }

    /// Every committed transaction, oldest first.
    #[must_use]
    pub fn transactions(&self) -> Vec<CommittedTransaction> {
        self.lock().log.iter().map(|e| e.committed.clone()).collect()
    }

    /// Committed transactions distributed to `party`, oldest first.
    #[must_use]
    pub fn transactions_for(&self, party: &Party) -> Vec<CommittedTransaction> {
        self.lock()
            .log
            .iter()
            .filter(|e| e.participants.contains(party))
            .map(|e| e.committed.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().log.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().log.is_empty()
    }

    /// Check that unconsumed cash equals issued cash in every currency.
    ///
    /// # Errors
    /// [`AuctionError::SupplyInvariantViolation`] on the first mismatch.
    pub fn verify_cash_supply(&self) -> Result<()> {
        let inner = self.lock();
        for currency in inner.supply.currencies() {
            let unconsumed = inner
                .order
                .iter()
                .filter(|r| inner.unconsumed.contains(*r))
                .filter_map(|r| inner.states.get(r).and_then(LedgerState::as_cash))
                .filter(|c| c.amount.currency == currency)
                .map(|c| &c.amount);
            let actual = Amount::sum(unconsumed, &currency)?;
            inner.supply.verify(&actual)?;
        }
        Ok(())
    }
}

impl VaultQuery for Ledger {
    fn find_latest_by_id(&self, id: UniqueId) -> Option<StateAndRef> {
        let inner = self.lock();
        let state_ref = *inner.latest.get(&id)?;
        if !inner.unconsumed.contains(&state_ref) {
            return None;
        }
        inner.states.get(&state_ref).map(|state| StateAndRef {
            state_ref,
            state: state.clone(),
        })
    }

    fn find_all_by_type(&self, kind: ContractKind) -> Vec<StateAndRef> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter(|r| inner.unconsumed.contains(*r))
            .filter_map(|r| {
                inner
                    .states
                    .get(r)
                    .filter(|s| s.contract() == kind)
                    .map(|s| StateAndRef {
                        state_ref: *r,
                        state: s.clone(),
                    })
            })
            .collect()
    }
}
