//! Proposal assembly and the common path to finality.
//!
//! ```text
//! finalize(ctx, tx):
//!   1. verify contracts locally
//!   2. sign as initiator
//!   3. for each other required signer: open session, send, receive, check
//!   4. sequencer.finalize(stx, participants)
//!   5. send the committed transaction to the other participants
//!   6. update this node's settlement triggers
//! ```

use std::collections::BTreeSet;

use auctionhouse_contracts::verify_transaction;
use auctionhouse_types::{
    AuctionError, Command, CommandData, CommittedTransaction, LedgerState, Party, PartyKey,
    Result, SignedTransaction, StateAndRef, TimeWindow, Transaction, UniqueId,
};
use tracing::{debug, warn};

use crate::{context::NodeContext, scheduler::track_committed};

/// Fluent builder for a [`Transaction`] addressed to one sequencer.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    inputs: Vec<StateAndRef>,
    outputs: Vec<LedgerState>,
    commands: Vec<Command>,
    time_window: Option<TimeWindow>,
    sequencer: Party,
}

impl TransactionBuilder {
    #[must_use]
    pub fn new(sequencer: Party) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            commands: Vec::new(),
            time_window: None,
            sequencer,
        }
    }

    #[must_use]
    pub fn input(mut self, input: StateAndRef) -> Self {
        self.inputs.push(input);
        self
    }

    #[must_use]
    pub fn inputs(mut self, inputs: impl IntoIterator<Item = StateAndRef>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    #[must_use]
    pub fn output(mut self, state: impl Into<LedgerState>) -> Self {
        self.outputs.push(state.into());
        self
    }

    #[must_use]
    pub fn outputs<S: Into<LedgerState>>(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.outputs.extend(states.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn command(
        mut self,
        value: impl Into<CommandData>,
        signers: impl IntoIterator<Item = PartyKey>,
    ) -> Self {
        self.commands.push(Command::new(value, signers));
        self
    }

    #[must_use]
    pub fn time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Finish with a fresh salt.
    #[must_use]
    pub fn build(self) -> Transaction {
        Transaction {
            inputs: self.inputs,
            outputs: self.outputs,
            commands: self.commands,
            time_window: self.time_window,
            sequencer: self.sequencer,
            salt: UniqueId::new(),
        }
    }
}

/// Sign `tx`, collect every other required signature, commit it and tell
/// the other participants.
///
/// # Errors
/// - contract violations from local verification
/// - `CounterpartyRejected` if a counterparty declines or answers with a
///   different transaction
/// - whatever the sequencer rejects with, `ConflictingInput` included
pub fn finalize(ctx: &NodeContext, tx: Transaction) -> Result<CommittedTransaction> {
    verify_transaction(&tx)?;

    let me = ctx.me().clone();
    let participants: BTreeSet<Party> = tx
        .participants()
        .into_iter()
        .chain(std::iter::once(me.clone()))
        .collect();
    let mut stx = SignedTransaction::new(tx);
    let txid = stx.id();
    if stx.tx.required_signers().contains(&me.key) {
        stx = stx.with_signature(ctx.identity.sign(&txid));
    }

    for key in stx.missing_signatures() {
        let counterparty = participants
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| AuctionError::Internal(format!("no participant holds signer {key}")))?;
        let mut session = ctx.sessions.open(counterparty)?;
        session.send(&stx)?;
        let reply = session.receive()?;
        if reply.id() != txid {
            return Err(AuctionError::CounterpartyRejected {
                party: counterparty.name.clone(),
                reason: "answered with a different transaction".into(),
            });
        }
        let signature = reply
            .signatures
            .into_iter()
            .find(|s| s.by == key)
            .ok_or(AuctionError::MissingSignature(key))?;
        debug!(tx = %txid, party = %counterparty, "Collected signature");
        stx = stx.with_signature(signature);
    }

    let participants: Vec<Party> = participants.into_iter().collect();
    let committed = ctx.sequencer.finalize(stx, &participants)?;

    for party in participants.iter().filter(|p| **p != me) {
        let sent = ctx
            .sessions
            .open(party)
            .and_then(|mut session| session.send_committed(&committed));
        if let Err(err) = sent {
            warn!(tx = %txid, party = %party, error = %err, "Failed to distribute committed transaction");
        }
    }
    track_committed(ctx.scheduler.as_ref(), &me, &committed);
    Ok(committed)
}
