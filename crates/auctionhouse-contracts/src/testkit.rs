//! Shared fixtures for the rule tests.

use auctionhouse_types::{
    Amount, Command, CommandData, Currency, Identity, LedgerState, PartyKey, StateAndRef,
    StateRef, TimeWindow, Transaction, TxId, UniqueId,
};
use chrono::{DateTime, Duration, Utc};

pub(crate) struct World {
    pub alice: Identity,
    pub bob: Identity,
    pub charlie: Identity,
    pub bank: Identity,
    pub sequencer: Identity,
    pub now: DateTime<Utc>,
}

pub(crate) fn world() -> World {
    World {
        alice: Identity::from_seed("Alice", [1; 32]),
        bob: Identity::from_seed("Bob", [2; 32]),
        charlie: Identity::from_seed("Charlie", [3; 32]),
        bank: Identity::from_seed("Bank", [4; 32]),
        sequencer: Identity::from_seed("Sequencer", [5; 32]),
        now: Utc::now(),
    }
}

pub(crate) fn gbp(units: i64) -> Amount {
    Amount::from_major(units, Currency::gbp()).unwrap()
}

pub(crate) fn hours(n: i64) -> Duration {
    Duration::hours(n)
}

/// Incremental transaction builder for rule tests.
pub(crate) struct Draft {
    tx: Transaction,
}

impl Draft {
    pub(crate) fn new(w: &World) -> Self {
        Self {
            tx: Transaction {
                inputs: vec![],
                outputs: vec![],
                commands: vec![],
                time_window: None,
                sequencer: w.sequencer.party().clone(),
                salt: UniqueId::new(),
            },
        }
    }

    pub(crate) fn input(mut self, state: impl Into<LedgerState>) -> Self {
        let txid = TxId([self.tx.inputs.len() as u8 + 1; 32]);
        self.tx.inputs.push(StateAndRef {
            state_ref: StateRef::new(txid, 0),
            state: state.into(),
        });
        self
    }

    pub(crate) fn output(mut self, state: impl Into<LedgerState>) -> Self {
        self.tx.outputs.push(state.into());
        self
    }

    pub(crate) fn command(mut self, value: impl Into<CommandData>, signers: &[PartyKey]) -> Self {
        self.tx.commands.push(Command::new(value, signers.iter().copied()));
        self
    }

    pub(crate) fn from(mut self, from: DateTime<Utc>) -> Self {
        self.tx.time_window = Some(TimeWindow::from_only(from));
        self
    }

    pub(crate) fn build(self) -> Transaction {
        self.tx
    }
}
