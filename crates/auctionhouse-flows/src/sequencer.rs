//! Single-authority validating sequencer.
//!
//! ```text
//! finalize(stx):
//!   1. addressed to this sequencer?
//!   2. every required signer signed, every signature valid
//!   3. time window contains the sequencer's clock
//!   4. contracts re-verified
//!   5. inputs unconsumed and unchanged  -> ConflictingInput
//!   6. sign, record atomically
//! ```

use std::sync::Arc;

use auctionhouse_contracts::verify_transaction;
use auctionhouse_types::{
    AuctionError, CommittedTransaction, Identity, Party, Result, SequencerConfig,
    SignedTransaction,
};
use tracing::{info, warn};

use crate::{
    ledger::Ledger,
    services::{Clock, Sequencer},
};

/// Sequencer that validates and records into a shared [`Ledger`].
pub struct LocalSequencer {
    identity: Identity,
    config: SequencerConfig,
    clock: Arc<dyn Clock>,
    ledger: Arc<Ledger>,
}

impl LocalSequencer {
    #[must_use]
    pub fn new(
        identity: Identity,
        config: SequencerConfig,
        clock: Arc<dyn Clock>,
        ledger: Arc<Ledger>,
    ) -> Self {
        Self {
            identity,
            config,
            clock,
            ledger,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn check(&self, stx: &SignedTransaction) -> Result<()> {
        if stx.tx.sequencer != *self.identity.party() {
            return Err(AuctionError::SequencerRejected {
                reason: format!("addressed to {}, not {}", stx.tx.sequencer, self.identity.party()),
            });
        }
        stx.verify_signatures()?;
        let now = self.clock.now();
        let outside = stx.tx.time_window.is_some_and(|tw| !tw.contains(now));
        if self.config.validate_time_window && outside {
            return Err(AuctionError::SequencerRejected {
                reason: format!("time window does not contain {now}"),
            });
        }
        verify_transaction(&stx.tx)?;
        self.ledger.check_inputs(&stx.tx)
    }
}

impl Sequencer for LocalSequencer {
    fn party(&self) -> Party {
        self.identity.party().clone()
    }

    fn finalize(
        &self,
        stx: SignedTransaction,
        participants: &[Party],
    ) -> Result<CommittedTransaction> {
        let txid = stx.id();
        let result = self.check(&stx).and_then(|()| {
            let committed = CommittedTransaction {
                sequencer_signature: self.identity.sign(&txid),
                committed_at: self.clock.now(),
                stx,
            };
            self.ledger.commit(committed.clone(), participants)?;
            Ok(committed)
        });
        match &result {
            Ok(_) => info!(
                sequencer = %self.config.name,
                tx = %txid,
                participants = participants.len(),
                "Committed transaction"
            ),
            Err(err) => warn!(sequencer = %self.config.name, tx = %txid, error = %err, "Rejected transaction"),
        }
        result
    }
}

impl std::fmt::Debug for LocalSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSequencer")
            .field("party", self.identity.party())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
