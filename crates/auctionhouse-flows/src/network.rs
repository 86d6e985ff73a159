//! In-process session network.
//!
//! Every node registers a [`Responder`] under its key. A [`LocalSession`]
//! carries each message through `serde_json` before handing it to the
//! counterparty's responder, so nothing crosses a node boundary that could
//! not cross a real wire.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use auctionhouse_contracts::verify_transaction;
use auctionhouse_types::{
    AuctionError, CommittedTransaction, FlowConfig, Identity, Party, PartyKey, Result,
    SignedTransaction, TransactionSignature,
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::{
    context::NodeContext,
    ledger::Ledger,
    scheduler::{SettlementScheduler, track_committed},
    services::{Clock, Scheduler, Sequencer, Session, SessionFactory},
};

/// Whether a responder countersigns requests that pass its checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponderPolicy {
    #[default]
    Accept,
    Decline(String),
}

/// The counterparty side of every flow run by a node.
pub struct Responder {
    identity: Arc<Identity>,
    sequencer: Party,
    scheduler: Arc<dyn Scheduler>,
    policy: Mutex<ResponderPolicy>,
}

impl Responder {
    #[must_use]
    pub fn new(identity: Arc<Identity>, sequencer: Party, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            identity,
            sequencer,
            scheduler,
            policy: Mutex::new(ResponderPolicy::Accept),
        }
    }

    #[must_use]
    pub fn party(&self) -> &Party {
        self.identity.party()
    }

    pub fn set_policy(&self, policy: ResponderPolicy) {
        *self.policy.lock().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    fn reject(&self, reason: impl Into<String>) -> AuctionError {
        AuctionError::CounterpartyRejected {
            party: self.identity.party().name.clone(),
            reason: reason.into(),
        }
    }

    /// Check a proposal independently and countersign it.
    ///
    /// # Errors
    /// `CounterpartyRejected` if the policy declines, the contracts fail,
    /// this node is not a required signer, or an attached signature is bad.
    pub fn handle_sign_request(&self, stx: &SignedTransaction) -> Result<TransactionSignature> {
        let txid = stx.id();
        let me = self.identity.key();
        if let ResponderPolicy::Decline(reason) =
            &*self.policy.lock().unwrap_or_else(PoisonError::into_inner)
        {
            info!(party = %self.party(), tx = %txid, reason = %reason, "Declined to sign");
            return Err(self.reject(reason.clone()));
        }
        verify_transaction(&stx.tx).map_err(|e| self.reject(e.to_string()))?;
        if !stx.tx.required_signers().contains(&me) {
            return Err(self.reject("not a required signer"));
        }
        let missing: Vec<PartyKey> = stx.missing_signatures().into_iter().collect();
        stx.verify_signatures_except(&missing)
            .map_err(|e| self.reject(e.to_string()))?;
        debug!(party = %self.party(), tx = %txid, "Countersigned");
        Ok(self.identity.sign(&txid))
    }

    /// Record a committed transaction this node takes part in.
    ///
    /// # Errors
    /// `InvalidSignature` if the sequencer signature does not verify.
    pub fn handle_committed(&self, committed: &CommittedTransaction) -> Result<()> {
        let signature = &committed.sequencer_signature;
        if signature.by != self.sequencer.key {
            return Err(AuctionError::InvalidSignature(signature.by));
        }
        self.sequencer.key.verify(&committed.id(), &signature.bytes)?;
        track_committed(self.scheduler.as_ref(), self.party(), committed);
        Ok(())
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("party", self.party())
            .finish_non_exhaustive()
    }
}

/// Serialize and parse back, as a wire would.
fn over_wire<T: Serialize + DeserializeOwned>(value: &T) -> Result<T> {
    let bytes = serde_json::to_vec(value)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// A session to a responder in the same process.
pub struct LocalSession {
    counterparty: Party,
    responder: Arc<Responder>,
    reply: Option<Result<SignedTransaction>>,
}

impl Session for LocalSession {
    fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    fn send(&mut self, stx: &SignedTransaction) -> Result<()> {
        let received = over_wire(stx)?;
        let reply = self
            .responder
            .handle_sign_request(&received)
            .and_then(|sig| over_wire(&received.with_signature(sig)));
        self.reply = Some(reply);
        Ok(())
    }

    fn receive(&mut self) -> Result<SignedTransaction> {
        self.reply
            .take()
            .unwrap_or_else(|| Err(AuctionError::Internal("receive without a pending send".into())))
    }

    fn send_committed(&mut self, committed: &CommittedTransaction) -> Result<()> {
        self.responder.handle_committed(&over_wire(committed)?)
    }
}

/// Registry of every node's responder.
#[derive(Debug, Default)]
pub struct LocalNetwork {
    nodes: RwLock<HashMap<PartyKey, Arc<Responder>>>,
}

impl LocalNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, responder: Arc<Responder>) {
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(responder.party().key, responder);
    }

    #[must_use]
    pub fn responder(&self, party: &Party) -> Option<Arc<Responder>> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&party.key)
            .cloned()
    }

    /// Bring up a node for `identity` on this network.
    ///
    /// The node gets its own scheduler and responder and reads the shared
    /// `ledger` as its vault.
    pub fn join(
        self: &Arc<Self>,
        identity: Identity,
        clock: Arc<dyn Clock>,
        ledger: Arc<Ledger>,
        sequencer: Arc<dyn Sequencer>,
        config: FlowConfig,
    ) -> (NodeContext, Arc<Responder>) {
        let identity = Arc::new(identity);
        let scheduler: Arc<dyn Scheduler> = Arc::new(SettlementScheduler::new());
        let responder = Arc::new(Responder::new(
            identity.clone(),
            sequencer.party(),
            scheduler.clone(),
        ));
        self.register(responder.clone());
        let ctx = NodeContext {
            identity,
            clock,
            vault: ledger,
            sessions: self.clone(),
            sequencer,
            scheduler,
            config,
        };
        (ctx, responder)
    }
}

impl SessionFactory for LocalNetwork {
    fn open(&self, counterparty: &Party) -> Result<Box<dyn Session>> {
        let Some(responder) = self.responder(counterparty) else {
            warn!(party = %counterparty, "No route to party");
            return Err(AuctionError::CounterpartyRejected {
                party: counterparty.name.clone(),
                reason: "no route to party".into(),
            });
        };
        Ok(Box::new(LocalSession {
            counterparty: counterparty.clone(),
            responder,
            reply: None,
        }))
    }
}
