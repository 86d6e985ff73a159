//! Transaction model: the value the verification engine inspects.
//!
//! A [`Transaction`] consumes resolved input states (each with the
//! [`StateRef`] it was recorded under), produces output states, and
//! carries commands. Every command names the keys that must sign for it.
//! The transaction id is a SHA-256 hash over a canonical, domain-separated
//! encoding, so every party computes the same id for the same content.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    Amount, AuctionError, AuctionItemState, AuctionState, CashState, ContractKind, LedgerState,
    Party, PartyKey, Result, StateRef, TxId, UniqueId,
};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands understood by the item contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionItemCommand {
    Issue,
    List,
    Transfer,
    Delist,
}

/// Commands understood by the auction contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionCommand {
    List,
    Bid,
    Settle,
    End,
}

/// Commands understood by the cash contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CashCommand {
    Issue,
    Move,
}

/// A command tagged with the contract it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandData {
    AuctionItem(AuctionItemCommand),
    Auction(AuctionCommand),
    Cash(CashCommand),
}

impl CommandData {
    #[must_use]
    pub fn contract(&self) -> ContractKind {
        match self {
            Self::AuctionItem(_) => ContractKind::AuctionItem,
            Self::Auction(_) => ContractKind::Auction,
            Self::Cash(_) => ContractKind::Cash,
        }
    }

    fn tag(self) -> [u8; 2] {
        match self {
            Self::AuctionItem(c) => [0, c as u8],
            Self::Auction(c) => [1, c as u8],
            Self::Cash(c) => [2, c as u8],
        }
    }
}

impl std::fmt::Display for CommandData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuctionItem(c) => write!(f, "AuctionItem.{c:?}"),
            Self::Auction(c) => write!(f, "Auction.{c:?}"),
            Self::Cash(c) => write!(f, "Cash.{c:?}"),
        }
    }
}

impl From<AuctionItemCommand> for CommandData {
    fn from(c: AuctionItemCommand) -> Self {
        Self::AuctionItem(c)
    }
}

impl From<AuctionCommand> for CommandData {
    fn from(c: AuctionCommand) -> Self {
        Self::Auction(c)
    }
}

impl From<CashCommand> for CommandData {
    fn from(c: CashCommand) -> Self {
        Self::Cash(c)
    }
}

/// A command plus the keys that must sign for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub value: CommandData,
    pub signers: Vec<PartyKey>,
}

impl Command {
    pub fn new(value: impl Into<CommandData>, signers: impl IntoIterator<Item = PartyKey>) -> Self {
        Self {
            value: value.into(),
            signers: signers.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn signer_set(&self) -> BTreeSet<PartyKey> {
        self.signers.iter().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// TimeWindow
// ---------------------------------------------------------------------------

/// Half-open validity interval `[from, until)`; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    #[must_use]
    pub fn from_only(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: None,
        }
    }

    #[must_use]
    pub fn until_only(until: DateTime<Utc>) -> Self {
        Self {
            from: None,
            until: Some(until),
        }
    }

    #[must_use]
    pub fn between(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
        }
    }

    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| from <= instant) && self.until.is_none_or(|until| instant < until)
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A consumed input: the state as recorded plus where it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub state_ref: StateRef,
    pub state: LedgerState,
}

/// A proposed state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<StateAndRef>,
    pub outputs: Vec<LedgerState>,
    pub commands: Vec<Command>,
    pub time_window: Option<TimeWindow>,
    /// The sequencer that must finalize this transaction.
    pub sequencer: Party,
    /// Random salt so that otherwise identical transactions get distinct ids.
    pub salt: UniqueId,
}

impl Transaction {
    /// Content hash over the canonical encoding.
    #[must_use]
    pub fn id(&self) -> TxId {
        let mut h = Sha256::new();
        h.update(crate::constants::TX_HASH_DOMAIN);
        h.update(self.salt.as_bytes());
        feed_party(&mut h, &self.sequencer);

        h.update((self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            h.update(input.state_ref.txid.as_bytes());
            h.update(input.state_ref.index.to_le_bytes());
            feed_state(&mut h, &input.state);
        }

        h.update((self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            feed_state(&mut h, output);
        }

        h.update((self.commands.len() as u64).to_le_bytes());
        for command in &self.commands {
            h.update(command.value.tag());
            h.update((command.signers.len() as u64).to_le_bytes());
            for key in &command.signers {
                h.update(key.as_bytes());
            }
        }

        match &self.time_window {
            None => h.update([0u8]),
            Some(tw) => {
                h.update([1u8]);
                feed_opt_time(&mut h, tw.from);
                feed_opt_time(&mut h, tw.until);
            }
        }

        TxId(h.finalize().into())
    }

    /// Lower bound of the attached time window, if any.
    #[must_use]
    pub fn time_from(&self) -> Option<DateTime<Utc>> {
        self.time_window.and_then(|tw| tw.from)
    }

    /// Union of every command's signers.
    #[must_use]
    pub fn required_signers(&self) -> BTreeSet<PartyKey> {
        self.commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect()
    }

    #[must_use]
    pub fn commands_for(&self, contract: ContractKind) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| c.value.contract() == contract)
            .collect()
    }

    /// Whether any input or output is governed by `contract`.
    #[must_use]
    pub fn touches(&self, contract: ContractKind) -> bool {
        self.inputs.iter().any(|i| i.state.contract() == contract)
            || self.outputs.iter().any(|o| o.contract() == contract)
    }

    #[must_use]
    pub fn input_items(&self) -> Vec<&AuctionItemState> {
        self.inputs.iter().filter_map(|i| i.state.as_item()).collect()
    }

    #[must_use]
    pub fn output_items(&self) -> Vec<&AuctionItemState> {
        self.outputs.iter().filter_map(LedgerState::as_item).collect()
    }

    #[must_use]
    pub fn input_auctions(&self) -> Vec<&AuctionState> {
        self.inputs.iter().filter_map(|i| i.state.as_auction()).collect()
    }

    #[must_use]
    pub fn output_auctions(&self) -> Vec<&AuctionState> {
        self.outputs.iter().filter_map(LedgerState::as_auction).collect()
    }

    #[must_use]
    pub fn input_cash(&self) -> Vec<&CashState> {
        self.inputs.iter().filter_map(|i| i.state.as_cash()).collect()
    }

    #[must_use]
    pub fn output_cash(&self) -> Vec<&CashState> {
        self.outputs.iter().filter_map(LedgerState::as_cash).collect()
    }

    /// Every party with a stake in an input or output.
    #[must_use]
    pub fn participants(&self) -> BTreeSet<Party> {
        self.inputs
            .iter()
            .map(|i| &i.state)
            .chain(self.outputs.iter())
            .flat_map(LedgerState::participants)
            .collect()
    }
}

fn feed_str(h: &mut Sha256, s: &str) {
    h.update((s.len() as u64).to_le_bytes());
    h.update(s.as_bytes());
}

fn feed_party(h: &mut Sha256, party: &Party) {
    h.update(party.key.as_bytes());
    feed_str(h, &party.name);
}

fn feed_amount(h: &mut Sha256, amount: &Amount) {
    h.update(amount.quantity.to_le_bytes());
    feed_str(h, amount.currency.code());
}

fn feed_time(h: &mut Sha256, t: DateTime<Utc>) {
    h.update(t.timestamp().to_le_bytes());
    h.update(t.timestamp_subsec_nanos().to_le_bytes());
}

fn feed_opt_time(h: &mut Sha256, t: Option<DateTime<Utc>>) {
    match t {
        None => h.update([0u8]),
        Some(t) => {
            h.update([1u8]);
            feed_time(h, t);
        }
    }
}

fn feed_state(h: &mut Sha256, state: &LedgerState) {
    match state {
        LedgerState::AuctionItem(item) => {
            h.update([0u8]);
            h.update(item.id.as_bytes());
            feed_str(h, &item.description);
            feed_party(h, &item.owner);
            h.update([u8::from(item.listed)]);
        }
        LedgerState::Auction(auction) => {
            h.update([1u8]);
            h.update(auction.id.as_bytes());
            h.update(auction.item_id.as_bytes());
            feed_amount(h, &auction.price);
            feed_party(h, &auction.seller);
            match &auction.bidder {
                None => h.update([0u8]),
                Some(bidder) => {
                    h.update([1u8]);
                    feed_party(h, bidder);
                }
            }
            feed_time(h, auction.expiry);
        }
        LedgerState::Cash(cash) => {
            h.update([2u8]);
            feed_amount(h, &cash.amount);
            feed_party(h, &cash.issuer);
            feed_party(h, &cash.owner);
        }
    }
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// An ed25519 signature over a transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub by: PartyKey,
    pub bytes: Vec<u8>,
}

/// A transaction plus the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    #[must_use]
    pub fn new(tx: Transaction) -> Self {
        Self {
            tx,
            signatures: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TxId {
        self.tx.id()
    }

    /// Add a signature, replacing any earlier one by the same key.
    #[must_use]
    pub fn with_signature(mut self, sig: TransactionSignature) -> Self {
        self.signatures.retain(|s| s.by != sig.by);
        self.signatures.push(sig);
        self
    }

    #[must_use]
    pub fn signed_by(&self) -> BTreeSet<PartyKey> {
        self.signatures.iter().map(|s| s.by).collect()
    }

    /// Required keys that have not signed yet.
    #[must_use]
    pub fn missing_signatures(&self) -> BTreeSet<PartyKey> {
        let signed = self.signed_by();
        self.tx
            .required_signers()
            .into_iter()
            .filter(|k| !signed.contains(k))
            .collect()
    }

    /// Check every attached signature, then that all required keys signed
    /// apart from `allowed_missing`.
    ///
    /// # Errors
    /// - `InvalidSignature` if any attached signature fails to verify
    /// - `MissingSignature` for the first required key that has not signed
    pub fn verify_signatures_except(&self, allowed_missing: &[PartyKey]) -> Result<()> {
        let txid = self.id();
        for sig in &self.signatures {
            sig.by.verify(&txid, &sig.bytes)?;
        }
        match self
            .missing_signatures()
            .into_iter()
            .find(|k| !allowed_missing.contains(k))
        {
            Some(key) => Err(AuctionError::MissingSignature(key)),
            None => Ok(()),
        }
    }

    /// Check that every required key has a valid signature attached.
    pub fn verify_signatures(&self) -> Result<()> {
        self.verify_signatures_except(&[])
    }
}

/// A transaction the sequencer has accepted onto the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub stx: SignedTransaction,
    pub sequencer_signature: TransactionSignature,
    pub committed_at: DateTime<Utc>,
}

impl CommittedTransaction {
    #[must_use]
    pub fn id(&self) -> TxId {
        self.stx.id()
    }

    #[must_use]
    pub fn tx(&self) -> &Transaction {
        &self.stx.tx
    }

    /// Reference to output `index` of this transaction.
    #[must_use]
    pub fn output_ref(&self, index: u32) -> StateRef {
        StateRef::new(self.id(), index)
    }

    /// Outputs with the references they were recorded under.
    #[must_use]
    pub fn output_refs(&self) -> Vec<StateAndRef> {
        let txid = self.id();
        self.stx
            .tx
            .outputs
            .iter()
            .zip(0u32..)
            .map(|(state, index)| StateAndRef {
                state_ref: StateRef::new(txid, index),
                state: state.clone(),
            })
            .collect()
    }

    /// The output carrying linear id `id`, if this transaction produced one.
    #[must_use]
    pub fn output_with_id(&self, id: UniqueId) -> Option<StateAndRef> {
        self.output_refs()
            .into_iter()
            .find(|s| s.state.linear_id() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Currency, Identity};

    fn sample_tx(sequencer: &Party, owner: &Party) -> Transaction {
        Transaction {
            inputs: vec![],
            outputs: vec![AuctionItemState::issue("diamond ring", owner.clone()).into()],
            commands: vec![Command::new(AuctionItemCommand::Issue, [owner.key])],
            time_window: None,
            sequencer: sequencer.clone(),
            salt: UniqueId::new(),
        }
    }

    #[test]
    fn time_window_is_half_open() {
        let t = Utc::now();
        let tw = TimeWindow::between(t, t + chrono::Duration::seconds(10));
        assert!(tw.contains(t));
        assert!(tw.contains(t + chrono::Duration::seconds(9)));
        assert!(!tw.contains(t + chrono::Duration::seconds(10)));
        assert!(!tw.contains(t - chrono::Duration::seconds(1)));
        assert!(TimeWindow::from_only(t).contains(t + chrono::Duration::days(365)));
        assert!(!TimeWindow::until_only(t).contains(t));
    }

    #[test]
    fn id_is_deterministic_and_content_bound() {
        let seq = Identity::from_seed("Sequencer", [0; 32]);
        let alice = Identity::from_seed("Alice", [1; 32]);
        let tx = sample_tx(seq.party(), alice.party());
        assert_eq!(tx.id(), tx.clone().id());

        let mut changed = tx.clone();
        changed.time_window = Some(TimeWindow::from_only(Utc::now()));
        assert_ne!(tx.id(), changed.id());

        let mut resalted = tx.clone();
        resalted.salt = UniqueId::new();
        assert_ne!(tx.id(), resalted.id());
    }

    #[test]
    fn signatures_cover_required_signers() {
        let seq = Identity::from_seed("Sequencer", [0; 32]);
        let alice = Identity::from_seed("Alice", [1; 32]);
        let bob = Identity::from_seed("Bob", [2; 32]);
        let mut tx = sample_tx(seq.party(), alice.party());
        tx.commands[0].signers.push(bob.key());

        let stx = SignedTransaction::new(tx);
        let stx = stx.clone().with_signature(alice.sign(&stx.id()));
        assert_eq!(
            stx.verify_signatures().unwrap_err(),
            AuctionError::MissingSignature(bob.key())
        );
        assert!(stx.verify_signatures_except(&[bob.key()]).is_ok());

        let full = stx.clone().with_signature(bob.sign(&stx.id()));
        assert!(full.verify_signatures().is_ok());
        assert!(full.missing_signatures().is_empty());
    }

    #[test]
    fn forged_signature_detected() {
        let seq = Identity::from_seed("Sequencer", [0; 32]);
        let alice = Identity::from_seed("Alice", [1; 32]);
        let mallory = Identity::from_seed("Mallory", [6; 32]);
        let stx = SignedTransaction::new(sample_tx(seq.party(), alice.party()));
        let mut forged = mallory.sign(&stx.id());
        forged.by = alice.key();
        let stx = stx.with_signature(forged);
        assert_eq!(
            stx.verify_signatures().unwrap_err(),
            AuctionError::InvalidSignature(alice.key())
        );
    }

    #[test]
    fn with_signature_replaces_same_key() {
        let seq = Identity::from_seed("Sequencer", [0; 32]);
        let alice = Identity::from_seed("Alice", [1; 32]);
        let stx = SignedTransaction::new(sample_tx(seq.party(), alice.party()));
        let id = stx.id();
        let stx = stx.with_signature(alice.sign(&id)).with_signature(alice.sign(&id));
        assert_eq!(stx.signatures.len(), 1);
    }

    #[test]
    fn typed_accessors() {
        let seq = Identity::from_seed("Sequencer", [0; 32]);
        let alice = Identity::from_seed("Alice", [1; 32]);
        let mut tx = sample_tx(seq.party(), alice.party());
        tx.outputs.push(
            CashState::new(
                Amount::from_major(5, Currency::gbp()).unwrap(),
                seq.party().clone(),
                alice.party().clone(),
            )
            .into(),
        );
        assert_eq!(tx.output_items().len(), 1);
        assert_eq!(tx.output_cash().len(), 1);
        assert!(tx.output_auctions().is_empty());
        assert!(tx.touches(ContractKind::Cash));
        assert!(!tx.touches(ContractKind::Auction));
        assert_eq!(tx.commands_for(ContractKind::AuctionItem).len(), 1);
        assert_eq!(tx.participants().len(), 1);
    }

    #[test]
    fn serde_roundtrip_preserves_id() {
        let seq = Identity::from_seed("Sequencer", [0; 32]);
        let alice = Identity::from_seed("Alice", [1; 32]);
        let mut tx = sample_tx(seq.party(), alice.party());
        tx.time_window = Some(TimeWindow::from_only(Utc::now()));
        let stx = SignedTransaction::new(tx);
        let stx = stx.clone().with_signature(alice.sign(&stx.id()));
        let json = serde_json::to_vec(&stx).unwrap();
        let back: SignedTransaction = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.id(), stx.id());
        assert!(back.verify_signatures().is_ok());
    }
}
