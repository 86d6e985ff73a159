//! Rules for [`AuctionState`] transitions.
//!
//! ```text
//!   List:   item(unlisted)       → auction(bidder=∅) + item(listed)   from < expiry
//!   Bid:    auction(P, b)        → auction(P' > P, b' ≠ b)            from < expiry
//!   Settle: auction(P, b) + cash → item(b) + cash(P → seller)         from > expiry
//!   Settle: auction(P, ∅)        → nothing                             from > expiry
//!   End:    auction              → item(seller, unlisted)             any time
//! ```
//!
//! Settle and End are signed by the seller and, when a bid exists, the bidder.

use std::{cmp::Ordering, collections::BTreeSet};

use auctionhouse_types::{
    Amount, AuctionCommand, AuctionError, AuctionState, Command, CommandData, ContractKind,
    PartyKey, Result, Transaction,
};

use crate::{Contract, requirements::Requirements};

/// Verifier for every command of the auction contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuctionContract;

impl Contract for AuctionContract {
    fn kind(&self) -> ContractKind {
        ContractKind::Auction
    }

    fn verify(&self, tx: &Transaction, command: &Command) -> Result<()> {
        let CommandData::Auction(value) = command.value else {
            return Err(AuctionError::Internal(format!(
                "{} dispatched to {}",
                command.value,
                self.kind()
            )));
        };
        let signers = command.signer_set();
        match value {
            AuctionCommand::List => verify_list(tx, &signers),
            AuctionCommand::Bid => verify_bid(tx, &signers),
            AuctionCommand::Settle => verify_settle(tx, &signers),
            AuctionCommand::End => verify_end(tx, &signers),
        }
    }
}

fn req() -> Requirements {
    Requirements::new(ContractKind::Auction)
}

fn verify_list(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    r.using(
        "Only one input should be consumed when listing an auction",
        tx.inputs.len() == 1,
    )?;
    let item = r.single(
        "The input state type should be AuctionItemState",
        &tx.input_items(),
    )?;
    r.using("The auction item must not already be listed", !item.listed)?;
    r.using(
        "Only two output states should be created when listing an auction",
        tx.outputs.len() == 2,
    )?;
    let auction = r.single(
        "There must be exactly one AuctionState output",
        &tx.output_auctions(),
    )?;
    r.single(
        "There must be exactly one AuctionItemState output",
        &tx.output_items(),
    )?;
    r.using(
        "A newly issued auction must have a starting price greater than zero",
        auction.price.is_positive(),
    )?;
    let from = r.timestamp(tx, "Auction listings must be timestamped")?;
    r.using("The expiry date cannot be in the past", from < auction.expiry)?;
    r.signers(
        "Only the seller needs to sign the transaction",
        signers,
        [auction.seller.key],
    )?;
    r.using("The auction must have no bidder when listed", auction.bidder.is_none())?;
    r.using(
        "Only the owner of the auction item can list it in an auction",
        item.owner == auction.seller,
    )?;
    r.using(
        "The auction must reference the listed item",
        auction.item_id == item.id,
    )
}

fn verify_bid(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    let from = r.timestamp(tx, "Auction bids must be timestamped")?;
    r.using(
        "A bid transaction should only have one input state",
        tx.inputs.len() == 1,
    )?;
    r.using(
        "A bid transaction should only have one output state",
        tx.outputs.len() == 1,
    )?;
    let input = r.single("The input state must be an AuctionState", &tx.input_auctions())?;
    let output = r.single("The output state must be an AuctionState", &tx.output_auctions())?;
    r.using("The auction must not be expired", from < input.expiry)?;
    let new_bidder = output
        .bidder
        .as_ref()
        .ok_or_else(|| AuctionError::violation(ContractKind::Auction.name(), "The bidder cannot be empty"))?;
    let unchanged = AuctionState {
        price: input.price.clone(),
        bidder: input.bidder.clone(),
        ..output.clone()
    };
    r.using("Only the 'bidder' and 'price' may change", unchanged == *input)?;
    r.using(
        "The 'bidder' property must change in a bid",
        output.bidder != input.bidder,
    )?;
    r.using(
        "The 'price' property must change in a bid",
        output.price != input.price,
    )?;
    r.using(
        "The new bid price must be greater than the current bid price",
        output.price.compare(&input.price)? == Ordering::Greater,
    )?;
    let mut expected = vec![output.seller.key, new_bidder.key];
    expected.extend(input.bidder.as_ref().map(|b| b.key));
    r.signers(
        "The seller, previous bidder and new bidder only must sign a bid transaction",
        signers,
        expected,
    )
}

fn verify_settle(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    let auction = r.single(
        "There must be only one AuctionState input",
        &tx.input_auctions(),
    )?;
    r.using(
        "There must not be any AuctionState outputs",
        tx.output_auctions().is_empty(),
    )?;
    let from = r.timestamp(tx, "Auction settlements must be timestamped")?;
    r.using(
        "Auction cannot be settled before it expires",
        from > auction.expiry,
    )?;
    match &auction.bidder {
        Some(bidder) => {
            let cash = tx.output_cash();
            r.using("There must be output cash", !cash.is_empty())?;
            let to_seller: Vec<&Amount> = cash
                .iter()
                .filter(|c| c.owner == auction.seller)
                .map(|c| &c.amount)
                .collect();
            r.using(
                "There must be output cash paid to the seller",
                !to_seller.is_empty(),
            )?;
            let settled = Amount::sum(to_seller, &auction.price.currency)?;
            r.using(
                "The amount settled must be equal to the price of the auction",
                settled.compare(&auction.price)? == Ordering::Equal,
            )?;
            r.signers(
                "Both seller and bidder only must sign the auction settlement transaction",
                signers,
                [auction.seller.key, bidder.key],
            )
        }
        None => {
            r.using(
                "No output states may be created when settling an auction without bids",
                tx.outputs.is_empty(),
            )?;
            r.signers(
                "Only the seller must sign the auction settlement transaction",
                signers,
                [auction.seller.key],
            )
        }
    }
}

fn verify_end(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    let auction = r.single(
        "There must be only one AuctionState input",
        &tx.input_auctions(),
    )?;
    r.using(
        "There must not be any AuctionState outputs",
        tx.output_auctions().is_empty(),
    )?;
    r.timestamp(tx, "Transaction must be timestamped")?;
    r.using(
        "No cash may change hands when an auction ends",
        tx.input_cash().is_empty() && tx.output_cash().is_empty(),
    )?;
    let returned = tx
        .output_items()
        .into_iter()
        .find(|item| item.id == auction.item_id);
    r.using(
        "The auctioned item must be returned to the seller unlisted",
        returned.is_some_and(|item| item.owner == auction.seller && !item.listed),
    )?;
    let reason = if auction.has_bidder() {
        "Both seller and bidder only must sign the auction end transaction"
    } else {
        "Only the seller must sign the auction end transaction"
    };
    r.signers(reason, signers, auction.participant_keys())
}
