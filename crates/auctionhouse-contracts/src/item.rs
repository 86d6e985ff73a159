//! Rules for [`AuctionItemState`] transitions.
//!
//! ```text
//!   Issue:    ∅                → item(listed=false)          signers {owner}
//!   List:     item(unlisted)   → item(listed)                signers {owner}
//!   Transfer: item(A, listed)  → item(owner=B, unlisted)     signers {A, B}
//!   Delist:   item(listed) + auction → item(unlisted)        signers {owner} ∪ {bidder}
//! ```

use std::collections::BTreeSet;

use auctionhouse_types::{
    AuctionError, AuctionItemCommand, AuctionItemState, Command, CommandData, ContractKind,
    PartyKey, Result, Transaction,
};

use crate::{Contract, requirements::Requirements};

/// Verifier for every command of the item contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuctionItemContract;

impl Contract for AuctionItemContract {
    fn kind(&self) -> ContractKind {
        ContractKind::AuctionItem
    }

    fn verify(&self, tx: &Transaction, command: &Command) -> Result<()> {
        let CommandData::AuctionItem(value) = command.value else {
            return Err(AuctionError::Internal(format!(
                "{} dispatched to {}",
                command.value,
                self.kind()
            )));
        };
        let signers = command.signer_set();
        match value {
            AuctionItemCommand::Issue => verify_issue(tx, &signers),
            AuctionItemCommand::List => verify_list(tx, &signers),
            AuctionItemCommand::Transfer => verify_transfer(tx, &signers),
            AuctionItemCommand::Delist => verify_delist(tx, &signers),
        }
    }
}

fn req() -> Requirements {
    Requirements::new(ContractKind::AuctionItem)
}

fn single_pair(tx: &Transaction) -> Result<(&AuctionItemState, &AuctionItemState)> {
    let input = req().single(
        "There must be only one AuctionItemState input",
        &tx.input_items(),
    )?;
    let output = req().single(
        "There must be only one AuctionItemState output",
        &tx.output_items(),
    )?;
    Ok((input, output))
}

fn verify_issue(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    r.using(
        "No inputs should be consumed when issuing an auction item",
        tx.inputs.is_empty(),
    )?;
    r.using(
        "Only one output state should be created when issuing an auction item",
        tx.outputs.len() == 1,
    )?;
    let item = r.single("The output state must be an AuctionItemState", &tx.output_items())?;
    r.using("A newly issued auction item must not be listed", !item.listed)?;
    r.signers(
        "Only the owner needs to sign the transaction",
        signers,
        [item.owner.key],
    )
}

fn verify_list(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    let (input, output) = single_pair(tx)?;
    r.using("The 'listed' property must be false in the input state", !input.listed)?;
    r.using("The 'listed' property must be true in the output state", output.listed)?;
    r.using(
        "Only the 'listed' property can change",
        output.delist() == *input,
    )?;
    r.signers(
        "Only the owner needs to sign the transaction",
        signers,
        [input.owner.key],
    )
}

fn verify_transfer(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    let (input, output) = single_pair(tx)?;
    let unchanged = AuctionItemState {
        owner: input.owner.clone(),
        listed: input.listed,
        ..output.clone()
    };
    r.using(
        "Only the 'owner' and 'listed' properties can change",
        unchanged == *input,
    )?;
    r.using("The 'owner' property must change", output.owner != input.owner)?;
    r.using("The 'listed' property must change", output.listed != input.listed)?;
    r.using("The 'listed' property must be 'false'", !output.listed)?;
    r.signers(
        "The previous and new owner only must sign a transfer transaction",
        signers,
        [input.owner.key, output.owner.key],
    )
}

fn verify_delist(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    let (input, output) = single_pair(tx)?;
    let auction = r.single(
        "There must be only one AuctionState input",
        &tx.input_auctions(),
    )?;
    r.using(
        "The de-listed item must be the auctioned item",
        auction.item_id == input.id,
    )?;
    let unchanged = AuctionItemState {
        listed: input.listed,
        ..output.clone()
    };
    r.using("Only the 'listed' property can change", unchanged == *input)?;
    r.using("The 'listed' property must change", output.listed != input.listed)?;
    r.using("The 'listed' property must be 'false'", !output.listed)?;
    match &auction.bidder {
        Some(bidder) => r.signers(
            "Only the owner and bidder must sign a de-list transaction",
            signers,
            [input.owner.key, bidder.key],
        ),
        None => r.signers(
            "Only the owner must sign a de-list transaction",
            signers,
            [input.owner.key],
        ),
    }
}
