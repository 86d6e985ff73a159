//! Minimal fungible cash rules: enough for settlement transactions to carry
//! payment that is itself valid.

use std::collections::{BTreeMap, BTreeSet};

use auctionhouse_types::{
    Amount, AuctionError, CashCommand, CashState, Command, CommandData, ContractKind, Currency,
    PartyKey, Result, Transaction,
};

use crate::{Contract, requirements::Requirements};

/// Verifier for the cash contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashContract;

impl Contract for CashContract {
    fn kind(&self) -> ContractKind {
        ContractKind::Cash
    }

    fn verify(&self, tx: &Transaction, command: &Command) -> Result<()> {
        let CommandData::Cash(value) = command.value else {
            return Err(AuctionError::Internal(format!(
                "{} dispatched to {}",
                command.value,
                self.kind()
            )));
        };
        let signers = command.signer_set();
        match value {
            CashCommand::Issue => verify_issue(tx, &signers),
            CashCommand::Move => verify_move(tx, &signers),
        }
    }
}

fn req() -> Requirements {
    Requirements::new(ContractKind::Cash)
}

fn verify_issue(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    r.using(
        "No cash inputs may be consumed when issuing cash",
        tx.input_cash().is_empty(),
    )?;
    let outputs = tx.output_cash();
    let Some(first) = outputs.first() else {
        return Err(AuctionError::violation(
            ContractKind::Cash.name(),
            "Issued cash must be created",
        ));
    };
    r.using(
        "Issued amounts must be positive",
        outputs.iter().all(|c| c.amount.is_positive()),
    )?;
    r.using(
        "All issued cash must share one issuer",
        outputs.iter().all(|c| c.issuer == first.issuer),
    )?;
    r.signers(
        "Only the issuer must sign a cash issuance",
        signers,
        [first.issuer.key],
    )
}

/// Sum amounts per (currency, issuer).
fn totals<'a>(
    states: impl IntoIterator<Item = &'a CashState>,
) -> Result<BTreeMap<(Currency, PartyKey), Amount>> {
    let mut totals: BTreeMap<(Currency, PartyKey), Amount> = BTreeMap::new();
    for cash in states {
        let key = (cash.amount.currency.clone(), cash.issuer.key);
        let next = match totals.get(&key) {
            Some(total) => total.checked_add(&cash.amount)?,
            None => cash.amount.clone(),
        };
        totals.insert(key, next);
    }
    Ok(totals)
}

fn verify_move(tx: &Transaction, signers: &BTreeSet<PartyKey>) -> Result<()> {
    let r = req();
    let inputs = tx.input_cash();
    r.using("Cash must be consumed when moving cash", !inputs.is_empty())?;
    let outputs = tx.output_cash();
    r.using(
        "Moved amounts must be positive",
        outputs.iter().all(|c| c.amount.is_positive()),
    )?;
    r.using(
        "Cash moved must be conserved per currency and issuer",
        totals(inputs.iter().copied())? == totals(outputs.iter().copied())?,
    )?;
    r.using(
        "Every owner of consumed cash must sign",
        inputs.iter().all(|c| signers.contains(&c.owner.key)),
    )
}
