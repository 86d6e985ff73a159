//! Settlement at expiry.
//!
//! ```text
//! settle(auction):
//!   auction gone                       -> NoAction
//!   caller neither bidder nor
//!     (seller of an auction with no bid) -> NoAction
//!   no bidder                          -> End + Delist             (Unsold)
//!   bidder cash == 0 or < price        -> End + Delist             (Ended)
//!   otherwise                          -> Settle + Transfer + Move (Settled)
//! ```
//!
//! A scheduled settlement that fails for any reason other than a contract
//! violation is re-armed against the latest auction version, so the next
//! scheduler pass tries again.
//!
//! The bidder pays from its own coins. Payment and change are split per
//! issuer so the cash move balances per `(currency, issuer)`.

use std::{cmp::Ordering, collections::BTreeMap};

use auctionhouse_types::{
    Amount, AuctionCommand, AuctionError, AuctionItemCommand, AuctionState, CashCommand,
    CashState, CommittedTransaction, Party, Result, StateAndRef, TimeWindow, UniqueId,
};
use tracing::{debug, info, warn};

use super::{end::end_with, latest_auction, latest_item};
use crate::{
    builder::{TransactionBuilder, finalize},
    context::NodeContext,
    queries::{cash_balance, cash_of},
    retry::with_conflict_retry,
    services::SettlementTrigger,
};

/// What a settlement attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Not this node's turn, or the auction is already closed.
    NoAction,
    /// The bidder paid and received the item.
    Settled(CommittedTransaction),
    /// Nobody bid; the item went back to the seller.
    Unsold(CommittedTransaction),
    /// The bidder could not pay; the auction was ended instead.
    Ended(CommittedTransaction),
}

impl SettleOutcome {
    #[must_use]
    pub fn committed(&self) -> Option<&CommittedTransaction> {
        match self {
            Self::NoAction => None,
            Self::Settled(c) | Self::Unsold(c) | Self::Ended(c) => Some(c),
        }
    }
}

/// Settle `auction_id` if this node is the one expected to.
pub fn settle(ctx: &NodeContext, auction_id: UniqueId) -> Result<SettleOutcome> {
    with_conflict_retry(&ctx.config.retry, "settle", |_| {
        let Some((input, auction)) = latest_auction(ctx, auction_id)? else {
            debug!(auction = %auction_id, "Auction already closed");
            return Ok(SettleOutcome::NoAction);
        };
        let me = ctx.me();
        let responsible = auction.bidder.as_ref().unwrap_or(&auction.seller);
        if responsible != me {
            debug!(auction = %auction_id, party = %me, "Not responsible for settlement");
            return Ok(SettleOutcome::NoAction);
        }
        match &auction.bidder {
            None => {
                info!(auction = %auction_id, "No bids, ending auction");
                end_with(ctx, input, &auction).map(SettleOutcome::Unsold)
            }
            Some(_) => {
                let balance = cash_balance(ctx.vault.as_ref(), me, &auction.price.currency)?;
                if balance.is_zero() || balance.compare(&auction.price)? == Ordering::Less {
                    info!(
                        auction = %auction_id,
                        balance = %balance,
                        price = %auction.price,
                        "Insufficient funds, ending auction"
                    );
                    end_with(ctx, input, &auction).map(SettleOutcome::Ended)
                } else {
                    settle_paid(ctx, input, &auction).map(SettleOutcome::Settled)
                }
            }
        }
    })
}

/// Run a scheduled trigger, ignoring it if the auction moved on.
pub fn on_trigger(ctx: &NodeContext, trigger: &SettlementTrigger) -> Result<SettleOutcome> {
    match ctx.vault.find_latest_by_id(trigger.auction_id) {
        Some(latest) if latest.state_ref == trigger.state_ref => settle(ctx, trigger.auction_id),
        _ => {
            debug!(auction = %trigger.auction_id, version = %trigger.state_ref, "Stale settlement trigger");
            Ok(SettleOutcome::NoAction)
        }
    }
}

/// Fire every trigger that is due on this node.
pub fn run_scheduled(ctx: &NodeContext) -> Vec<(UniqueId, Result<SettleOutcome>)> {
    ctx.scheduler
        .take_due(ctx.now())
        .into_iter()
        .map(|trigger| {
            let outcome = on_trigger(ctx, &trigger);
            if let Err(err) = &outcome {
                warn!(auction = %trigger.auction_id, error = %err, "Scheduled settlement failed");
                if !err.is_contract_violation() {
                    rearm(ctx, &trigger);
                }
            }
            (trigger.auction_id, outcome)
        })
        .collect()
}

/// Put `trigger` back against the latest auction version this node still
/// takes part in, unless something newer was already scheduled.
fn rearm(ctx: &NodeContext, trigger: &SettlementTrigger) {
    let Some(latest) = ctx.vault.find_latest_by_id(trigger.auction_id) else {
        return;
    };
    let participant = latest
        .state
        .as_auction()
        .is_some_and(|a| a.participants().contains(ctx.me()));
    let superseded = ctx
        .scheduler
        .pending()
        .iter()
        .any(|t| t.auction_id == trigger.auction_id);
    if participant && !superseded {
        debug!(auction = %trigger.auction_id, version = %latest.state_ref, "Re-armed settlement");
        ctx.scheduler.schedule_at(SettlementTrigger {
            state_ref: latest.state_ref,
            ..trigger.clone()
        });
    }
}

fn settle_paid(
    ctx: &NodeContext,
    input: StateAndRef,
    auction: &AuctionState,
) -> Result<CommittedTransaction> {
    let me = ctx.me();
    let (item_input, item) = latest_item(ctx, auction.item_id)?;
    let coins = cash_of(ctx.vault.as_ref(), me, &auction.price.currency);
    let (spent, cash_outputs) = pay(coins, &auction.price, &auction.seller, me)?;
    let both = [auction.seller.key, me.key];
    let tx = TransactionBuilder::new(ctx.sequencer.party())
        .input(input)
        .input(item_input)
        .inputs(spent)
        .output(item.transfer(me.clone()))
        .outputs(cash_outputs)
        .command(AuctionCommand::Settle, both)
        .command(AuctionItemCommand::Transfer, both)
        .command(CashCommand::Move, [me.key])
        .time_window(TimeWindow::from_only(ctx.now()))
        .build();
    let committed = finalize(ctx, tx)?;
    info!(auction = %auction.id, buyer = %me, price = %auction.price, "Auction settled");
    Ok(committed)
}

fn credit(book: &mut BTreeMap<Party, Amount>, issuer: &Party, amount: &Amount) -> Result<()> {
    let total = match book.get(issuer) {
        Some(total) => total.checked_add(amount)?,
        None => amount.clone(),
    };
    book.insert(issuer.clone(), total);
    Ok(())
}

/// Select coins covering `price`; returns the coins to spend plus the
/// payment to `seller` and the change back to `payer`, per issuer.
fn pay(
    coins: Vec<StateAndRef>,
    price: &Amount,
    seller: &Party,
    payer: &Party,
) -> Result<(Vec<StateAndRef>, Vec<CashState>)> {
    let mut remaining = price.clone();
    let mut spent = Vec::new();
    let mut paid = BTreeMap::new();
    let mut change = BTreeMap::new();
    for coin in coins {
        if remaining.is_zero() {
            break;
        }
        let Some(cash) = coin.state.as_cash() else {
            continue;
        };
        let take = match cash.amount.compare(&remaining)? {
            Ordering::Greater => remaining.clone(),
            _ => cash.amount.clone(),
        };
        let rest = cash.amount.checked_sub(&take)?;
        remaining = remaining.checked_sub(&take)?;
        credit(&mut paid, &cash.issuer, &take)?;
        if !rest.is_zero() {
            credit(&mut change, &cash.issuer, &rest)?;
        }
        spent.push(coin);
    }
    if !remaining.is_zero() {
        return Err(AuctionError::InsufficientCash {
            needed: price.to_string(),
            available: price.checked_sub(&remaining)?.to_string(),
        });
    }
    let outputs = paid
        .into_iter()
        .map(|(issuer, amount)| CashState::new(amount, issuer, seller.clone()))
        .chain(
            change
                .into_iter()
                .map(|(issuer, amount)| CashState::new(amount, issuer, payer.clone())),
        )
        .collect();
    Ok((spent, outputs))
}

#[cfg(test)]
mod tests {
    use auctionhouse_types::{Currency, PartyKey, StateRef, TxId};

    use super::*;

    fn party(name: &str, byte: u8) -> Party {
        Party::new(name, PartyKey([byte; 32]))
    }

    fn coin(n: u8, minor: i64, issuer: &Party, owner: &Party) -> StateAndRef {
        StateAndRef {
            state_ref: StateRef::new(TxId([n; 32]), 0),
            state: CashState::new(Amount::new(minor, Currency::gbp()), issuer.clone(), owner.clone())
                .into(),
        }
    }

    #[test]
    fn exact_coin_needs_no_change() {
        let (bank, alice, bob) = (party("Bank", 4), party("Alice", 1), party("Bob", 2));
        let price = Amount::new(120_000, Currency::gbp());
        let (spent, outputs) = pay(vec![coin(1, 120_000, &bank, &bob)], &price, &alice, &bob).unwrap();
        assert_eq!(spent.len(), 1);
        assert_eq!(outputs, vec![CashState::new(price, bank, alice)]);
    }

    #[test]
    fn change_goes_back_per_issuer() {
        let (bank, other, alice, bob) = (
            party("Bank", 4),
            party("OtherBank", 5),
            party("Alice", 1),
            party("Bob", 2),
        );
        let coins = vec![
            coin(1, 70_000, &bank, &bob),
            coin(2, 80_000, &other, &bob),
            coin(3, 10_000, &bank, &bob),
        ];
        let price = Amount::new(120_000, Currency::gbp());
        let (spent, outputs) = pay(coins, &price, &alice, &bob).unwrap();
        assert_eq!(spent.len(), 2);
        let to_alice: i64 = outputs
            .iter()
            .filter(|c| c.owner == alice)
            .map(|c| c.amount.quantity)
            .sum();
        assert_eq!(to_alice, 120_000);
        assert!(outputs.contains(&CashState::new(
            Amount::new(30_000, Currency::gbp()),
            other,
            bob
        )));
    }

    #[test]
    fn short_coins_are_insufficient() {
        let (bank, alice, bob) = (party("Bank", 4), party("Alice", 1), party("Bob", 2));
        let price = Amount::new(120_000, Currency::gbp());
        let err = pay(vec![coin(1, 50_000, &bank, &bob)], &price, &alice, &bob).unwrap_err();
        assert!(matches!(err, AuctionError::InsufficientCash { .. }));
    }

    #[test]
    fn outcome_exposes_commit() {
        assert!(SettleOutcome::NoAction.committed().is_none());
    }
}
