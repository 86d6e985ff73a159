//! Read-side views over a vault.

use auctionhouse_types::{
    Amount, AuctionItemState, AuctionState, ContractKind, Currency, Party, Result, StateAndRef,
};

use crate::services::VaultQuery;

/// Every open auction, in commit order.
pub fn all_auctions(vault: &dyn VaultQuery) -> Vec<AuctionState> {
    vault
        .find_all_by_type(ContractKind::Auction)
        .iter()
        .filter_map(|s| s.state.as_auction().cloned())
        .collect()
}

/// Every current item version, in commit order.
pub fn all_items(vault: &dyn VaultQuery) -> Vec<AuctionItemState> {
    vault
        .find_all_by_type(ContractKind::AuctionItem)
        .iter()
        .filter_map(|s| s.state.as_item().cloned())
        .collect()
}

pub fn items_owned_by(vault: &dyn VaultQuery, owner: &Party) -> Vec<AuctionItemState> {
    all_items(vault)
        .into_iter()
        .filter(|i| i.owner == *owner)
        .collect()
}

/// Unconsumed cash of `owner` in `currency`, any issuer.
pub fn cash_of(vault: &dyn VaultQuery, owner: &Party, currency: &Currency) -> Vec<StateAndRef> {
    vault
        .find_all_by_type(ContractKind::Cash)
        .into_iter()
        .filter(|s| {
            s.state
                .as_cash()
                .is_some_and(|c| c.owner == *owner && c.amount.currency == *currency)
        })
        .collect()
}

/// Total cash `owner` holds in `currency`.
///
/// # Errors
/// `AmountOutOfRange` if the total overflows.
pub fn cash_balance(vault: &dyn VaultQuery, owner: &Party, currency: &Currency) -> Result<Amount> {
    let coins = cash_of(vault, owner, currency);
    Amount::sum(
        coins
            .iter()
            .filter_map(|s| s.state.as_cash())
            .map(|c| &c.amount),
        currency,
    )
}
