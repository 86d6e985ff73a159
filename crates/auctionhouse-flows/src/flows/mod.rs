//! Initiating flows.
//!
//! Each flow reads the vault, runs its local pre-checks, builds a proposal
//! and drives it through [`finalize`](crate::builder::finalize). Flows that
//! consume states rerun that whole cycle on `ConflictingInput`, bounded by
//! the node's [`RetryConfig`](auctionhouse_types::RetryConfig).

pub mod bid;
pub mod end;
pub mod issue;
pub mod list;
pub mod settle;

use auctionhouse_types::{AuctionError, AuctionItemState, AuctionState, Result, StateAndRef, UniqueId};

use crate::context::NodeContext;

pub use bid::bid;
pub use end::end_auction;
pub use issue::{issue_cash, issue_item};
pub use list::list_item;
pub use settle::{SettleOutcome, on_trigger, run_scheduled, settle};

fn latest_auction(ctx: &NodeContext, id: UniqueId) -> Result<Option<(StateAndRef, AuctionState)>> {
    match ctx.vault.find_latest_by_id(id) {
        None => Ok(None),
        Some(found) => {
            let auction = found
                .state
                .as_auction()
                .cloned()
                .ok_or_else(|| AuctionError::Internal(format!("{id} is not an auction")))?;
            Ok(Some((found, auction)))
        }
    }
}

fn latest_item(ctx: &NodeContext, id: UniqueId) -> Result<(StateAndRef, AuctionItemState)> {
    let found = ctx
        .vault
        .find_latest_by_id(id)
        .ok_or(AuctionError::StateNotFound(id))?;
    let item = found
        .state
        .as_item()
        .cloned()
        .ok_or_else(|| AuctionError::Internal(format!("{id} is not an auction item")))?;
    Ok((found, item))
}

fn require_auction(ctx: &NodeContext, id: UniqueId) -> Result<(StateAndRef, AuctionState)> {
    latest_auction(ctx, id)?.ok_or(AuctionError::StateNotFound(id))
}
