use auctionhouse_types::{
    Amount, AuctionCommand, AuctionError, AuctionItemCommand, AuctionState, CommittedTransaction,
    Result, TimeWindow, UniqueId,
};
use chrono::{DateTime, Utc};
use tracing::info;

use super::latest_item;
use crate::{
    builder::{TransactionBuilder, finalize},
    context::NodeContext,
    retry::with_conflict_retry,
};

/// Put an owned, unlisted item up for auction until `expiry`.
///
/// # Errors
/// - `StateNotFound` if the item does not exist
/// - `NotOwner` if this node does not own it
/// - `AlreadyListed` if it is in another auction
pub fn list_item(
    ctx: &NodeContext,
    item_id: UniqueId,
    price: Amount,
    expiry: DateTime<Utc>,
) -> Result<CommittedTransaction> {
    let me = ctx.me().clone();
    with_conflict_retry(&ctx.config.retry, "list", |_| {
        let (input, item) = latest_item(ctx, item_id)?;
        if item.owner != me {
            return Err(AuctionError::NotOwner(item_id));
        }
        if item.listed {
            return Err(AuctionError::AlreadyListed(item_id));
        }
        let auction = AuctionState::new(item_id, price.clone(), me.clone(), expiry);
        let auction_id = auction.id;
        let tx = TransactionBuilder::new(ctx.sequencer.party())
            .input(input)
            .output(auction)
            .output(item.list())
            .command(AuctionCommand::List, [me.key])
            .command(AuctionItemCommand::List, [me.key])
            .time_window(TimeWindow::from_only(ctx.now()))
            .build();
        let committed = finalize(ctx, tx)?;
        info!(auction = %auction_id, item = %item_id, price = %price, expiry = %expiry, "Listed auction");
        Ok(committed)
    })
}
