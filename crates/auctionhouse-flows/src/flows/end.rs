use auctionhouse_types::{
    AuctionCommand, AuctionError, AuctionItemCommand, AuctionState, CommittedTransaction, Result,
    StateAndRef, TimeWindow, UniqueId,
};
use tracing::info;

use super::{latest_item, require_auction};
use crate::{
    builder::{TransactionBuilder, finalize},
    context::NodeContext,
    retry::with_conflict_retry,
};

/// Close `auction` and hand its item back to the seller, unlisted.
pub(crate) fn end_with(
    ctx: &NodeContext,
    input: StateAndRef,
    auction: &AuctionState,
) -> Result<CommittedTransaction> {
    let (item_input, item) = latest_item(ctx, auction.item_id)?;
    let signers = auction.participant_keys();
    let tx = TransactionBuilder::new(ctx.sequencer.party())
        .input(input)
        .input(item_input)
        .output(item.delist())
        .command(AuctionCommand::End, signers.iter().copied())
        .command(AuctionItemCommand::Delist, signers)
        .time_window(TimeWindow::from_only(ctx.now()))
        .build();
    let committed = finalize(ctx, tx)?;
    info!(auction = %auction.id, item = %auction.item_id, "Ended auction");
    Ok(committed)
}

/// End an auction early. Only the seller may do this; a current bidder
/// has to countersign.
///
/// # Errors
/// - `StateNotFound` if the auction is not open
/// - `NotSeller` if this node is not the seller
pub fn end_auction(ctx: &NodeContext, auction_id: UniqueId) -> Result<CommittedTransaction> {
    with_conflict_retry(&ctx.config.retry, "end", |_| {
        let (input, auction) = require_auction(ctx, auction_id)?;
        if auction.seller != *ctx.me() {
            return Err(AuctionError::NotSeller {
                action: "end an auction",
            });
        }
        end_with(ctx, input, &auction)
    })
}
