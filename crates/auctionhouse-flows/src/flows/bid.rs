use auctionhouse_types::{
    Amount, AuctionCommand, AuctionError, CommittedTransaction, Result, RetryConfig, TimeWindow,
    UniqueId,
};
use tracing::info;

use super::require_auction;
use crate::{
    builder::{TransactionBuilder, finalize},
    context::NodeContext,
    retry::with_conflict_retry,
};

/// Outbid the current price of `auction_id` with `amount`.
///
/// A bid built on a version that was outbid in the meantime fails with
/// `ConflictingInput` unless `bid_retry_on_conflict` is set, in which case
/// it is rebuilt on the new version and the contract decides again.
///
/// # Errors
/// - `StateNotFound` if the auction is not open
/// - `SelfBid` if this node is the seller
/// - contract violations, e.g. a bid not above the current price
pub fn bid(ctx: &NodeContext, auction_id: UniqueId, amount: Amount) -> Result<CommittedTransaction> {
    let me = ctx.me().clone();
    let retry = if ctx.config.bid_retry_on_conflict {
        ctx.config.retry
    } else {
        RetryConfig::no_retry()
    };
    with_conflict_retry(&retry, "bid", |_| {
        let (input, auction) = require_auction(ctx, auction_id)?;
        if auction.seller == me {
            return Err(AuctionError::SelfBid);
        }
        let mut signers = vec![auction.seller.key, me.key];
        signers.extend(auction.bidder.as_ref().map(|b| b.key));
        let tx = TransactionBuilder::new(ctx.sequencer.party())
            .input(input)
            .output(auction.bid(amount.clone(), me.clone()))
            .command(AuctionCommand::Bid, signers)
            .time_window(TimeWindow::from_only(ctx.now()))
            .build();
        let committed = finalize(ctx, tx)?;
        info!(auction = %auction_id, bidder = %me, amount = %amount, "Placed bid");
        Ok(committed)
    })
}
