//! Self-issuance of items and issuer-issued cash.

use auctionhouse_types::{
    Amount, AuctionItemCommand, AuctionItemState, CashCommand, CashState, CommittedTransaction,
    Party, Result,
};
use tracing::info;

use crate::{
    builder::{TransactionBuilder, finalize},
    context::NodeContext,
};

/// Issue a new unlisted item owned by this node.
pub fn issue_item(ctx: &NodeContext, description: &str) -> Result<CommittedTransaction> {
    let item = AuctionItemState::issue(description, ctx.me().clone());
    let id = item.id;
    let tx = TransactionBuilder::new(ctx.sequencer.party())
        .output(item)
        .command(AuctionItemCommand::Issue, [ctx.me().key])
        .build();
    let committed = finalize(ctx, tx)?;
    info!(item = %id, owner = %ctx.me(), description, "Issued auction item");
    Ok(committed)
}

/// Issue `amount` of this node's cash to `owner`.
pub fn issue_cash(ctx: &NodeContext, amount: Amount, owner: &Party) -> Result<CommittedTransaction> {
    let tx = TransactionBuilder::new(ctx.sequencer.party())
        .output(CashState::new(amount.clone(), ctx.me().clone(), owner.clone()))
        .command(CashCommand::Issue, [ctx.me().key])
        .build();
    let committed = finalize(ctx, tx)?;
    info!(amount = %amount, issuer = %ctx.me(), owner = %owner, "Issued cash");
    Ok(committed)
}
