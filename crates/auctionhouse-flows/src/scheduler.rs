//! Settlement triggers keyed by auction id.
//!
//! Every node that takes part in an auction keeps one trigger per auction,
//! pointing at the auction version it last saw. A new version supersedes
//! the old trigger; a consumed auction cancels it. A trigger fires only
//! once its time is strictly in the past, matching the settlement rule
//! `from > expiry`.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use auctionhouse_types::{CommittedTransaction, Party, UniqueId};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::services::{Scheduler, SettlementTrigger};

/// In-memory [`Scheduler`].
#[derive(Debug, Default)]
pub struct SettlementScheduler {
    triggers: Mutex<HashMap<UniqueId, SettlementTrigger>>,
}

impl SettlementScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UniqueId, SettlementTrigger>> {
        self.triggers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sorted(mut triggers: Vec<SettlementTrigger>) -> Vec<SettlementTrigger> {
    triggers.sort_by(|a, b| a.at.cmp(&b.at).then(a.auction_id.cmp(&b.auction_id)));
    triggers
}

impl Scheduler for SettlementScheduler {
    fn schedule_at(&self, trigger: SettlementTrigger) {
        debug!(auction = %trigger.auction_id, at = %trigger.at, version = %trigger.state_ref, "Scheduled settlement");
        self.lock().insert(trigger.auction_id, trigger);
    }

    fn cancel(&self, auction_id: UniqueId) -> Option<SettlementTrigger> {
        self.lock().remove(&auction_id)
    }

    fn take_due(&self, now: DateTime<Utc>) -> Vec<SettlementTrigger> {
        let mut triggers = self.lock();
        let due: Vec<UniqueId> = triggers
            .values()
            .filter(|t| t.at < now)
            .map(|t| t.auction_id)
            .collect();
        sorted(due.iter().filter_map(|id| triggers.remove(id)).collect())
    }

    fn pending(&self) -> Vec<SettlementTrigger> {
        sorted(self.lock().values().cloned().collect())
    }
}

/// Bring `scheduler` in line with a committed transaction as seen by `me`.
///
/// Auction outputs `me` takes part in are (re)scheduled at their expiry;
/// auctions consumed without a successor `me` takes part in are cancelled.
pub fn track_committed(scheduler: &dyn Scheduler, me: &Party, committed: &CommittedTransaction) {
    let outputs = committed.output_refs();
    for input in committed.tx().input_auctions() {
        let continued = outputs.iter().any(|o| {
            o.state
                .as_auction()
                .is_some_and(|a| a.id == input.id && a.participants().contains(me))
        });
        if !continued && scheduler.cancel(input.id).is_some() {
            debug!(auction = %input.id, "Cancelled settlement");
        }
    }
    for output in outputs {
        let Some(auction) = output.state.as_auction() else {
            continue;
        };
        if auction.participants().contains(me) {
            scheduler.schedule_at(SettlementTrigger {
                auction_id: auction.id,
                state_ref: output.state_ref,
                at: auction.expiry,
            });
        }
    }
}
