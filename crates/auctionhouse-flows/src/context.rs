use std::sync::Arc;

use auctionhouse_types::{FlowConfig, Identity, Party};
use chrono::{DateTime, Utc};

use crate::services::{Clock, Scheduler, Sequencer, SessionFactory, VaultQuery};

/// Everything a flow needs from the node it runs on.
#[derive(Clone)]
pub struct NodeContext {
    pub identity: Arc<Identity>,
    pub clock: Arc<dyn Clock>,
    pub vault: Arc<dyn VaultQuery>,
    pub sessions: Arc<dyn SessionFactory>,
    pub sequencer: Arc<dyn Sequencer>,
    pub scheduler: Arc<dyn Scheduler>,
    pub config: FlowConfig,
}

impl NodeContext {
    /// The party this node acts as.
    #[must_use]
    pub fn me(&self) -> &Party {
        self.identity.party()
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("me", self.me())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
