//! System-wide constants for the AuctionHouse ledger layer.

/// Default number of attempts for a flow whose inputs went stale.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Default first backoff between conflict retries, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 25;

/// Upper bound for the exponential retry backoff, in milliseconds.
pub const DEFAULT_MAX_RETRY_BACKOFF_MS: u64 = 1_000;

/// Whether a bid is rebuilt automatically after a conflicting input.
/// A competing bid may have raised the price, so the default is to surface
/// the conflict to the bidder instead.
pub const DEFAULT_BID_RETRY_ON_CONFLICT: bool = false;

/// Default sequencer display name.
pub const DEFAULT_SEQUENCER_NAME: &str = "Sequencer";

/// Domain separator prepended to the canonical transaction encoding.
pub const TX_HASH_DOMAIN: &[u8] = b"auctionhouse:tx:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "AuctionHouse";
