//! Bounded retry for read-build-submit cycles.
//!
//! A flow reads the latest versions from the vault, builds a transaction on
//! top of them and submits it. If another transaction consumed one of those
//! versions first, the sequencer answers `ConflictingInput` and the whole
//! cycle is rerun against fresh reads. Every other error is returned as is.

use auctionhouse_types::{AuctionError, Result, RetryConfig};
use tracing::warn;

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// the budget in `cfg` runs out.
///
/// `attempt` receives the 1-based attempt number.
///
/// # Errors
/// - the first non-retryable error
/// - `RetriesExhausted` wrapping the last conflict when more than one
///   attempt was allowed; the bare conflict otherwise
pub fn with_conflict_retry<T>(
    cfg: &RetryConfig,
    flow: &'static str,
    mut attempt: impl FnMut(u32) -> Result<T>,
) -> Result<T> {
    let max = cfg.max_attempts.max(1);
    let mut n = 1;
    loop {
        match attempt(n) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && n < max => {
                let backoff = cfg.backoff_for(n);
                warn!(flow, attempt = n, max, backoff = ?backoff, error = %err, "Conflicting input, retrying");
                std::thread::sleep(backoff);
                n += 1;
            }
            Err(err) if err.is_retryable() && max > 1 => {
                warn!(flow, attempts = n, error = %err, "Retries exhausted");
                return Err(AuctionError::RetriesExhausted {
                    attempts: n,
                    last: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
