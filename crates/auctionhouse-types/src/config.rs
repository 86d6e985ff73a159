//! Configuration types for AuctionHouse flows and the sequencer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{constants, AuctionError, Result};

/// Bounded exponential backoff for flows whose inputs went stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds.
    pub backoff_ms: u64,
    /// Ceiling for the doubled backoff, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_CONFLICT_RETRIES,
            backoff_ms: constants::DEFAULT_RETRY_BACKOFF_MS,
            max_backoff_ms: constants::DEFAULT_MAX_RETRY_BACKOFF_MS,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retry.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self
            .backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Per-node flow behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub retry: RetryConfig,
    /// Rebuild a bid automatically after `ConflictingInput`.
    pub bid_retry_on_conflict: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            bid_retry_on_conflict: constants::DEFAULT_BID_RETRY_ON_CONFLICT,
        }
    }
}

impl FlowConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    /// [`AuctionError::Configuration`] on malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|e| AuctionError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// [`AuctionError::Configuration`] if the retry budget is zero or the
    /// backoff ceiling is below the initial backoff.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(AuctionError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.max_backoff_ms < self.retry.backoff_ms {
            return Err(AuctionError::Configuration(format!(
                "retry.max_backoff_ms ({}) is below retry.backoff_ms ({})",
                self.retry.max_backoff_ms, self.retry.backoff_ms
            )));
        }
        Ok(())
    }
}

/// Configuration for the in-process sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub name: String,
    /// Reject transactions whose time window does not contain the sequencer's clock.
    pub validate_time_window: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_SEQUENCER_NAME.to_string(),
            validate_time_window: true,
        }
    }
}
