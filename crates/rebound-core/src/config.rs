//! Serializable backoff settings.
//!
//! [`BackoffConfig`] is the shape a host application embeds in its own
//! config file. Every field has a default, so a partial table is enough:
//!
//! ```rust
//! use rebound_core::config::BackoffConfig;
//!
//! let config: BackoffConfig = serde_json::from_str(r#"{ "max_delay_ms": 30000 }"#).unwrap();
//! assert_eq!(config.base_delay_ms, 1_000);
//! assert_eq!(config.max_delay_ms, 30_000);
//!
//! let backoff = config.build().unwrap();
//! assert_eq!(backoff.max_delay().as_secs(), 30);
//! ```

use crate::error::ConfigError;
use crate::retry::{
    DEFAULT_BASE_DELAY, DEFAULT_FACTOR, DEFAULT_JITTER, DEFAULT_MAX_DELAY, DEFAULT_RESET_AFTER,
    ExponentialBackoff,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for an [`ExponentialBackoff`], in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First-attempt pause.
    pub base_delay_ms: u64,
    /// Ceiling on the unjittered pause.
    pub max_delay_ms: u64,
    /// Per-attempt growth.
    pub factor: f64,
    /// ± fractional randomization.
    pub jitter: f64,
    /// Quiet period before the attempt counter starts over; `None` disables.
    pub reset_after_ms: Option<u64>,
    /// Seed for a reproducible jitter sequence; `None` seeds from entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: millis(DEFAULT_BASE_DELAY),
            max_delay_ms: millis(DEFAULT_MAX_DELAY),
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
            reset_after_ms: Some(millis(DEFAULT_RESET_AFTER)),
            seed: None,
        }
    }
}

impl BackoffConfig {
    /// Validate and build a fresh strategy.
    ///
    /// Each call returns an independent instance, one per retry sequence.
    pub fn build(&self) -> Result<ExponentialBackoff, ConfigError> {
        let mut builder = ExponentialBackoff::builder()
            .base_delay(Duration::from_millis(self.base_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .factor(self.factor)
            .jitter(self.jitter);

        builder = match self.reset_after_ms {
            Some(ms) => builder.reset_after(Duration::from_millis(ms)),
            None => builder.without_reset(),
        };
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }

        builder.build()
    }
}

impl From<&ExponentialBackoff> for BackoffConfig {
    /// Effective settings of a live strategy. The random source is not
    /// recoverable, so `seed` is always `None`.
    fn from(backoff: &ExponentialBackoff) -> Self {
        Self {
            base_delay_ms: millis(backoff.base_delay()),
            max_delay_ms: millis(backoff.max_delay()),
            factor: backoff.factor(),
            jitter: backoff.jitter(),
            reset_after_ms: backoff.reset_after().map(millis),
            seed: None,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
