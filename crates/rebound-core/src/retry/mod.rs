//! Backoff strategies and the retry driver.
//!
//! # Key Types
//!
//! - [`BackoffStrategy`] - maps an attempt number to a pause
//! - [`ExponentialBackoff`] - exponential growth, ceiling, jitter, quiet-period reset
//! - [`RetryDriver`] - calls an operation, waits, repeats; cancelable
//! - [`Outcome`] - what the operation reports back each attempt
//!
//! # Examples
//!
//! ```rust
//! use rebound_core::retry::{retry, ExponentialBackoff, Outcome};
//! use tokio_util::sync::CancellationToken;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut backoff = ExponentialBackoff::builder()
//!     .base_delay(Duration::from_millis(50))
//!     .build()?;
//! let cancel = CancellationToken::new();
//!
//! retry(&mut backoff, &cancel, |attempt| async move {
//!     match std::fs::metadata("/tmp") {
//!         Ok(_) => Outcome::success(),
//!         Err(err) if attempt < 5 => Outcome::retry(err),
//!         Err(err) => Outcome::stop(err),
//!     }
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

mod driver;
mod exponential;
mod strategy;

pub use driver::{Outcome, RetryDriver, retry};
pub use exponential::{
    DEFAULT_BASE_DELAY, DEFAULT_FACTOR, DEFAULT_JITTER, DEFAULT_MAX_DELAY, DEFAULT_RESET_AFTER,
    ExponentialBackoff, ExponentialBackoffBuilder, PauseState,
};
pub use strategy::BackoffStrategy;
