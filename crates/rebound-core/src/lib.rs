#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry pacing for operations that fail transiently.
//!
//! This crate provides:
//!
//! - **Exponential backoff with jitter** via [`ExponentialBackoff`](retry::ExponentialBackoff)
//!   - growth factor and hard ceiling
//!   - instance-owned random source, injectable for reproducible tests
//!   - quiet-period reset so a long-lived caller forgets old failures
//! - **A cancelable retry driver** via [`RetryDriver`](retry::RetryDriver)
//!   - one suspension point per attempt, racing pause against cancellation
//!   - the operation alone decides whether to keep going
//! - **Serializable settings** via [`BackoffConfig`](config::BackoffConfig)
//!
//! Strategies carry per-sequence state and are not meant to be shared;
//! build one per concurrent caller.
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use rebound_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backoff = ExponentialBackoff::builder()
//!     .base_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .build()?;
//!
//! RetryDriver::new(backoff)
//!     .run(|_attempt| async { Outcome::<std::io::Error>::success() })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use rebound_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::BackoffConfig;
    pub use crate::error::{ConfigError, RetryError};
    pub use crate::retry::{
        BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder, Outcome, RetryDriver,
        retry,
    };
    pub use tokio_util::sync::CancellationToken;
}
