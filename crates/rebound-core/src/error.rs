//! Error types for strategy construction and retry driving.

use std::time::Duration;

/// A backoff configuration that cannot produce a sensible pause sequence.
///
/// Returned by [`ExponentialBackoffBuilder::build`](crate::retry::ExponentialBackoffBuilder::build)
/// and [`BackoffConfig::build`](crate::config::BackoffConfig::build).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The first pause must be longer than zero.
    #[error("base delay must be greater than zero")]
    ZeroBaseDelay,

    /// The ceiling is lower than the first pause.
    #[error("max delay ({max:?}) must be at least the base delay ({base:?})")]
    MaxBelowBase {
        /// Configured base delay.
        base: Duration,
        /// Configured max delay.
        max: Duration,
    },

    /// A growth factor of 1.0 or less would never grow the pause.
    #[error("growth factor must be greater than 1.0, got {0}")]
    FactorTooSmall(f64),

    /// Growth factor is NaN or infinite.
    #[error("growth factor must be a finite number")]
    NonFiniteFactor,

    /// Jitter amplitude is NaN or infinite.
    #[error("jitter must be a finite number")]
    NonFiniteJitter,
}

/// Terminal result of a retry sequence that did not end in success.
///
/// Operation errors are carried verbatim; cancellation and deadline expiry
/// are produced by the driver itself and never wrap an operation error.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The operation asked to stop and returned this error.
    #[error(transparent)]
    Operation(E),

    /// The cancellation token fired while waiting between attempts.
    #[error("retry canceled")]
    Cancelled,

    /// The deadline passed while waiting between attempts.
    #[error("retry deadline exceeded")]
    DeadlineExceeded,
}

impl<E> RetryError<E> {
    /// True for driver-side termination ([`Cancelled`](Self::Cancelled) or
    /// [`DeadlineExceeded`](Self::DeadlineExceeded)).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// The operation's own error, if that is what ended the sequence.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }
}
