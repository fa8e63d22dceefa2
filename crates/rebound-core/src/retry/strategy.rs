//! The pause-computation contract shared by every backoff implementation.

use std::time::Duration;

/// A strategy that maps an attempt number to the pause before the next try.
///
/// Implementations may keep state between calls (the exponential strategy
/// remembers when it was last asked so it can detect a quiet period), which
/// is why [`pause`](BackoffStrategy::pause) takes `&mut self`. A strategy
/// instance belongs to exactly one retry sequence at a time; concurrent
/// callers each construct their own.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let mut backoff = ExponentialBackoff::builder()
///     .base_delay(Duration::from_millis(100))
///     .jitter(0.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(backoff.pause(0), Duration::from_millis(100));
/// ```
///
/// A fixed delay is a one-line implementation:
///
/// ```rust
/// use rebound_core::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// struct Fixed(Duration);
///
/// impl BackoffStrategy for Fixed {
///     fn pause(&mut self, _attempt: u32) -> Duration {
///         self.0
///     }
/// }
///
/// assert_eq!(Fixed(Duration::from_secs(1)).pause(7), Duration::from_secs(1));
/// ```
pub trait BackoffStrategy {
    /// Return the duration to wait after attempt `attempt` (0-indexed) failed.
    ///
    /// Deterministic apart from any random jitter the implementation applies.
    fn pause(&mut self, attempt: u32) -> Duration;
}

impl<S: BackoffStrategy + ?Sized> BackoffStrategy for &mut S {
    fn pause(&mut self, attempt: u32) -> Duration {
        (**self).pause(attempt)
    }
}

impl<S: BackoffStrategy + ?Sized> BackoffStrategy for Box<S> {
    fn pause(&mut self, attempt: u32) -> Duration {
        (**self).pause(attempt)
    }
}
