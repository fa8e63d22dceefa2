//! The retry loop: invoke, wait, repeat, until done or canceled.

use super::strategy::BackoffStrategy;
use crate::error::RetryError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What one invocation of the retried operation reports back to the driver.
///
/// | `retry` | `error` | driver does                          |
/// |---------|---------|--------------------------------------|
/// | false   | None    | stops, returns `Ok(())`              |
/// | false   | Some    | stops, returns the error             |
/// | true    | None    | stops, returns `Ok(())`              |
/// | true    | Some    | waits the next pause, tries again    |
///
/// Only the `retry` flag decides whether the loop continues; the driver
/// never inspects the error itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<E> {
    retry: bool,
    error: Option<E>,
    reset: bool,
}

impl<E> Outcome<E> {
    /// Build an outcome from the raw continue flag and optional error.
    pub fn new(retry: bool, error: Option<E>) -> Self {
        Self {
            retry,
            error,
            reset: false,
        }
    }

    /// The operation succeeded; no more attempts.
    pub fn success() -> Self {
        Self::new(false, None)
    }

    /// The operation failed in a way that retrying won't fix.
    pub fn stop(error: E) -> Self {
        Self::new(false, Some(error))
    }

    /// The operation failed transiently; back off and try again.
    pub fn retry(error: E) -> Self {
        Self::new(true, Some(error))
    }

    /// Count attempts from this one when computing the next pause.
    ///
    /// Use it when the operation made real progress before failing (a
    /// stream that ran for a while, then dropped), so the next pause starts
    /// from the base delay instead of where the previous failures left it.
    pub fn with_reset(mut self) -> Self {
        self.reset = true;
        self
    }

    /// Whether the operation asked to be retried.
    pub fn should_retry(&self) -> bool {
        self.retry
    }

    /// The error reported with this outcome, if any.
    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    /// Whether the operation marked a reset point.
    pub fn is_reset(&self) -> bool {
        self.reset
    }
}

impl<E> From<Result<(), E>> for Outcome<E> {
    /// `Ok` is success, `Err` is a transient failure.
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(err) => Self::retry(err),
        }
    }
}

/// Drives an operation through retries paced by a [`BackoffStrategy`].
///
/// Attempts run strictly one after another. Between attempts the driver
/// suspends on whichever comes first: the computed pause, the cancellation
/// token, or the deadline. Cancellation and the deadline take precedence
/// when they are ready at the same moment as the pause.
///
/// Pass `&mut strategy` to keep the strategy (and its reset bookkeeping)
/// alive across sequences.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{ExponentialBackoff, Outcome, RetryDriver};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backoff = ExponentialBackoff::builder()
///     .base_delay(Duration::from_millis(10))
///     .build()?;
///
/// RetryDriver::new(backoff)
///     .with_timeout(Duration::from_secs(5))
///     .run(|attempt| async move {
///         if attempt < 2 {
///             Outcome::retry(std::io::Error::other("not yet"))
///         } else {
///             Outcome::success()
///         }
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RetryDriver<S> {
    strategy: S,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl<S: BackoffStrategy> RetryDriver<S> {
    /// Create a driver that is only stopped by the operation itself.
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            cancel: CancellationToken::new(),
            deadline: None,
            timeout: None,
        }
    }

    /// Abort pending waits when `token` is canceled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Abort pending waits once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort pending waits `timeout` after [`run`](Self::run) starts.
    ///
    /// Measured from each call to `run`, not from construction. Combined
    /// with [`with_deadline`](Self::with_deadline), whichever ends first wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Borrow the strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Take the strategy back.
    pub fn into_strategy(self) -> S {
        self.strategy
    }

    /// Run `operation` until it stops, succeeds, or the wait is aborted.
    ///
    /// `operation` receives the 0-based attempt number. Cancellation is only
    /// observed while waiting, so the first attempt always runs.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Operation`] with the operation's error, verbatim
    /// - [`RetryError::Cancelled`] if the token fired during a wait
    /// - [`RetryError::DeadlineExceeded`] if the deadline passed during a wait
    pub async fn run<F, Fut, E>(&mut self, mut operation: F) -> Result<(), RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Outcome<E>>,
    {
        let deadline = match (self.deadline, self.timeout) {
            (Some(at), Some(timeout)) => Some(at.min(Instant::now() + timeout)),
            (at, timeout) => at.or_else(|| timeout.map(|t| Instant::now() + t)),
        };
        let mut attempt: u32 = 0;
        let mut reset: u32 = 0;

        loop {
            let outcome = operation(attempt).await;
            if outcome.reset {
                reset = attempt;
            }

            match (outcome.retry, outcome.error) {
                (_, None) => return Ok(()),
                (false, Some(err)) => return Err(RetryError::Operation(err)),
                (true, Some(_)) => {}
            }

            let pause = self.strategy.pause(attempt - reset);
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, ?pause, "attempt failed, backing off");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, "retry canceled while waiting");
                    return Err(RetryError::Cancelled);
                }
                _ = until(deadline) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, "retry deadline passed while waiting");
                    return Err(RetryError::DeadlineExceeded);
                }
                _ = tokio::time::sleep(pause) => {}
            }

            attempt = attempt.saturating_add(1);
        }
    }
}

/// Run `operation` with `strategy` until it stops or `cancel` fires.
///
/// Shorthand for a one-off [`RetryDriver`] with a cancellation token.
pub async fn retry<S, F, Fut, E>(
    strategy: S,
    cancel: &CancellationToken,
    operation: F,
) -> Result<(), RetryError<E>>
where
    S: BackoffStrategy,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Outcome<E>>,
{
    RetryDriver::new(strategy)
        .with_cancellation(cancel.clone())
        .run(operation)
        .await
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
