//! Exponential backoff with jitter and quiet-period reset.

use super::strategy::BackoffStrategy;
use crate::error::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Pause returned for the first attempt after construction or a reset.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Ceiling on the unjittered pause.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(180);
/// Growth applied per attempt.
pub const DEFAULT_FACTOR: f64 = 1.6;
/// Fractional randomization amplitude.
pub const DEFAULT_JITTER: f64 = 0.2;
/// Quiet period after which the attempt counter starts over.
pub const DEFAULT_RESET_AFTER: Duration = Duration::from_secs(60 * 60);

/// Bookkeeping carried between [`pause`](BackoffStrategy::pause) calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseState {
    /// When `pause` last ran; `None` until the first call.
    pub last_invocation: Option<Instant>,
    /// The pause handed out by the last call.
    pub last_pause: Duration,
    /// Attempt number that counts as zero since the most recent reset.
    pub attempt_offset: u32,
}

/// Exponential backoff strategy with jitter and quiet-period reset.
///
/// The unjittered pause for effective attempt `n` is `base_delay` for
/// `n == 0`, otherwise `base_delay * factor^n` with the multiplication
/// stopping as soon as the value reaches `max_delay`, then clamped to it.
/// The result is scaled by `1 + jitter * (2U - 1)` with `U` drawn uniformly
/// from `[0, 1)` and floored at zero.
///
/// # Reset
///
/// When `reset_after` is set, a call arriving at least
/// `reset_after + last_pause` after the previous call (wall-clock, measured
/// with [`tokio::time::Instant`]) is treated as attempt zero. The attempt
/// passed in becomes the new offset, so later calls in the same sequence
/// keep growing from `base_delay` again. An attempt below the offset means
/// the caller restarted its own count, and the offset is dropped.
///
/// # Concurrency
///
/// Not shareable between concurrent retry sequences: every call mutates the
/// reset bookkeeping. The random source is owned by the instance.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let mut backoff = ExponentialBackoff::builder()
///     .base_delay(Duration::from_secs(1))
///     .max_delay(Duration::from_secs(180))
///     .factor(1.6)
///     .jitter(0.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(backoff.pause(0), Duration::from_secs(1));
/// assert_eq!(backoff.pause(1), Duration::from_millis(1600));
/// assert_eq!(backoff.pause(2), Duration::from_millis(2560));
/// ```
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    factor: f64,
    jitter: f64,
    reset_after: Option<Duration>,
    state: PauseState,
    rng: Box<dyn RngCore + Send>,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// The unjittered pause for an effective attempt, ignoring reset state.
    ///
    /// Does not touch the random source or the bookkeeping.
    pub fn unjittered(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.base_delay;
        }
        let max = self.max_delay.as_nanos() as f64;
        let mut backoff = self.base_delay.as_nanos() as f64;
        let mut remaining = attempt;
        while backoff < max && remaining > 0 {
            backoff *= self.factor;
            remaining -= 1;
        }
        from_nanos_f64(backoff.min(max))
    }

    /// Forget all bookkeeping; the next call behaves like the first one.
    pub fn reset(&mut self) {
        self.state = PauseState::default();
    }

    /// Current bookkeeping.
    pub fn state(&self) -> PauseState {
        self.state
    }

    /// Pause for the first attempt.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Ceiling on the unjittered pause.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Per-attempt growth.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Jitter amplitude.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Quiet period before the attempt counter starts over, if enabled.
    pub fn reset_after(&self) -> Option<Duration> {
        self.reset_after
    }

    fn quiet_period_elapsed(&self, now: Instant) -> bool {
        match (self.reset_after, self.state.last_invocation) {
            (Some(reset_after), Some(last)) => {
                now.saturating_duration_since(last)
                    >= reset_after.saturating_add(self.state.last_pause)
            }
            _ => false,
        }
    }

    fn apply_jitter(&mut self, nominal: Duration) -> Duration {
        let spread = self.rng.r#gen::<f64>() * 2.0 - 1.0;
        let jittered = nominal.as_nanos() as f64 * (1.0 + self.jitter * spread);
        if jittered <= 0.0 {
            return Duration::ZERO;
        }
        from_nanos_f64(jittered)
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn pause(&mut self, attempt: u32) -> Duration {
        let now = Instant::now();
        if self.quiet_period_elapsed(now) {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                attempt,
                previous_offset = self.state.attempt_offset,
                "quiet period elapsed, backoff reset"
            );
            self.state.attempt_offset = attempt;
        } else if attempt < self.state.attempt_offset {
            // caller restarted its count (new sequence or driver-side reset)
            self.state.attempt_offset = 0;
        }

        let effective = attempt.saturating_sub(self.state.attempt_offset);
        let nominal = self.unjittered(effective);
        let pause = self.apply_jitter(nominal);

        self.state.last_invocation = Some(now);
        self.state.last_pause = pause;
        pause
    }
}

impl Default for ExponentialBackoff {
    /// Defaults: 1s base, 180s ceiling, factor 1.6, jitter 0.2, reset after
    /// one hour of quiet, entropy-seeded random source.
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            factor: DEFAULT_FACTOR,
            jitter: DEFAULT_JITTER,
            reset_after: Some(DEFAULT_RESET_AFTER),
            state: PauseState::default(),
            rng: Box::new(StdRng::from_entropy()),
        }
    }
}

impl fmt::Debug for ExponentialBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentialBackoff")
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("factor", &self.factor)
            .field("jitter", &self.jitter)
            .field("reset_after", &self.reset_after)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// `as u64` saturates, so absurd ceilings top out near 584 years.
fn from_nanos_f64(nanos: f64) -> Duration {
    Duration::from_nanos(nanos.round() as u64)
}

/// Builder for configuring [`ExponentialBackoff`].
///
/// Unset options fall back to the `DEFAULT_*` constants of this module.
///
/// # Examples
///
/// ```rust
/// use rebound_core::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .base_delay(Duration::from_secs(2))
///     .max_delay(Duration::from_secs(300))
///     .seed(7)
///     .build()
///     .unwrap();
///
/// assert_eq!(backoff.max_delay(), Duration::from_secs(300));
/// ```
#[derive(Default)]
pub struct ExponentialBackoffBuilder {
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    factor: Option<f64>,
    jitter: Option<f64>,
    reset_after: Option<Option<Duration>>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl ExponentialBackoffBuilder {
    /// Set the pause for the first attempt.
    ///
    /// Default: 1s
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Set the ceiling on the unjittered pause.
    ///
    /// Default: 180s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the per-attempt growth factor. Must be greater than 1.0.
    ///
    /// Default: 1.6
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = Some(factor);
        self
    }

    /// Set the jitter amplitude.
    ///
    /// A jitter of 0.2 means the pause varies by ±20%. Values outside
    /// `[0, 1]` are accepted: above 1.0 the pause can swing down to zero
    /// (never below), a negative amplitude just mirrors the distribution.
    ///
    /// Default: 0.2
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Start the attempt counter over after this much quiet time.
    ///
    /// Default: 1 hour
    pub fn reset_after(mut self, quiet: Duration) -> Self {
        self.reset_after = Some(Some(quiet));
        self
    }

    /// Never reset the attempt counter on quiet time.
    pub fn without_reset(mut self) -> Self {
        self.reset_after = Some(None);
        self
    }

    /// Use a caller-supplied random source for jitter.
    ///
    /// Default: [`StdRng`] seeded from OS entropy
    pub fn rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Use a [`StdRng`] seeded with `seed`, for reproducible sequences.
    pub fn seed(self, seed: u64) -> Self {
        self.rng(StdRng::seed_from_u64(seed))
    }

    /// Validate the options and build the strategy.
    pub fn build(self) -> Result<ExponentialBackoff, ConfigError> {
        let base_delay = self.base_delay.unwrap_or(DEFAULT_BASE_DELAY);
        let max_delay = self.max_delay.unwrap_or(DEFAULT_MAX_DELAY);
        let factor = self.factor.unwrap_or(DEFAULT_FACTOR);
        let jitter = self.jitter.unwrap_or(DEFAULT_JITTER);

        if base_delay.is_zero() {
            return Err(ConfigError::ZeroBaseDelay);
        }
        if max_delay < base_delay {
            return Err(ConfigError::MaxBelowBase {
                base: base_delay,
                max: max_delay,
            });
        }
        if !factor.is_finite() {
            return Err(ConfigError::NonFiniteFactor);
        }
        if factor <= 1.0 {
            return Err(ConfigError::FactorTooSmall(factor));
        }
        if !jitter.is_finite() {
            return Err(ConfigError::NonFiniteJitter);
        }

        Ok(ExponentialBackoff {
            base_delay,
            max_delay,
            factor,
            jitter,
            reset_after: self.reset_after.unwrap_or(Some(DEFAULT_RESET_AFTER)),
            state: PauseState::default(),
            rng: self
                .rng
                .unwrap_or_else(|| Box::new(StdRng::from_entropy())),
        })
    }
}

impl fmt::Debug for ExponentialBackoffBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentialBackoffBuilder")
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("factor", &self.factor)
            .field("jitter", &self.jitter)
            .field("reset_after", &self.reset_after)
            .field("custom_rng", &self.rng.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn no_jitter() -> ExponentialBackoffBuilder {
        ExponentialBackoff::builder().jitter(0.0).seed(1)
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let mut backoff = no_jitter().build().unwrap();

        let expected_ms = [1000, 1600, 2560, 4096];
        for (attempt, ms) in expected_ms.into_iter().enumerate() {
            assert_eq!(backoff.pause(attempt as u32), Duration::from_millis(ms));
        }
        assert_eq!(backoff.pause(4), Duration::from_micros(6_553_600));
        assert_eq!(backoff.pause(5), Duration::from_micros(10_485_760));
    }

    #[test]
    fn test_max_delay_cap() {
        let backoff = ExponentialBackoff::builder()
            .base_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(5))
            .factor(10.0)
            .jitter(0.0)
            .build()
            .unwrap();

        assert_eq!(backoff.unjittered(1), Duration::from_secs(5));
        for attempt in 1..50 {
            assert_eq!(backoff.unjittered(attempt), Duration::from_secs(5));
        }
        assert_eq!(backoff.unjittered(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_unjittered_is_monotonic() {
        let backoff = ExponentialBackoff::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..40 {
            let current = backoff.unjittered(attempt);
            assert!(current >= previous, "attempt {attempt}: {current:?} < {previous:?}");
            assert!(current <= backoff.max_delay());
            previous = current;
        }
        assert_eq!(previous, DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_jitter_bounds() {
        let mut backoff = ExponentialBackoff::builder()
            .base_delay(Duration::from_secs(1))
            .jitter(0.5)
            .seed(42)
            .build()
            .unwrap();

        let mut delays = Vec::new();
        for _ in 0..50 {
            delays.push(backoff.pause(0));
        }

        for delay in &delays {
            let millis = delay.as_millis();
            assert!((500..=1500).contains(&millis), "seed 42 drew {millis}ms outside ±50%");
        }

        let distinct = delays.windows(2).any(|w| w[0] != w[1]);
        assert!(distinct, "seeded draws collapsed to one value: {:?}", delays[0]);
    }

    #[test]
    fn test_jitter_extremes_with_fixed_rng() {
        // all-zero bits draw U = 0.0, the bottom of the range
        let mut low = ExponentialBackoff::builder()
            .jitter(0.2)
            .rng(StepRng::new(0, 0))
            .build()
            .unwrap();
        assert_eq!(low.pause(0), Duration::from_millis(800));

        let mut high = ExponentialBackoff::builder()
            .jitter(0.2)
            .rng(StepRng::new(u64::MAX, 0))
            .build()
            .unwrap();
        let top = high.pause(0);
        assert!(top > Duration::from_millis(1199) && top <= Duration::from_millis(1200));
    }

    #[test]
    fn test_large_jitter_floors_at_zero() {
        let mut backoff = ExponentialBackoff::builder()
            .jitter(3.0)
            .rng(StepRng::new(0, 0))
            .build()
            .unwrap();

        assert_eq!(backoff.pause(0), Duration::ZERO);
        assert_eq!(backoff.pause(3), Duration::ZERO);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = ExponentialBackoff::builder().seed(99).build().unwrap();
        let mut b = ExponentialBackoff::builder().seed(99).build().unwrap();

        for attempt in 0..20 {
            assert_eq!(a.pause(attempt), b.pause(attempt));
        }
    }

    #[test]
    fn test_builder_defaults() {
        let backoff = ExponentialBackoff::builder().build().unwrap();

        assert_eq!(backoff.base_delay(), Duration::from_secs(1));
        assert_eq!(backoff.max_delay(), Duration::from_secs(180));
        assert_eq!(backoff.factor(), 1.6);
        assert_eq!(backoff.jitter(), 0.2);
        assert_eq!(backoff.reset_after(), Some(Duration::from_secs(3600)));
        assert_eq!(backoff.state(), PauseState::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let backoff = ExponentialBackoff::builder()
            .base_delay(Duration::from_millis(200))
            .max_delay(Duration::from_secs(30))
            .factor(1.5)
            .jitter(0.1)
            .without_reset()
            .build()
            .unwrap();

        assert_eq!(backoff.base_delay(), Duration::from_millis(200));
        assert_eq!(backoff.max_delay(), Duration::from_secs(30));
        assert_eq!(backoff.factor(), 1.5);
        assert_eq!(backoff.jitter(), 0.1);
        assert_eq!(backoff.reset_after(), None);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        assert_eq!(
            ExponentialBackoff::builder()
                .base_delay(Duration::ZERO)
                .build()
                .unwrap_err(),
            ConfigError::ZeroBaseDelay
        );
        assert_eq!(
            ExponentialBackoff::builder()
                .base_delay(Duration::from_secs(10))
                .max_delay(Duration::from_secs(5))
                .build()
                .unwrap_err(),
            ConfigError::MaxBelowBase {
                base: Duration::from_secs(10),
                max: Duration::from_secs(5),
            }
        );
        assert_eq!(
            ExponentialBackoff::builder().factor(1.0).build().unwrap_err(),
            ConfigError::FactorTooSmall(1.0)
        );
        assert_eq!(
            ExponentialBackoff::builder()
                .factor(f64::INFINITY)
                .build()
                .unwrap_err(),
            ConfigError::NonFiniteFactor
        );
        assert_eq!(
            ExponentialBackoff::builder()
                .jitter(f64::NAN)
                .build()
                .unwrap_err(),
            ConfigError::NonFiniteJitter
        );
    }

    #[test]
    fn test_equal_base_and_max_is_constant() {
        let mut backoff = no_jitter()
            .base_delay(Duration::from_secs(3))
            .max_delay(Duration::from_secs(3))
            .build()
            .unwrap();

        for attempt in 0..5 {
            assert_eq!(backoff.pause(attempt), Duration::from_secs(3));
        }
    }

    #[test]
    fn test_pause_records_state() {
        let mut backoff = no_jitter().build().unwrap();
        let pause = backoff.pause(2);

        let state = backoff.state();
        assert_eq!(state.last_pause, pause);
        assert!(state.last_invocation.is_some());
        assert_eq!(state.attempt_offset, 0);

        backoff.reset();
        assert_eq!(backoff.state(), PauseState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_resets_attempts() {
        let mut backoff = no_jitter().reset_after(Duration::from_secs(60)).build().unwrap();

        assert_eq!(backoff.pause(0), Duration::from_secs(1));
        assert_eq!(backoff.pause(1), Duration::from_millis(1600));
        assert_eq!(backoff.pause(2), Duration::from_millis(2560));

        // quiet for reset_after + last pause
        tokio::time::advance(Duration::from_secs(60) + Duration::from_millis(2560)).await;

        assert_eq!(backoff.pause(3), Duration::from_secs(1));
        assert_eq!(backoff.state().attempt_offset, 3);
        assert_eq!(backoff.pause(4), Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_gap_keeps_growing() {
        let mut backoff = no_jitter().reset_after(Duration::from_secs(60)).build().unwrap();

        backoff.pause(0);
        backoff.pause(1);
        // last pause 1.6s, so the threshold is 61.6s
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(backoff.pause(2), Duration::from_millis(2560));
        assert_eq!(backoff.state().attempt_offset, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_reset_never_forgets() {
        let mut backoff = no_jitter().without_reset().build().unwrap();

        backoff.pause(0);
        tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;

        assert_eq!(backoff.pause(1), Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_count_grows_again() {
        let mut backoff = no_jitter().reset_after(Duration::from_secs(1)).build().unwrap();

        backoff.pause(10);
        tokio::time::advance(Duration::from_secs(600)).await;
        backoff.pause(10);
        assert_eq!(backoff.state().attempt_offset, 10);

        // the caller starts counting from 0 again
        assert_eq!(backoff.pause(0), Duration::from_secs(1));
        assert_eq!(backoff.state().attempt_offset, 0);
        assert_eq!(backoff.pause(1), Duration::from_millis(1600));
        assert_eq!(backoff.pause(2), Duration::from_millis(2560));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offset_kept_while_count_keeps_climbing() {
        let mut backoff = no_jitter().reset_after(Duration::from_secs(1)).build().unwrap();

        backoff.pause(4);
        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(backoff.pause(5), Duration::from_secs(1));
        assert_eq!(backoff.pause(6), Duration::from_millis(1600));
        assert_eq!(backoff.state().attempt_offset, 5);
    }
}
