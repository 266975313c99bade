//! Backoff engine
//!
//! Runs one fallible async operation until it succeeds or a stop condition is met.
//!
//! Semantics:
//! - Each call returns `Ok`, `Err(OperationError::Transient(_))` or
//!   `Err(OperationError::Permanent(_))`. Plain errors converted with `?` are transient.
//! - A permanent error ends the run immediately as `BackoffError::Terminal`, carrying the cause
//!   unchanged. No wait, no callback.
//! - Every transient error increments the attempt counter, then the budgets are checked in order:
//!   `max_retries` (when non-zero) and `max_elapsed_time` (when non-zero). An exhausted budget
//!   ends the run without waiting.
//! - A token cancelled while the attempt ran ends the run as `Cancelled`, with no callback.
//! - Otherwise the next interval is computed, jittered, reported to `on_retry`, and waited on.
//!   The wait races the cancellation token; cancellation wins ties.
//!
//! Invariants:
//! - Retry state (start time, interval, attempt counter, RNG) lives inside one `execute` call.
//! - With `max_retries = N` the operation runs at most `N` times and waits `N - 1` times.
//! - The pre-jitter interval never exceeds `max_interval`.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use rebound::{permanent, Backoff, BackoffError, OperationError};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! struct MyErr(&'static str);
//! impl std::fmt::Display for MyErr { fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.0) } }
//! impl std::error::Error for MyErr {}
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let backoff = Backoff::<MyErr>::builder()
//!     .max_retries(3)
//!     .exponential()
//!     .interval(Duration::from_millis(1))
//!     .build();
//! let token = CancellationToken::new();
//!
//! let result: Result<(), BackoffError<MyErr>> = backoff
//!     .execute(&token, |_token| async { Err(permanent(MyErr("bad input"))) })
//!     .await;
//! assert_eq!(result.unwrap_err().to_string(), "bad input");
//! # });
//! ```

use crate::clock::{Clock, MonotonicClock};
use crate::config::BackoffSettings;
use crate::error::{BackoffError, OperationError};
use crate::interval::IntervalSchedule;
use crate::jitter::Jitter;
use crate::sleeper::{Sleeper, TokioSleeper};
use rand::rngs::StdRng;
use rand::{rng, Rng, SeedableRng};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Observer invoked before each wait with the failing error, the delay, and the attempt count.
pub type RetryCallback<E> = Arc<dyn Fn(&E, Duration, u32) + Send + Sync>;

/// Retry engine: immutable settings plus the pluggable wait, clock, and seed sources.
///
/// Cheap to clone; clones share settings and the seed generator.
pub struct Backoff<E> {
    settings: Arc<BackoffSettings>,
    on_retry: Option<RetryCallback<E>>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    seeds: Arc<Mutex<StdRng>>,
}

impl<E> Clone for Backoff<E> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            on_retry: self.on_retry.clone(),
            sleeper: self.sleeper.clone(),
            clock: self.clock.clone(),
            seeds: self.seeds.clone(),
        }
    }
}

impl<E> fmt::Debug for Backoff<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("settings", &self.settings)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .field("sleeper", &self.sleeper)
            .field("clock", &self.clock)
            .finish()
    }
}

impl<E> Default for Backoff<E> {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Mutable state of a single `execute` call.
struct RetryState {
    start: Duration,
    interval: Duration,
    attempts: u32,
    rng: StdRng,
}

impl<E> Backoff<E> {
    /// Construct a new builder with defaults.
    pub fn builder() -> BackoffBuilder<E> {
        BackoffBuilder::new()
    }

    /// Engine with the given settings, the tokio sleeper and a monotonic clock.
    pub fn new(settings: BackoffSettings) -> Self {
        Self::builder().settings(settings).build()
    }

    pub fn settings(&self) -> &BackoffSettings {
        &self.settings
    }

    /// Execute `operation` with backoff until it succeeds, fails permanently, runs out of budget,
    /// or `token` is cancelled.
    ///
    /// The operation receives a clone of `token` so it can abandon in-flight work on its own.
    pub async fn execute<T, Fut, Op>(
        &self,
        token: &CancellationToken,
        mut operation: Op,
    ) -> Result<T, BackoffError<E>>
    where
        E: fmt::Display,
        Op: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, OperationError<E>>>,
    {
        if token.is_cancelled() {
            tracing::debug!("retry cancelled before first attempt");
            return Err(BackoffError::Cancelled { attempts: 0 });
        }

        let schedule = IntervalSchedule::from_settings(&self.settings);
        let jitter = Jitter::new(self.settings.randomization_factor);
        let mut state = RetryState {
            start: self.clock.now(),
            interval: schedule.initial(),
            attempts: 0,
            rng: self.call_rng(),
        };

        loop {
            let error = match operation(token.clone()).await {
                Ok(value) => return Ok(value),
                Err(OperationError::Permanent(cause)) => {
                    tracing::debug!(
                        attempt = state.attempts.saturating_add(1),
                        error = %cause,
                        "permanent error, not retrying"
                    );
                    return Err(BackoffError::Terminal(cause));
                }
                Err(OperationError::Transient(error)) => error,
            };

            let delay =
                self.on_transient_failure(&mut state, &schedule, &jitter, token, error)?;

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(
                        attempts = state.attempts,
                        "retry cancelled during backoff wait"
                    );
                    return Err(BackoffError::Cancelled { attempts: state.attempts });
                }
                _ = self.sleeper.sleep(delay) => {}
            }
        }
    }

    /// Count the failure, enforce budgets, and compute the next delay.
    fn on_transient_failure(
        &self,
        state: &mut RetryState,
        schedule: &IntervalSchedule,
        jitter: &Jitter,
        token: &CancellationToken,
        error: E,
    ) -> Result<Duration, BackoffError<E>>
    where
        E: fmt::Display,
    {
        state.attempts = state.attempts.saturating_add(1);
        let attempts = state.attempts;

        if let Some(limit) = self.settings.retry_limit() {
            if attempts >= limit {
                tracing::warn!(attempts, error = %error, "retry budget exhausted");
                return Err(BackoffError::RetriesExhausted { attempts, last_error: error });
            }
        }

        if let Some(limit) = self.settings.elapsed_limit() {
            let elapsed = self.clock.now().saturating_sub(state.start);
            if elapsed > limit {
                tracing::warn!(
                    attempts,
                    elapsed_ms = millis(elapsed),
                    limit_ms = millis(limit),
                    error = %error,
                    "elapsed time budget exhausted"
                );
                return Err(BackoffError::ElapsedTimeExhausted {
                    attempts,
                    elapsed,
                    limit,
                    last_error: error,
                });
            }
        }

        // Cancelled while the attempt ran: no callback, no wait.
        if token.is_cancelled() {
            tracing::debug!(attempts, "retry cancelled after failed attempt");
            return Err(BackoffError::Cancelled { attempts });
        }

        state.interval = schedule.next(state.interval);
        let delay = jitter.apply_with_rng(state.interval, &mut state.rng);

        if let Some(callback) = &self.on_retry {
            callback(&error, delay, attempts);
        }

        tracing::debug!(
            attempt = attempts,
            delay_ms = millis(delay),
            error = %error,
            "transient error, backing off"
        );
        Ok(delay)
    }

    /// Fresh generator for one call, seeded from the engine's shared seed source.
    fn call_rng(&self) -> StdRng {
        let mut seeds = self.seeds.lock().unwrap_or_else(PoisonError::into_inner);
        StdRng::seed_from_u64(seeds.random())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`Backoff`]. Every option sets one field; anything unset keeps its default.
pub struct BackoffBuilder<E> {
    settings: BackoffSettings,
    on_retry: Option<RetryCallback<E>>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    seed: Option<u64>,
}

impl<E> BackoffBuilder<E> {
    /// Create a builder with the documented defaults.
    pub fn new() -> Self {
        Self {
            settings: BackoffSettings::default(),
            on_retry: None,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(MonotonicClock::default()),
            seed: None,
        }
    }

    /// Replace all numeric settings at once, e.g. with values loaded from a config file.
    pub fn settings(mut self, settings: BackoffSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Failed attempts before giving up; `0` retries forever.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.settings.max_retries = retries;
        self
    }

    /// Grow the interval by the multiplier after each failure.
    pub fn exponential(mut self) -> Self {
        self.settings.exponential = true;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.settings.multiplier = multiplier;
        self
    }

    /// Starting interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.settings.initial_interval = interval;
        self
    }

    pub fn max_interval(mut self, max: Duration) -> Self {
        self.settings.max_interval = max;
        self
    }

    /// Jitter magnitude as a fraction of the interval, in `[0, 1]`.
    pub fn randomization_factor(mut self, factor: f64) -> Self {
        self.settings.randomization_factor = factor;
        self
    }

    /// Wall-clock budget from the first attempt; `Duration::ZERO` disables it.
    pub fn max_elapsed_time(mut self, budget: Duration) -> Self {
        self.settings.max_elapsed_time = budget;
        self
    }

    /// Observe each scheduled retry. Runs synchronously before the wait and must not panic.
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E, Duration, u32) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Seed the jitter source so delay sequences are reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Provide a custom clock for the elapsed-time budget.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> Backoff<E> {
        let seeds = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rng().random()),
        };
        Backoff {
            settings: Arc::new(self.settings),
            on_retry: self.on_retry,
            sleeper: self.sleeper,
            clock: self.clock,
            seeds: Arc::new(Mutex::new(seeds)),
        }
    }
}

impl<E> Default for BackoffBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
