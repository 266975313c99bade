//! Backoff settings and their defaults.
//!
//! `BackoffSettings` is plain data: every field is independent and any field left untouched keeps
//! its documented default. Zero is the "unlimited" sentinel for both budgets.
//!
//! | field                  | default  | meaning                                         |
//! |------------------------|----------|-------------------------------------------------|
//! | `max_retries`          | `0`      | failed attempts before giving up (0 = no limit) |
//! | `exponential`          | `false`  | grow the interval, or keep it constant          |
//! | `multiplier`           | `1.5`    | growth factor per failed attempt                |
//! | `initial_interval`     | `500ms`  | starting interval                               |
//! | `max_interval`         | `60s`    | cap on the pre-jitter interval                  |
//! | `randomization_factor` | `0.5`    | jitter as a fraction of the interval            |
//! | `max_elapsed_time`     | `0`      | wall-clock budget (0 = no limit)                |
//!
//! With the `serde` feature the struct (de)serializes with `#[serde(default)]`, so partial
//! configuration files only need to name the fields they change.

use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 0;
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::ZERO;

/// Immutable knobs for a [`Backoff`](crate::Backoff) engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BackoffSettings {
    /// Failed attempts allowed before `RetriesExhausted`; `0` means unlimited.
    pub max_retries: u32,
    /// Grow the interval by `multiplier` after each failure instead of keeping it constant.
    pub exponential: bool,
    /// Growth factor; values below `1.0` behave as `1.0`.
    pub multiplier: f64,
    /// Interval the first growth step starts from.
    pub initial_interval: Duration,
    /// Upper bound for the pre-jitter interval.
    pub max_interval: Duration,
    /// Jitter magnitude in `[0, 1]`; out-of-range values are clamped.
    pub randomization_factor: f64,
    /// Wall-clock budget measured from the first attempt; `Duration::ZERO` means unlimited.
    pub max_elapsed_time: Duration,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            exponential: false,
            multiplier: DEFAULT_MULTIPLIER,
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            max_elapsed_time: DEFAULT_MAX_ELAPSED_TIME,
        }
    }
}

impl BackoffSettings {
    /// `Some(n)` when a retry ceiling is configured.
    pub fn retry_limit(&self) -> Option<u32> {
        (self.max_retries != 0).then_some(self.max_retries)
    }

    /// `Some(d)` when an elapsed-time ceiling is configured.
    pub fn elapsed_limit(&self) -> Option<Duration> {
        (!self.max_elapsed_time.is_zero()).then_some(self.max_elapsed_time)
    }
}
