//! Interval growth between retry attempts.
//!
//! Each failed attempt advances the pre-jitter interval one step:
//! - once the current interval reaches `max_interval / multiplier`, the next step is pinned to
//!   `max_interval` (growing further would overshoot the cap);
//! - otherwise exponential growth multiplies by `multiplier`, and constant growth returns
//!   `initial_interval` unchanged.
//!
//! The result is never above `max_interval`. Jitter is applied afterwards by [`crate::Jitter`]
//! and never feeds back into the next step.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use rebound::{BackoffSettings, IntervalSchedule};
//!
//! let schedule = IntervalSchedule::from_settings(&BackoffSettings {
//!     exponential: true,
//!     multiplier: 2.0,
//!     initial_interval: Duration::from_millis(100),
//!     max_interval: Duration::from_millis(500),
//!     ..BackoffSettings::default()
//! });
//! let first = schedule.next(schedule.initial());
//! assert_eq!(first, Duration::from_millis(200));
//! assert_eq!(schedule.next(first), Duration::from_millis(400));
//! assert_eq!(schedule.next(Duration::from_millis(400)), Duration::from_millis(500)); // capped
//! ```

use crate::config::BackoffSettings;
use std::time::Duration;

/// How the interval evolves between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Growth {
    /// Every step returns the initial interval.
    Constant,
    /// Every step multiplies the previous interval.
    Exponential,
}

/// Pre-jitter interval progression derived from [`BackoffSettings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSchedule {
    growth: Growth,
    initial: Duration,
    max: Duration,
    multiplier: f64,
}

impl IntervalSchedule {
    pub fn from_settings(settings: &BackoffSettings) -> Self {
        let growth = if settings.exponential { Growth::Exponential } else { Growth::Constant };
        Self::new(growth, settings.initial_interval, settings.max_interval, settings.multiplier)
    }

    /// Build a schedule directly. Multipliers below `1.0` (or NaN) are treated as `1.0`.
    pub fn new(growth: Growth, initial: Duration, max: Duration, multiplier: f64) -> Self {
        let multiplier = if multiplier >= 1.0 { multiplier } else { 1.0 };
        Self { growth, initial, max, multiplier }
    }

    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// Interval the retry state starts from, before the first step.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Advance one step from `current`.
    pub fn next(&self, current: Duration) -> Duration {
        let threshold = self.max.as_nanos() as f64 / self.multiplier;
        if current.as_nanos() as f64 >= threshold {
            return self.max;
        }
        let next = match self.growth {
            Growth::Constant => self.initial,
            Growth::Exponential => scale(current, self.multiplier).unwrap_or(self.max),
        };
        next.min(self.max)
    }
}

/// `duration * factor` at nanosecond precision, `None` once it leaves the `u64` nanosecond range.
fn scale(duration: Duration, factor: f64) -> Option<Duration> {
    let nanos = duration.as_nanos() as f64 * factor;
    (nanos.is_finite() && nanos < u64::MAX as f64).then(|| Duration::from_nanos(nanos as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(initial_ms: u64, max_ms: u64, multiplier: f64) -> IntervalSchedule {
        IntervalSchedule::new(
            Growth::Exponential,
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
            multiplier,
        )
    }

    #[test]
    fn constant_growth_returns_initial_interval() {
        let schedule = IntervalSchedule::new(
            Growth::Constant,
            Duration::from_millis(250),
            Duration::from_secs(60),
            1.5,
        );
        let mut current = schedule.initial();
        for _ in 0..50 {
            current = schedule.next(current);
            assert_eq!(current, Duration::from_millis(250));
        }
    }

    #[test]
    fn exponential_growth_multiplies() {
        let schedule = exponential(100, 60_000, 1.5);
        assert_eq!(schedule.next(Duration::from_millis(100)), Duration::from_millis(150));
        assert_eq!(schedule.next(Duration::from_millis(150)), Duration::from_millis(225));
    }

    #[test]
    fn reaching_cap_threshold_pins_to_max() {
        let schedule = exponential(100, 1_000, 2.0);
        // 500ms is exactly max / multiplier
        assert_eq!(schedule.next(Duration::from_millis(500)), Duration::from_secs(1));
        assert_eq!(schedule.next(Duration::from_millis(499)), Duration::from_millis(998));
        assert_eq!(schedule.next(Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn progression_never_exceeds_max() {
        let schedule = exponential(7, 10_000, 1.7);
        let mut current = schedule.initial();
        for _ in 0..200 {
            current = schedule.next(current);
            assert!(current <= schedule.max());
        }
        assert_eq!(current, schedule.max());
    }

    #[test]
    fn constant_growth_still_respects_cap_threshold() {
        let schedule = IntervalSchedule::new(
            Growth::Constant,
            Duration::from_secs(50),
            Duration::from_secs(60),
            1.5,
        );
        assert_eq!(schedule.next(schedule.initial()), Duration::from_secs(60));
    }

    #[test]
    fn initial_above_max_is_capped() {
        let schedule = exponential(5_000, 1_000, 1.5);
        assert_eq!(schedule.next(schedule.initial()), Duration::from_secs(1));
    }

    #[test]
    fn degenerate_multiplier_is_treated_as_one() {
        let schedule = exponential(100, 1_000, 0.25);
        assert_eq!(schedule.multiplier(), 1.0);
        assert_eq!(schedule.next(Duration::from_millis(100)), Duration::from_millis(100));

        let nan = exponential(100, 1_000, f64::NAN);
        assert_eq!(nan.multiplier(), 1.0);
    }

    #[test]
    fn huge_max_saturates_without_panicking() {
        let schedule = IntervalSchedule::new(
            Growth::Exponential,
            Duration::from_secs(u64::MAX / 4),
            Duration::MAX,
            1e12,
        );
        let next = schedule.next(schedule.initial());
        assert!(next <= Duration::MAX);
    }

    #[test]
    fn zero_initial_stays_zero() {
        let schedule = exponential(0, 1_000, 2.0);
        assert_eq!(schedule.next(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn from_settings_picks_growth() {
        let constant = IntervalSchedule::from_settings(&BackoffSettings::default());
        assert_eq!(constant.growth(), Growth::Constant);

        let settings = BackoffSettings { exponential: true, ..BackoffSettings::default() };
        assert_eq!(IntervalSchedule::from_settings(&settings).growth(), Growth::Exponential);
    }
}
