//! Symmetric jitter around a base interval.
//!
//! For a base interval `B` and randomization factor `r`, the delay is drawn uniformly from the
//! closed range `[B - r*B, B + r*B]`. A factor of `0` disables jitter entirely.
//!
//! Notes:
//! - RNG: `apply` uses `rand`'s thread-local RNG; the engine calls `apply_with_rng` with a
//!   generator local to one `execute` call so concurrent calls never share a sequence.
//! - Precision: sampling happens in whole nanoseconds. Intervals beyond `u64::MAX` nanoseconds
//!   (~584 years) saturate instead of panicking.
//! - Factors outside `[0, 1]` are clamped; NaN behaves as `0`.
//!
//! Example:
//! ```rust
//! use rebound::Jitter;
//! use std::time::Duration;
//!
//! let jitter = Jitter::new(0.5);
//! let delay = jitter.apply(Duration::from_millis(1000));
//! assert!(delay >= Duration::from_millis(500) && delay <= Duration::from_millis(1500));
//! ```

use rand::{rng, Rng};
use std::time::Duration;

/// Randomization applied to each computed interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    factor: f64,
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RANDOMIZATION_FACTOR)
    }
}

impl Jitter {
    /// Jitter of `factor * interval` in both directions.
    pub fn new(factor: f64) -> Self {
        let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        Self { factor }
    }

    /// Deterministic delays: the base interval is used as-is.
    pub fn none() -> Self {
        Self { factor: 0.0 }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Inclusive `(low, high)` range a delay for `base` is drawn from.
    pub fn bounds(&self, base: Duration) -> (Duration, Duration) {
        let (low, high) = self.bounds_nanos(base);
        (Duration::from_nanos(low), Duration::from_nanos(high))
    }

    /// Apply jitter to a delay duration.
    pub fn apply(&self, base: Duration) -> Duration {
        let mut rng = rng();
        self.apply_with_rng(base, &mut rng)
    }

    /// Apply jitter with a caller-provided RNG.
    pub fn apply_with_rng<R: Rng>(&self, base: Duration, rng: &mut R) -> Duration {
        if self.factor == 0.0 || base.is_zero() {
            return base;
        }
        let (low, high) = self.bounds_nanos(base);
        Duration::from_nanos(rng.random_range(low..=high))
    }

    fn bounds_nanos(&self, base: Duration) -> (u64, u64) {
        let nanos = as_nanos_saturated(base);
        // Flooring keeps the range inside [B(1-r), B(1+r)].
        let delta = (nanos as f64 * self.factor) as u64;
        (nanos.saturating_sub(delta), nanos.saturating_add(delta))
    }
}

fn as_nanos_saturated(duration: Duration) -> u64 {
    duration.as_nanos().try_into().unwrap_or(u64::MAX)
}
