//! Abstraction for the wait between attempts
//!
//! The engine races whatever future a `Sleeper` returns against the cancellation token, so any
//! implementation is interruptible. Test sleepers make retry loops run without real delays.

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Abstraction for sleeping/waiting
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Production sleeper using tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test sleeper that doesn't actually sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

/// Test sleeper that records every requested delay and returns immediately.
///
/// Clones share the same record, so a clone handed to the engine can be inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of waits requested so far.
    pub fn calls(&self) -> usize {
        self.lock().len()
    }

    /// Requested delay of the `idx`-th wait.
    pub fn call_at(&self, idx: usize) -> Option<Duration> {
        self.lock().get(idx).copied()
    }

    /// All requested delays, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Duration>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.lock().push(duration);
        Box::pin(async {})
    }
}

/// Test sleeper whose waits never finish; only cancellation can end them.
#[derive(Debug, Default, Clone, Copy)]
pub struct PendingSleeper;

impl Sleeper for PendingSleeper {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(futures::future::pending())
    }
}
