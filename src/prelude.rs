//! Convenient re-exports for common rebound types.
pub use crate::{
    config::BackoffSettings,
    engine::{Backoff, BackoffBuilder},
    error::{permanent, transient, BackoffError, OperationError, TerminationReason},
    jitter::Jitter,
    layer::BackoffLayer,
    sleeper::{Sleeper, TokioSleeper},
    CancellationToken,
};
