#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # rebound
//!
//! Retry one async operation with a growing, jittered wait between attempts, until it succeeds,
//! a budget runs out, the caller cancels, or the operation says stop.
//!
//! ## Features
//!
//! - **Constant or exponential intervals** with a hard cap
//! - **Symmetric jitter** drawn from a per-call, seedable generator
//! - **Retry and elapsed-time budgets** (zero means unlimited)
//! - **Cancellation** that interrupts the wait between attempts
//! - **Permanent errors** that bypass every budget and come back unchanged
//! - **Tower layer** for wrapping services
//!
//! ## Quick Start
//!
//! ```rust
//! use rebound::{permanent, Backoff, BackoffError};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backoff = Backoff::<std::io::Error>::builder()
//!         .max_retries(5)
//!         .exponential()
//!         .interval(Duration::from_millis(10))
//!         .max_interval(Duration::from_secs(1))
//!         .on_retry(|err, delay, attempt| {
//!             eprintln!("attempt {attempt} failed ({err}); retrying in {delay:?}")
//!         })
//!         .build();
//!
//!     let token = CancellationToken::new();
//!     let result: Result<&str, BackoffError<std::io::Error>> = backoff
//!         .execute(&token, |_token| async {
//!             // Your async operation here; `?` on a plain error retries,
//!             // `Err(permanent(e))` gives up immediately.
//!             Ok("connected")
//!         })
//!         .await;
//!     assert_eq!(result.unwrap(), "connected");
//! #   let _ = permanent::<std::io::Error>;
//! }
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod interval;
pub mod jitter;
pub mod layer;
pub mod prelude;
pub mod sleeper;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::BackoffSettings;
pub use engine::{Backoff, BackoffBuilder, RetryCallback};
pub use error::{permanent, transient, BackoffError, OperationError, TerminationReason};
pub use interval::{Growth, IntervalSchedule};
pub use jitter::Jitter;
pub use layer::{BackoffLayer, BackoffService};
pub use sleeper::{InstantSleeper, PendingSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use tokio_util::sync::CancellationToken;
