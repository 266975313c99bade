//! Error types for the backoff engine
//!
//! Operations classify their own failures with [`OperationError`]: `Transient` errors are
//! retried, `Permanent` ones stop the loop and come back to the caller untouched. `From<E>` makes
//! plain errors transient, so `?` inside an operation retries by default and [`permanent`] is the
//! explicit opt-out.
//!
//! The engine reports how a run ended with [`BackoffError`].
use std::fmt;
use std::time::Duration;

/// Classified failure of a single operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError<E> {
    /// Worth another attempt.
    Transient(E),
    /// Stop retrying and hand this error back as-is.
    Permanent(E),
}

/// Mark an error as non-retryable.
pub fn permanent<E>(error: E) -> OperationError<E> {
    OperationError::Permanent(error)
}

/// Mark an error as retryable. Equivalent to `OperationError::from(error)`.
pub fn transient<E>(error: E) -> OperationError<E> {
    OperationError::Transient(error)
}

impl<E> From<E> for OperationError<E> {
    fn from(error: E) -> Self {
        OperationError::Transient(error)
    }
}

impl<E> OperationError<E> {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// The wrapped cause, without the classification.
    pub fn into_inner(self) -> E {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }

    pub fn as_inner(&self) -> &E {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }

    /// Transform the cause while keeping the classification.
    pub fn map<F, U>(self, f: F) -> OperationError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            Self::Transient(e) => OperationError::Transient(f(e)),
            Self::Permanent(e) => OperationError::Permanent(f(e)),
        }
    }
}

impl<E: fmt::Display> fmt::Display for OperationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_inner(), f)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for OperationError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.as_inner().source()
    }
}

/// Why an `execute` call stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    Success,
    RetryBudgetExhausted,
    TimeBudgetExhausted,
    Cancelled,
    TerminalError,
}

impl TerminationReason {
    /// Reason for a finished `execute` result.
    pub fn of<T, E>(result: &Result<T, BackoffError<E>>) -> Self {
        match result {
            Ok(_) => TerminationReason::Success,
            Err(e) => e.reason(),
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::Success => "success",
            TerminationReason::RetryBudgetExhausted => "retry budget exhausted",
            TerminationReason::TimeBudgetExhausted => "time budget exhausted",
            TerminationReason::Cancelled => "cancelled",
            TerminationReason::TerminalError => "terminal error",
        };
        f.write_str(s)
    }
}

/// Failure result of [`Backoff::execute`](crate::Backoff::execute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffError<E> {
    /// The operation marked its error permanent; the cause is returned unchanged.
    Terminal(E),
    /// `max_retries` failed attempts were made.
    RetriesExhausted { attempts: u32, last_error: E },
    /// More than `max_elapsed_time` passed since the first attempt.
    ElapsedTimeExhausted { attempts: u32, elapsed: Duration, limit: Duration, last_error: E },
    /// The cancellation token fired before the first attempt or during a wait.
    Cancelled { attempts: u32 },
}

impl<E: fmt::Display> fmt::Display for BackoffError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(e) => fmt::Display::fmt(e, f),
            Self::RetriesExhausted { attempts, last_error } => {
                write!(
                    f,
                    "retries exhausted after {} attempts; last error: {}",
                    attempts, last_error
                )
            }
            Self::ElapsedTimeExhausted { attempts, elapsed, limit, last_error } => {
                write!(
                    f,
                    "elapsed time {:?} exceeded limit {:?} after {} attempts; last error: {}",
                    elapsed, limit, attempts, last_error
                )
            }
            Self::Cancelled { attempts } => {
                write!(f, "retry cancelled after {} attempts", attempts)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BackoffError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            // Display already is the cause; expose the cause's own chain.
            Self::Terminal(e) => e.source(),
            Self::RetriesExhausted { last_error, .. }
            | Self::ElapsedTimeExhausted { last_error, .. } => Some(last_error),
            Self::Cancelled { .. } => None,
        }
    }
}

impl<E> BackoffError<E> {
    pub fn reason(&self) -> TerminationReason {
        match self {
            Self::Terminal(_) => TerminationReason::TerminalError,
            Self::RetriesExhausted { .. } => TerminationReason::RetryBudgetExhausted,
            Self::ElapsedTimeExhausted { .. } => TerminationReason::TimeBudgetExhausted,
            Self::Cancelled { .. } => TerminationReason::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    pub fn is_elapsed_time_exhausted(&self) -> bool {
        matches!(self, Self::ElapsedTimeExhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Failed attempts counted before the run ended; `None` for `Terminal`.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Terminal(_) => None,
            Self::RetriesExhausted { attempts, .. }
            | Self::ElapsedTimeExhausted { attempts, .. }
            | Self::Cancelled { attempts } => Some(*attempts),
        }
    }

    /// Unwrap the cause of a `Terminal` error.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Terminal(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Terminal(e) => Some(e),
            _ => None,
        }
    }

    /// Last retryable error seen before a budget ran out.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::RetriesExhausted { last_error, .. }
            | Self::ElapsedTimeExhausted { last_error, .. } => Some(last_error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DummyError(&'static str);

    impl fmt::Display for DummyError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for DummyError {}

    #[test]
    fn plain_errors_convert_to_transient() {
        let err: OperationError<DummyError> = DummyError("flaky").into();
        assert!(err.is_transient());
        assert!(!err.is_permanent());
        assert_eq!(err, transient(DummyError("flaky")));
    }

    #[test]
    fn question_mark_classifies_as_transient() {
        fn op() -> Result<(), OperationError<DummyError>> {
            Err::<(), _>(DummyError("io"))?;
            Ok(())
        }
        assert_eq!(op(), Err(OperationError::Transient(DummyError("io"))));
    }

    #[test]
    fn permanent_unwraps_to_original() {
        let err = permanent(DummyError("bad request"));
        assert!(err.is_permanent());
        assert_eq!(err.to_string(), "bad request");
        assert_eq!(err.into_inner(), DummyError("bad request"));
    }

    #[test]
    fn map_keeps_classification() {
        let err = permanent(DummyError("x")).map(|e| e.0.len());
        assert_eq!(err, OperationError::Permanent(1));
        let err = transient(DummyError("xy")).map(|e| e.0.len());
        assert_eq!(err, OperationError::Transient(2));
    }

    #[test]
    fn terminal_displays_cause_verbatim() {
        let err: BackoffError<DummyError> = BackoffError::Terminal(DummyError("denied"));
        assert_eq!(err.to_string(), "denied");
        assert_eq!(err.reason(), TerminationReason::TerminalError);
        assert_eq!(err.into_inner(), Some(DummyError("denied")));
    }

    #[test]
    fn terminal_source_is_causes_source() {
        let inner = io::Error::new(io::ErrorKind::Other, "disk");
        let err = BackoffError::Terminal(inner);
        assert!(err.source().is_none());
    }

    #[test]
    fn retries_exhausted_display_and_source() {
        let err = BackoffError::RetriesExhausted { attempts: 3, last_error: DummyError("last") };
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("last error: last"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("last".to_string()));
        assert_eq!(err.last_error(), Some(&DummyError("last")));
    }

    #[test]
    fn elapsed_time_display_mentions_limit() {
        let err = BackoffError::ElapsedTimeExhausted {
            attempts: 5,
            elapsed: Duration::from_millis(1500),
            limit: Duration::from_secs(1),
            last_error: DummyError("slow"),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.5s"));
        assert!(msg.contains("limit 1s"));
        assert!(err.source().is_some());
    }

    #[test]
    fn cancelled_has_no_source() {
        let err: BackoffError<DummyError> = BackoffError::Cancelled { attempts: 2 };
        assert!(err.source().is_none());
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(err.attempts(), Some(2));
    }

    #[test]
    fn predicates_cover_all_variants() {
        let terminal: BackoffError<DummyError> = BackoffError::Terminal(DummyError("t"));
        let retries = BackoffError::RetriesExhausted { attempts: 1, last_error: DummyError("r") };
        let elapsed = BackoffError::ElapsedTimeExhausted {
            attempts: 1,
            elapsed: Duration::from_secs(2),
            limit: Duration::from_secs(1),
            last_error: DummyError("e"),
        };
        let cancelled: BackoffError<DummyError> = BackoffError::Cancelled { attempts: 0 };

        assert!(terminal.is_terminal() && !terminal.is_cancelled());
        assert!(retries.is_retries_exhausted() && !retries.is_elapsed_time_exhausted());
        assert!(elapsed.is_elapsed_time_exhausted() && !elapsed.is_retries_exhausted());
        assert!(cancelled.is_cancelled() && !cancelled.is_terminal());

        let reasons: Vec<_> =
            [terminal, retries, elapsed, cancelled].iter().map(BackoffError::reason).collect();
        assert_eq!(
            reasons,
            vec![
                TerminationReason::TerminalError,
                TerminationReason::RetryBudgetExhausted,
                TerminationReason::TimeBudgetExhausted,
                TerminationReason::Cancelled,
            ]
        );
    }

    #[test]
    fn termination_reason_of_success() {
        let ok: Result<u8, BackoffError<DummyError>> = Ok(1);
        assert_eq!(TerminationReason::of(&ok), TerminationReason::Success);
        assert_eq!(TerminationReason::Success.to_string(), "success");
    }
}
