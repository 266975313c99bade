//! Retry a flaky fetch with exponential backoff and a retry callback.
use rebound::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), BackoffError<std::io::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let backoff = Backoff::<std::io::Error>::builder()
        .max_retries(5)
        .exponential()
        .interval(Duration::from_millis(100))
        .max_interval(Duration::from_secs(2))
        .on_retry(|err, delay, attempt| {
            println!("attempt {attempt} failed: {err}; waiting {delay:?}")
        })
        .build();

    let remaining_failures = Arc::new(AtomicU32::new(3));
    let token = CancellationToken::new();
    let body = backoff
        .execute(&token, |_token| {
            let remaining = remaining_failures.clone();
            async move {
                if remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
                    // Plain errors are transient.
                    let timed_out = std::io::ErrorKind::TimedOut;
                    Err::<(), _>(std::io::Error::new(timed_out, "upstream timed out"))?;
                }
                Ok::<_, OperationError<std::io::Error>>("payload")
            }
        })
        .await?;

    println!("fetched {body}");
    Ok(())
}
