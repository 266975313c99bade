//! Wrap a tower service with `BackoffLayer`.
use rebound::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{service_fn, ServiceBuilder, ServiceExt};

#[tokio::main]
async fn main() -> Result<(), BackoffError<std::io::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let backoff = Backoff::<std::io::Error>::builder()
        .max_retries(4)
        .interval(Duration::from_millis(50))
        .build();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let svc = ServiceBuilder::new().layer(BackoffLayer::uncancellable(backoff)).service(service_fn(
        move |name: &'static str| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "busy"))
                } else {
                    Ok(format!("hello, {name}"))
                }
            }
        },
    ));

    let greeting = svc.oneshot("world").await?;
    println!("{greeting} after {} calls", calls.load(Ordering::SeqCst));
    Ok(())
}
