//! Cancel a retry loop from another task, e.g. on shutdown.
use rebound::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let backoff = Backoff::<std::io::Error>::builder()
        .interval(Duration::from_secs(5))
        .build();
    let token = CancellationToken::new();

    let shutdown = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        println!("shutting down");
        shutdown.cancel();
    });

    let result: Result<(), _> = backoff
        .execute(&token, |_token| async {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "broker offline").into())
        })
        .await;

    match result {
        Err(err) => println!("stopped: {} ({})", err, err.reason()),
        Ok(()) => println!("connected"),
    }
}
