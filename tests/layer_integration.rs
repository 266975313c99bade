use rebound::{Backoff, BackoffLayer, CancellationToken, TrackingSleeper};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tower::{Service, ServiceBuilder, ServiceExt};

#[derive(Clone)]
struct TestService {
    fail_first: usize,
    counter: Arc<AtomicUsize>,
}

impl TestService {
    fn new(fail_first: usize) -> Self {
        Self { fail_first, counter: Arc::new(AtomicUsize::new(0)) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("backend unavailable")]
struct TestError;

impl Service<String> for TestService {
    type Response = usize;
    type Error = TestError;
    type Future = futures::future::Ready<Result<usize, TestError>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: String) -> Self::Future {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            futures::future::ready(Err(TestError))
        } else {
            futures::future::ready(Ok(req.len()))
        }
    }
}

fn quick_backoff(retries: u32, sleeper: &TrackingSleeper) -> Backoff<TestError> {
    Backoff::builder()
        .max_retries(retries)
        .interval(Duration::from_millis(1))
        .with_sleeper(sleeper.clone())
        .build()
}

#[tokio::test]
async fn service_builder_stack_retries_transient_failures() {
    let sleeper = TrackingSleeper::new();
    let svc = TestService::new(2);
    let mut wrapped = ServiceBuilder::new()
        .layer(BackoffLayer::uncancellable(quick_backoff(5, &sleeper)))
        .service(svc.clone());

    let len = wrapped.ready().await.unwrap().call("hello".to_string()).await.unwrap();
    assert_eq!(len, 5);
    assert_eq!(svc.counter.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.calls(), 2);
}

#[tokio::test]
async fn each_request_gets_a_fresh_budget() {
    let sleeper = TrackingSleeper::new();
    let svc = TestService::new(2);
    let mut wrapped = ServiceBuilder::new()
        .layer(BackoffLayer::uncancellable(quick_backoff(3, &sleeper)))
        .service(svc.clone());

    // First request burns two failures, second succeeds immediately.
    wrapped.ready().await.unwrap().call("a".to_string()).await.unwrap();
    wrapped.ready().await.unwrap().call("bb".to_string()).await.unwrap();
    assert_eq!(svc.counter.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn shared_token_cancels_every_wrapped_service() {
    let sleeper = TrackingSleeper::new();
    let token = CancellationToken::new();
    let layer = BackoffLayer::new(quick_backoff(0, &sleeper), token.clone());
    let first = ServiceBuilder::new().layer(layer.clone()).service(TestService::new(0));
    let second = ServiceBuilder::new().layer(layer).service(TestService::new(0));

    token.cancel();

    assert!(first.oneshot("x".to_string()).await.unwrap_err().is_cancelled());
    assert!(second.oneshot("y".to_string()).await.unwrap_err().is_cancelled());
}
