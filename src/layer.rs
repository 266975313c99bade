//! Tower integration.
//!
//! `BackoffLayer` wraps a service so every request runs through [`Backoff::execute`]. Requests
//! must be `Clone` because each attempt consumes one. Service errors convert into
//! [`OperationError`]: plain errors are transient through `From<E>`, and a service can return
//! `OperationError::Permanent` itself to stop retrying.
//!
//! Readiness failures from `poll_ready` are not retried; they surface as `BackoffError::Terminal`.

use crate::engine::Backoff;
use crate::error::{BackoffError, OperationError};
use futures::future::BoxFuture;
use std::fmt;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_layer::Layer;
use tower_service::Service;

/// Tower-native backoff layer.
pub struct BackoffLayer<E> {
    backoff: Backoff<E>,
    token: CancellationToken,
}

impl<E> BackoffLayer<E> {
    /// Every wrapped call observes `token`; cancelling it aborts pending waits.
    pub fn new(backoff: Backoff<E>, token: CancellationToken) -> Self {
        Self { backoff, token }
    }

    /// Layer whose retries can never be cancelled.
    pub fn uncancellable(backoff: Backoff<E>) -> Self {
        Self::new(backoff, CancellationToken::new())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<E> Clone for BackoffLayer<E> {
    fn clone(&self) -> Self {
        Self { backoff: self.backoff.clone(), token: self.token.clone() }
    }
}

impl<E> fmt::Debug for BackoffLayer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffLayer")
            .field("backoff", &self.backoff)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl<S, E> Layer<S> for BackoffLayer<E> {
    type Service = BackoffService<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        BackoffService { inner: service, layer: self.clone() }
    }
}

/// Backoff service produced by `BackoffLayer`.
pub struct BackoffService<S, E> {
    inner: S,
    layer: BackoffLayer<E>,
}

impl<S: Clone, E> Clone for BackoffService<S, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), layer: self.layer.clone() }
    }
}

impl<S, E> BackoffService<S, E> {
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, E, Request> Service<Request> for BackoffService<S, E>
where
    Request: Clone + Send + 'static,
    S: Service<Request> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<OperationError<E>> + Send + 'static,
    S::Future: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    type Response = S::Response;
    type Error = BackoffError<E>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(|e| {
            let e: OperationError<E> = e.into();
            BackoffError::Terminal(e.into_inner())
        })
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let backoff = self.layer.backoff.clone();
        let token = self.layer.token.clone();
        // Each attempt drives its own clone through readiness, leaving `self.inner` untouched.
        let inner = self.inner.clone();
        Box::pin(async move {
            backoff
                .execute(&token, move |_token| {
                    let svc = inner.clone();
                    let req = req.clone();
                    async move {
                        svc.oneshot(req).await.map_err(|e| -> OperationError<E> { e.into() })
                    }
                })
                .await
        })
    }
}
