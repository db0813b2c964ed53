//! Rate limiting middleware.
//!
//! A tower layer that runs every request through the decision engine before
//! it reaches the downstream handler. Allowed requests are forwarded and
//! their responses annotated with the rate limit headers; over-budget
//! requests are answered 429 on the spot; requests no rule limits pass
//! through untouched. The request itself is never mutated.

use axum::body::Body;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::error;

use crate::ratelimit::{Decision, RateLimitEngine, RequestAttributes};

/// The rule's requests-per-window ceiling.
pub const X_RATELIMIT: &str = "x-ratelimit";
/// Budget left in the current window.
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Seconds until the window expires; 0 unless the request was limited.
pub const X_RATELIMIT_RETRY_AFTER: &str = "x-ratelimit-retry-after";

/// Layer that wraps a downstream service with rate limiting.
#[derive(Clone)]
pub struct RateLimitLayer {
    engine: Arc<RateLimitEngine>,
}

impl RateLimitLayer {
    pub fn new(engine: Arc<RateLimitEngine>) -> Self {
        Self { engine }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            engine: self.engine.clone(),
        }
    }
}

/// Middleware service produced by [`RateLimitLayer`].
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    engine: Arc<RateLimitEngine>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let engine = self.engine.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let attrs = RequestAttributes::from_headers(req.headers());

            match engine.decide(&attrs).await {
                Ok(Decision::Allowed { limit, remaining }) => {
                    let mut response = inner.call(req).await?;
                    annotate(response.headers_mut(), limit, remaining, 0);
                    Ok(response)
                }
                Ok(Decision::Limited {
                    limit,
                    retry_after_secs,
                }) => Ok(limited_response(limit, retry_after_secs)),
                Ok(Decision::Unmatched) | Ok(Decision::MatchedNoLimit) => inner.call(req).await,
                Err(e) => {
                    // Fail closed: no counter, no forwarding.
                    error!(error = %e, "Rate limit check failed");
                    Ok((StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response())
                }
            }
        })
    }
}

/// Write the three rate limit headers as decimal integers.
fn annotate(headers: &mut HeaderMap, limit: u64, remaining: u64, retry_after_secs: u64) {
    headers.insert(HeaderName::from_static(X_RATELIMIT), HeaderValue::from(limit));
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_REMAINING),
        HeaderValue::from(remaining),
    );
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_RETRY_AFTER),
        HeaderValue::from(retry_after_secs),
    );
}

fn limited_response(limit: u64, retry_after_secs: u64) -> Response {
    let mut headers = HeaderMap::new();
    annotate(&mut headers, limit, 0, retry_after_secs);
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));

    (StatusCode::TOO_MANY_REQUESTS, headers, "Too Many Requests").into_response()
}
