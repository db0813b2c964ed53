//! HTTP server wiring the rate limit middleware around a downstream router.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use super::middleware::RateLimitLayer;
use crate::error::Result;
use crate::ratelimit::RateLimitEngine;

/// HTTP server for the rate-limited gateway.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The decision engine shared by every request
    engine: Arc<RateLimitEngine>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, engine: Arc<RateLimitEngine>) -> Self {
        Self { addr, engine }
    }

    /// Start the server, wrapping `app` with the rate limit middleware.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self, app: Router) -> Result<()> {
        let app = app.layer(RateLimitLayer::new(self.engine));

        info!(addr = %self.addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server stops accepting connections when the provided signal
    /// resolves and drains in-flight requests before returning.
    pub async fn serve_with_shutdown<F>(self, app: Router, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = app.layer(RateLimitLayer::new(self.engine));

        info!(addr = %self.addr, "Starting HTTP server with graceful shutdown");

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as RategateResult;
    use crate::ratelimit::{CounterStore, RuleStore};
    use async_trait::async_trait;
    use std::time::Duration;

    struct NullStore;

    #[async_trait]
    impl CounterStore for NullStore {
        async fn incr(&self, _key: &str) -> RategateResult<i64> {
            Ok(1)
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> RategateResult<()> {
            Ok(())
        }

        async fn ttl(&self, _key: &str) -> RategateResult<Duration> {
            Ok(Duration::ZERO)
        }
    }

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let engine = Arc::new(RateLimitEngine::new(
            Arc::new(RuleStore::new()),
            Arc::new(NullStore),
        ));
        let _server = HttpServer::new(addr, engine);
    }
}
