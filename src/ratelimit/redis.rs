//! Redis-backed counter store.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

use super::backend::CounterStore;
use crate::error::{RategateError, Result};

/// Deadline applied to every round-trip to the store.
const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Counter store backed by a shared Redis connection.
///
/// The connection manager multiplexes the whole process onto one logical
/// client and reconnects on its own; cloning it per call is cheap.
pub struct RedisCounterStore {
    conn: ConnectionManager,
}

impl RedisCounterStore {
    /// Connect to Redis and verify the server answers.
    ///
    /// Fails fast when the server is unreachable so a misconfigured gateway
    /// never starts accepting traffic.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| RategateError::Store(format!("invalid Redis URL: {}", e)))?;

        let mut conn = bounded(ConnectionManager::new(client))
            .await?
            .map_err(|e| RategateError::Store(format!("failed to connect to Redis: {}", e)))?;

        let _: String = bounded(redis::cmd("PING").query_async(&mut conn))
            .await?
            .map_err(|e| RategateError::Store(format!("Redis ping failed: {}", e)))?;

        info!("Connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = bounded(conn.incr(key, 1))
            .await?
            .map_err(|e| RategateError::Store(e.to_string()))?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = bounded(conn.expire(key, ttl.as_secs() as i64))
            .await?
            .map_err(|e| RategateError::Store(e.to_string()))?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Duration> {
        let mut conn = self.conn.clone();
        let secs: i64 = bounded(conn.ttl(key))
            .await?
            .map_err(|e| RategateError::Store(e.to_string()))?;

        // TTL replies -1 (no expiry) or -2 (no key) clamp to zero.
        Ok(Duration::from_secs(secs.max(0) as u64))
    }
}

/// Run a store operation under the shared deadline.
async fn bounded<F, T>(fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    timeout(STORE_TIMEOUT, fut)
        .await
        .map_err(|_| RategateError::Store("counter store call timed out".to_string()))
}
