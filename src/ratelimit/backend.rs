//! Counter store trait for abstracting the external atomic-counter store.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Trait over the three counter-store primitives the engine uses.
///
/// This abstracts the Redis-backed store so the decision engine and the
/// middleware tests can substitute a fake. Implementations surface any
/// transport, timeout or type-mismatch condition as `RategateError::Store`.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the integer at `key`, creating it at 1 if
    /// absent. Returns the post-increment value.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Set an absolute lifetime on `key`, counted from the moment of call.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Remaining lifetime of `key`. Used only for retry-after reporting.
    async fn ttl(&self, key: &str) -> Result<Duration>;
}
