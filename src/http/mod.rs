//! HTTP adapter: the rate limit middleware and the gateway server.

mod middleware;
mod server;

pub use middleware::{
    RateLimitLayer, RateLimitService, X_RATELIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RETRY_AFTER,
};
pub use server::HttpServer;
