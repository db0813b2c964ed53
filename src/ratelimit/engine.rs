//! Rate limiting decision engine.
//!
//! Executes the fixed-window counter protocol for a matched rule: atomically
//! increment the rule's counter, install the window expiry on the first hit,
//! and report how much budget remains. The external store's atomic increment
//! linearizes concurrent callers on a key; exactly one of them observes the
//! value 1 and becomes the window's creator.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::backend::CounterStore;
use super::key::CounterKey;
use super::matcher::{match_rule, RequestAttributes};
use super::store::RuleStore;
use crate::error::Result;

/// The engine's verdict for a single request.
///
/// Store failures are not decisions; they travel on the error channel of
/// [`RateLimitEngine::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A limited rule matched and the request is within budget.
    Allowed {
        /// The rule's requests-per-window ceiling
        limit: u64,
        /// Budget left in the current window after this request
        remaining: u64,
    },
    /// A limited rule matched and the budget is exhausted.
    Limited {
        /// The rule's requests-per-window ceiling
        limit: u64,
        /// Whole seconds until the window expires
        retry_after_secs: u64,
    },
    /// No rule applied to the request.
    Unmatched,
    /// A rule matched but carries no rate limit.
    MatchedNoLimit,
}

/// Decides, per request, whether the matched rule's budget allows it.
pub struct RateLimitEngine {
    rules: Arc<RuleStore>,
    store: Arc<dyn CounterStore>,
}

impl RateLimitEngine {
    /// Create an engine over a rule store and a counter store.
    pub fn new(rules: Arc<RuleStore>, store: Arc<dyn CounterStore>) -> Self {
        Self { rules, store }
    }

    /// Run the counter protocol for one request.
    ///
    /// Counter-store failures surface as `Err(RategateError::Store)`; the
    /// caller decides the failure posture. Nothing is retried here.
    pub async fn decide(&self, attrs: &RequestAttributes) -> Result<Decision> {
        let rules = self.rules.snapshot();

        let Some(rule) = match_rule(&rules, attrs) else {
            return Ok(Decision::Unmatched);
        };

        let Some(rate_limit) = &rule.rate_limit else {
            return Ok(Decision::MatchedNoLimit);
        };

        let identity = attrs.get(&rule.based_on).unwrap_or("");
        let key = CounterKey::new(rule, identity);
        let limit = rate_limit.requests_per_unit;

        trace!(key = %key, limit = limit, "Checking rate limit");

        let count = self.store.incr(key.as_str()).await?;

        if count == 1 {
            // This caller created the key, so it owns installing the window
            // expiry. A failure here is logged and the request still passes;
            // the expiry is never re-set within a window, so an established
            // TTL is never shortened.
            let window = rate_limit.window();
            if let Err(e) = self.store.expire(key.as_str(), window).await {
                warn!(key = %key, error = %e, "Failed to set counter expiry");
            }

            return Ok(Decision::Allowed {
                limit,
                remaining: limit - 1,
            });
        }

        if count as u64 > limit {
            let ttl = self.store.ttl(key.as_str()).await?;
            let retry_after_secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);

            debug!(key = %key, count = count, limit = limit, "Rate limit exceeded");

            return Ok(Decision::Limited {
                limit,
                retry_after_secs,
            });
        }

        Ok(Decision::Allowed {
            limit,
            remaining: limit.saturating_sub(count as u64),
        })
    }
}
