//! Rate limiting rules, matching and the decision engine.

mod backend;
mod engine;
mod key;
mod matcher;
mod redis;
mod rules;
mod store;

pub use backend::CounterStore;
pub use engine::{Decision, RateLimitEngine};
pub use key::CounterKey;
pub use matcher::{match_rule, RequestAttributes, DOMAIN_ATTRIBUTE};
pub use self::redis::RedisCounterStore;
pub use rules::{rules_from_file, rules_from_yaml, Descriptor, Rule, RateLimit, TimeUnit};
pub use store::{spawn_reload, RuleStore};
