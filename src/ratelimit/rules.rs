//! Rate limit rules: model, parsing and validation.
//!
//! Rules are authored as a YAML sequence. Each rule names a domain, the
//! request attribute that partitions counters per identity (`based_on`),
//! the descriptors a request must carry to match, and an optional rate
//! limit. A rule without a rate limit matches but imposes no budget.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{RategateError, Result};

/// A single rate limiting rule.
///
/// Rules are evaluated in authoring order; the first rule whose domain and
/// descriptors all match the request wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// The domain this rule belongs to
    pub domain: String,
    /// Name of the request attribute whose value partitions counters
    pub based_on: String,
    /// Descriptors a request must carry for this rule to apply
    pub descriptors: Vec<Descriptor>,
    /// Budget to enforce; `None` means "match but don't limit"
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
}

/// A (key, value) pair a rule demands be present in the request attributes.
///
/// Keys are compared case-insensitively, values case-sensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    /// The attribute name to match
    pub key: String,
    /// The exact attribute value to match
    pub value: String,
}

/// A rate limit specifying the budget and its time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimit {
    /// The time unit
    pub unit: TimeUnit,
    /// How many units make up one window
    pub multiplier: u32,
    /// Number of requests allowed per window
    pub requests_per_unit: u64,
}

/// Time unit for rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of one unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

impl RateLimit {
    /// The effective window: `multiplier × unit`.
    pub fn window(&self) -> Duration {
        self.unit.duration() * self.multiplier
    }
}

/// Parse a rule document from a YAML string and validate it.
///
/// Authoring order is preserved; rules are neither sorted nor deduplicated.
/// Unknown fields in the document are ignored.
pub fn rules_from_yaml(yaml: &str) -> Result<Vec<Rule>> {
    let rules: Vec<Rule> = serde_yaml::from_str(yaml)
        .map_err(|e| RategateError::Validation(format!("failed to parse rules document: {}", e)))?;

    validate_rules(&rules)?;
    Ok(rules)
}

/// Read, parse and validate a rule document from a file.
pub fn rules_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Rule>> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading rate limit rules");

    let contents = std::fs::read_to_string(path)?;
    rules_from_yaml(&contents)
}

/// Check the shape constraints every rule must satisfy.
fn validate_rules(rules: &[Rule]) -> Result<()> {
    for rule in rules {
        if rule.domain.is_empty() {
            return Err(RategateError::Validation(
                "domain is required for rate limiting rule".to_string(),
            ));
        }

        if rule.based_on.is_empty() {
            return Err(RategateError::Validation(format!(
                "based_on is required for rule in domain {}",
                rule.domain
            )));
        }

        if rule.descriptors.is_empty() {
            return Err(RategateError::Validation(format!(
                "at least one descriptor is required for rule in domain {}",
                rule.domain
            )));
        }

        for descriptor in &rule.descriptors {
            if descriptor.key.is_empty() || descriptor.value.is_empty() {
                return Err(RategateError::Validation(format!(
                    "key and value are required for descriptor in domain {}",
                    rule.domain
                )));
            }
        }

        if let Some(ref limit) = rule.rate_limit {
            if limit.multiplier == 0 {
                return Err(RategateError::Validation(format!(
                    "multiplier must be greater than 0 in rate limit for domain {}",
                    rule.domain
                )));
            }
            if limit.requests_per_unit == 0 {
                return Err(RategateError::Validation(format!(
                    "requests_per_unit must be greater than 0 in rate limit for domain {}",
                    rule.domain
                )));
            }
        }
    }

    Ok(())
}
