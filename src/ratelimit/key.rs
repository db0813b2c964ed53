//! Counter key derivation.

use super::rules::Rule;

/// The string addressing one counter in the external store.
///
/// Derived from the matched rule's domain, its descriptor VALUES in
/// authoring order, and the request's identity value:
/// `domain#v1#…#vn#identity`. The identity is the request attribute named
/// by the rule's `based_on`; absent attributes collapse into the
/// empty-identity bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey(String);

impl CounterKey {
    /// Derive the key for a rule and identity.
    pub fn new(rule: &Rule, identity: &str) -> Self {
        let values: Vec<&str> = rule.descriptors.iter().map(|d| d.value.as_str()).collect();
        Self(format!("{}#{}#{}", rule.domain, values.join("#"), identity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
