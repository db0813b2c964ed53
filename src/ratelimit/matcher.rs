//! Request-to-rule matching.

use axum::http::HeaderMap;
use std::collections::HashMap;

use super::rules::Rule;

/// The attribute named `domain` selects a rule's domain axis.
pub const DOMAIN_ATTRIBUTE: &str = "domain";

/// A request's header-like attributes, one value per attribute.
///
/// Attribute names are stored lower-cased so lookups are case-insensitive;
/// values keep their original case. When a request carries an attribute more
/// than once, the first value wins.
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes {
    attributes: HashMap<String, String>,
}

impl RequestAttributes {
    /// Build from an HTTP header map. Header names arrive lower-cased;
    /// values that are not valid UTF-8 are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut attributes = HashMap::with_capacity(headers.keys_len());
        for name in headers.keys() {
            if let Some(value) = headers.get(name) {
                if let Ok(value) = value.to_str() {
                    attributes.insert(name.as_str().to_string(), value.to_string());
                }
            }
        }
        Self { attributes }
    }

    /// Build from raw (name, value) pairs, lower-casing the names.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut attributes = HashMap::new();
        for (key, value) in pairs {
            attributes
                .entry(key.as_ref().to_ascii_lowercase())
                .or_insert_with(|| value.into());
        }
        Self { attributes }
    }

    /// Case-insensitive attribute lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The request's domain, or the empty string when absent.
    pub fn domain(&self) -> &str {
        self.get(DOMAIN_ATTRIBUTE).unwrap_or("")
    }
}

/// Find the first rule that applies to the request.
///
/// A rule matches iff its domain equals the request's domain and the request
/// carries every descriptor: key present (case-insensitive), value exactly
/// equal. Any missing or mismatching descriptor disqualifies the rule; scan
/// order breaks ties.
pub fn match_rule<'a>(rules: &'a [Rule], attrs: &RequestAttributes) -> Option<&'a Rule> {
    let domain = attrs.domain();

    rules.iter().find(|rule| {
        rule.domain == domain
            && rule
                .descriptors
                .iter()
                .all(|d| attrs.get(&d.key) == Some(d.value.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::rules::rules_from_yaml;
    use axum::http::HeaderValue;

    fn test_rules() -> Vec<Rule> {
        rules_from_yaml(
            r#"
- domain: auth
  based_on: user_id
  descriptors:
    - key: endpoint
      value: login
  rate_limit:
    unit: minute
    multiplier: 1
    requests_per_unit: 3
- domain: auth
  based_on: user_id
  descriptors:
    - key: endpoint
      value: login
    - key: tier
      value: free
  rate_limit:
    unit: minute
    multiplier: 1
    requests_per_unit: 1
- domain: audit
  based_on: api_key
  descriptors:
    - key: endpoint
      value: export
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let rules = test_rules();
        // Both auth rules match this request; authoring order decides.
        let attrs = RequestAttributes::from_pairs([
            ("domain", "auth"),
            ("endpoint", "login"),
            ("tier", "free"),
        ]);

        let rule = match_rule(&rules, &attrs).unwrap();
        assert_eq!(rule.rate_limit.as_ref().unwrap().requests_per_unit, 3);
    }

    #[test]
    fn test_all_descriptors_required() {
        let rules = test_rules();
        let attrs = RequestAttributes::from_pairs([("domain", "audit"), ("source", "billing")]);
        assert!(match_rule(&rules, &attrs).is_none());
    }

    #[test]
    fn test_domain_must_match() {
        let rules = test_rules();
        let attrs = RequestAttributes::from_pairs([("domain", "other"), ("endpoint", "login")]);
        assert!(match_rule(&rules, &attrs).is_none());
    }

    #[test]
    fn test_missing_domain_matches_nothing() {
        let rules = test_rules();
        let attrs = RequestAttributes::from_pairs([("endpoint", "login")]);
        assert!(match_rule(&rules, &attrs).is_none());
    }

    #[test]
    fn test_descriptor_keys_case_insensitive() {
        let rules = rules_from_yaml(
            r#"
- domain: auth
  based_on: user_id
  descriptors:
    - key: EndPoint
      value: login
"#,
        )
        .unwrap();

        let attrs = RequestAttributes::from_pairs([("Domain", "auth"), ("ENDPOINT", "login")]);
        assert!(match_rule(&rules, &attrs).is_some());
    }

    #[test]
    fn test_descriptor_values_case_sensitive() {
        let rules = test_rules();
        let attrs = RequestAttributes::from_pairs([("domain", "auth"), ("endpoint", "Login")]);
        assert!(match_rule(&rules, &attrs).is_none());
    }

    #[test]
    fn test_attributes_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("Domain", HeaderValue::from_static("auth"));
        headers.insert("EndPoint", HeaderValue::from_static("login"));
        headers.insert("user_id", HeaderValue::from_static("Alice"));

        let attrs = RequestAttributes::from_headers(&headers);
        assert_eq!(attrs.domain(), "auth");
        assert_eq!(attrs.get("endpoint"), Some("login"));
        // Values keep their case.
        assert_eq!(attrs.get("USER_ID"), Some("Alice"));
    }

    #[test]
    fn test_first_header_value_wins() {
        let mut headers = HeaderMap::new();
        headers.append("user_id", HeaderValue::from_static("alice"));
        headers.append("user_id", HeaderValue::from_static("bob"));

        let attrs = RequestAttributes::from_headers(&headers);
        assert_eq!(attrs.get("user_id"), Some("alice"));
    }
}
