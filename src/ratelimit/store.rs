//! Rule store: the process-wide active rule set.
//!
//! Many concurrent readers, one writer (the reload task). The set is held
//! behind an `Arc` that is swapped whole on install, so a snapshot is either
//! the old set or the new set, never a mix, and stays stable for as long as
//! the reader holds it.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::rules::{rules_from_file, Rule};
use crate::error::Result;

/// Holds the active rule set and supports atomic replacement.
pub struct RuleStore {
    rules: RwLock<Arc<Vec<Rule>>>,
}

impl RuleStore {
    /// Create an empty rule store.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Get the current rule set.
    ///
    /// The returned set is immutable and unaffected by later installs.
    pub fn snapshot(&self) -> Arc<Vec<Rule>> {
        self.rules.read().clone()
    }

    /// Replace the active rule set whole.
    pub fn install(&self, rules: Vec<Rule>) {
        *self.rules.write() = Arc::new(rules);
    }

    /// Load a rule document from a file and install it.
    ///
    /// On any parse, validation or I/O error the active set is left
    /// untouched and the error is returned to the caller.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let rules = rules_from_file(path)?;
        let count = rules.len();
        self.install(rules);
        Ok(count)
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a task that reloads the rule document on a steady cadence.
///
/// Individual reload failures are logged and the previous rule set is
/// retained; the cadence continues regardless.
pub fn spawn_reload(store: Arc<RuleStore>, path: PathBuf, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; the initial load already
        // happened at startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.load_from_file(&path) {
                Ok(count) => {
                    info!(path = %path.display(), rule_count = count, "Reloaded rules");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to reload rules, keeping previous set");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::rules::rules_from_yaml;

    const ONE_RULE: &str = r#"
- domain: auth
  based_on: user_id
  descriptors:
    - key: endpoint
      value: login
  rate_limit:
    unit: minute
    multiplier: 1
    requests_per_unit: 3
"#;

    const TWO_RULES: &str = r#"
- domain: auth
  based_on: user_id
  descriptors:
    - key: endpoint
      value: login
  rate_limit:
    unit: minute
    multiplier: 1
    requests_per_unit: 5
- domain: search
  based_on: api_key
  descriptors:
    - key: tier
      value: free
"#;

    fn temp_rules_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rategate-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_empty_store_snapshot() {
        let store = RuleStore::new();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_install_replaces_whole_set() {
        let store = RuleStore::new();
        store.install(rules_from_yaml(ONE_RULE).unwrap());
        assert_eq!(store.snapshot().len(), 1);

        store.install(rules_from_yaml(TWO_RULES).unwrap());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].rate_limit.as_ref().unwrap().requests_per_unit, 5);
    }

    #[test]
    fn test_snapshot_stable_across_install() {
        let store = RuleStore::new();
        store.install(rules_from_yaml(ONE_RULE).unwrap());

        let before = store.snapshot();
        store.install(rules_from_yaml(TWO_RULES).unwrap());

        // The earlier snapshot still sees the old set.
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].rate_limit.as_ref().unwrap().requests_per_unit, 3);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_failed_load_keeps_previous_set() {
        let store = RuleStore::new();
        store.install(rules_from_yaml(ONE_RULE).unwrap());

        let path = temp_rules_file("invalid.yaml", "- domain: \"\"\n  based_on: x\n  descriptors: []\n");
        assert!(store.load_from_file(&path).is_err());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].domain, "auth");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let store = RuleStore::new();
        let err = store
            .load_from_file("/nonexistent/rategate-rules.yaml")
            .unwrap_err();
        assert!(matches!(err, crate::error::RategateError::Io(_)));
    }

    #[tokio::test]
    async fn test_periodic_reload_picks_up_changes() {
        let store = Arc::new(RuleStore::new());
        let path = temp_rules_file("reload.yaml", ONE_RULE);
        store.load_from_file(&path).unwrap();

        let handle = spawn_reload(store.clone(), path.clone(), Duration::from_millis(20));

        std::fs::write(&path, TWO_RULES).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.snapshot().len(), 2);

        // A broken document on disk must not disturb the active set.
        std::fs::write(&path, "- domain: \"\"\n  based_on: x\n  descriptors: []\n").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.snapshot().len(), 2);

        handle.abort();
        std::fs::remove_file(path).ok();
    }
}
