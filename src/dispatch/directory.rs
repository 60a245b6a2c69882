//! Instance directory: the current set of backend addresses.
//!
//! The directory publishes full membership snapshots, never diffs; consumers
//! are responsible for diffing against their own last-known state. A watch
//! channel gives the replace-in-place semantics for free: a new snapshot
//! atomically supersedes the old one and subscribers observe the latest
//! value at least once.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

/// The directory's current view of backend membership.
pub type InstanceSet = Arc<BTreeSet<String>>;

/// Maintains the current set of backend instance addresses and pushes
/// update notifications to subscribers.
///
/// Discovery failure is represented as an empty set, not an error.
#[derive(Debug, Clone)]
pub struct Directory {
    tx: Arc<watch::Sender<InstanceSet>>,
}

impl Directory {
    /// Create a directory seeded with `instances`.
    pub fn new(instances: impl IntoIterator<Item = String>) -> Self {
        let set: BTreeSet<String> = instances.into_iter().collect();
        let (tx, _) = watch::channel(Arc::new(set));
        Self { tx: Arc::new(tx) }
    }

    /// A constant-membership directory: the trivial implementation used for
    /// a statically configured instance list. Never updated after creation.
    pub fn fixed(instances: impl IntoIterator<Item = String>) -> Self {
        Self::new(instances)
    }

    /// The current instance set.
    pub fn instances(&self) -> InstanceSet {
        self.tx.borrow().clone()
    }

    /// Subscribe to membership changes. The receiver yields the full new
    /// set on every change.
    pub fn subscribe(&self) -> watch::Receiver<InstanceSet> {
        self.tx.subscribe()
    }

    /// Replace the membership with a new full set.
    pub fn set_instances(&self, instances: impl IntoIterator<Item = String>) {
        let set: BTreeSet<String> = instances.into_iter().collect();
        self.tx.send_replace(Arc::new(set));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_directory_holds_initial_set() {
        let dir = Directory::fixed(vec!["a:1".to_string(), "b:2".to_string()]);
        let set = dir.instances();
        assert_eq!(set.len(), 2);
        assert!(set.contains("a:1"));
        assert!(set.contains("b:2"));
    }

    #[tokio::test]
    async fn subscribers_see_the_full_new_set() {
        let dir = Directory::new(vec!["a:1".to_string()]);
        let mut rx = dir.subscribe();

        dir.set_instances(vec!["b:2".to_string(), "c:3".to_string()]);
        rx.changed().await.unwrap();

        let set = rx.borrow_and_update().clone();
        assert_eq!(set.len(), 2);
        assert!(!set.contains("a:1"));
        assert!(set.contains("b:2"));
        assert!(set.contains("c:3"));
    }

    #[test]
    fn empty_set_is_not_an_error() {
        let dir = Directory::new(Vec::new());
        assert!(dir.instances().is_empty());
    }
}
