// Watcher registry
//
// A watcher binds one expression to one breakpoint. The registry keeps two
// indexes (by watcher id, by breakpoint id) and mutates both inside a single
// critical section so they can never disagree.

use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Watcher {
    pub id: String,
    pub label: String,
    pub breakpoint_id: i32,
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherStats {
    pub total_watchers: usize,
    pub breakpoints_with_watchers: usize,
}

#[derive(Debug, Default)]
struct Indexes {
    by_id: HashMap<String, Watcher>,
    by_breakpoint: HashMap<i32, Vec<String>>,
}

#[derive(Debug, Default)]
pub struct WatcherRegistry {
    inner: Mutex<Indexes>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watcher; returns its generated id.
    pub fn create(&self, label: &str, breakpoint_id: i32, expression: &str) -> String {
        let watcher = Watcher {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            breakpoint_id,
            expression: expression.to_string(),
        };
        let id = watcher.id.clone();

        let mut inner = self.inner.lock().unwrap();
        inner
            .by_breakpoint
            .entry(breakpoint_id)
            .or_default()
            .push(id.clone());
        inner.by_id.insert(id.clone(), watcher);

        id
    }

    pub fn get(&self, watcher_id: &str) -> Option<Watcher> {
        self.inner.lock().unwrap().by_id.get(watcher_id).cloned()
    }

    /// Watchers attached to one breakpoint, in creation order.
    pub fn for_breakpoint(&self, breakpoint_id: i32) -> Vec<Watcher> {
        let inner = self.inner.lock().unwrap();
        inner
            .by_breakpoint
            .get(&breakpoint_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<Watcher> {
        self.inner.lock().unwrap().by_id.values().cloned().collect()
    }

    /// Remove one watcher. Empty by-breakpoint buckets are dropped so the
    /// secondary index never carries dead keys.
    pub fn delete(&self, watcher_id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(watcher) = inner.by_id.remove(watcher_id) else {
            return false;
        };

        let bucket_emptied = match inner.by_breakpoint.get_mut(&watcher.breakpoint_id) {
            Some(bucket) => {
                bucket.retain(|id| id != watcher_id);
                bucket.is_empty()
            }
            None => false,
        };
        if bucket_emptied {
            inner.by_breakpoint.remove(&watcher.breakpoint_id);
        }

        true
    }

    /// Remove every watcher attached to a breakpoint; returns how many.
    pub fn delete_for_breakpoint(&self, breakpoint_id: i32) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let Some(ids) = inner.by_breakpoint.remove(&breakpoint_id) else {
            return 0;
        };
        for id in &ids {
            inner.by_id.remove(id);
        }
        ids.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.by_id.clear();
        inner.by_breakpoint.clear();
    }

    pub fn stats(&self) -> WatcherStats {
        let inner = self.inner.lock().unwrap();
        WatcherStats {
            total_watchers: inner.by_id.len(),
            breakpoints_with_watchers: inner.by_breakpoint.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// The primary index's keys must equal the union of the secondary
    /// index's buckets after every mutation.
    fn assert_indexes_agree(registry: &WatcherRegistry) {
        let inner = registry.inner.lock().unwrap();
        let primary: HashSet<&String> = inner.by_id.keys().collect();
        let secondary: HashSet<&String> =
            inner.by_breakpoint.values().flatten().collect();
        assert_eq!(primary, secondary);
    }

    #[test]
    fn create_and_lookup() {
        let registry = WatcherRegistry::new();
        let id = registry.create("trace size", 7, "request.size()");

        let watcher = registry.get(&id).unwrap();
        assert_eq!(watcher.label, "trace size");
        assert_eq!(watcher.breakpoint_id, 7);
        assert_eq!(watcher.expression, "request.size()");
        assert_indexes_agree(&registry);
    }

    #[test]
    fn ids_are_unique_across_creations() {
        let registry = WatcherRegistry::new();
        let a = registry.create("a", 1, "x");
        let b = registry.create("b", 1, "x");
        assert_ne!(a, b);
    }

    #[test]
    fn delete_returns_registry_to_prior_state() {
        let registry = WatcherRegistry::new();
        let id = registry.create("w", 3, "x + 1");
        assert!(registry.delete(&id));
        assert!(!registry.delete(&id));
        assert!(registry.get(&id).is_none());
        assert!(registry.for_breakpoint(3).is_empty());
        assert_eq!(registry.stats().total_watchers, 0);
        assert_eq!(registry.stats().breakpoints_with_watchers, 0);
        assert_indexes_agree(&registry);
    }

    #[test]
    fn empty_bucket_is_removed() {
        let registry = WatcherRegistry::new();
        let a = registry.create("a", 5, "x");
        let b = registry.create("b", 5, "y");
        registry.delete(&a);
        assert_eq!(registry.stats().breakpoints_with_watchers, 1);
        registry.delete(&b);
        assert_eq!(registry.stats().breakpoints_with_watchers, 0);
        assert_indexes_agree(&registry);
    }

    #[test]
    fn delete_for_breakpoint_removes_only_that_bucket() {
        let registry = WatcherRegistry::new();
        registry.create("a", 1, "x");
        registry.create("b", 1, "y");
        let kept = registry.create("c", 2, "z");

        assert_eq!(registry.delete_for_breakpoint(1), 2);
        assert_eq!(registry.delete_for_breakpoint(1), 0);
        assert!(registry.get(&kept).is_some());
        assert_eq!(registry.stats().total_watchers, 1);
        assert_indexes_agree(&registry);
    }

    #[test]
    fn for_breakpoint_preserves_creation_order() {
        let registry = WatcherRegistry::new();
        let first = registry.create("first", 9, "a");
        let second = registry.create("second", 9, "b");

        let watchers = registry.for_breakpoint(9);
        assert_eq!(watchers.len(), 2);
        assert_eq!(watchers[0].id, first);
        assert_eq!(watchers[1].id, second);
    }
}
