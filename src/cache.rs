//! Memoization of merge results.
//!
//! [`Merger`](crate::merge::Merger) consults a [`Cache`] before merging and
//! stores every result in it. The cache is cleared whenever new rules are
//! added, since they can change any result.

use dashmap::DashMap;

/// A thread-safe string → string store.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn clear(&self);
}

/// Unbounded in-memory [`Cache`]. Entries are only dropped by [`Cache::clear`].
#[derive(Debug, Default)]
pub struct SimpleCache {
    items: DashMap<String, String>,
}

impl SimpleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Cache for SimpleCache {
    fn get(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.items.insert(key.to_string(), value);
    }

    fn clear(&self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn get_set_clear() {
        let cache = SimpleCache::new();
        assert_eq!(cache.get("p-1 p-2"), None);

        cache.set("p-1 p-2", "p-2".into());
        assert_eq!(cache.get("p-1 p-2"), Some("p-2".into()));
        assert_eq!(cache.len(), 1);

        cache.set("p-1 p-2", "p-1".into());
        assert_eq!(cache.get("p-1 p-2"), Some("p-1".into()));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("p-1 p-2"), None);
    }

    #[test]
    fn shared_across_threads() {
        let cache: Arc<dyn Cache> = Arc::new(SimpleCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.set(&format!("k{i}"), format!("v{i}")))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap_or_else(|_| panic!("worker panicked"));
        }
        for i in 0..8 {
            assert_eq!(cache.get(&format!("k{i}")), Some(format!("v{i}")));
        }
    }
}
