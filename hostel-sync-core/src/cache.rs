//! In-memory cache for read-mostly reference data.
//!
//! Entries expire a fixed time after insertion. Thread-safe via an internal
//! RwLock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value if it has not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().unwrap().insert(key, entry);
    }

    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.entries
            .write()
            .unwrap()
            .remove(key)
            .map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap();
        let now = Instant::now();

        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("stu-1", "Asha".to_string());

        assert_eq!(cache.get(&"stu-1"), Some("Asha".to_string()));
        assert_eq!(cache.get(&"stu-2"), None);
    }

    #[test]
    fn test_expired_entry_is_not_returned() {
        let cache = TtlCache::new(Duration::from_secs(0));
        cache.insert(1, "gone");

        thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cleanup_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.invalidate(&"a"), Some(1));
        assert_eq!(cache.get(&"a"), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
