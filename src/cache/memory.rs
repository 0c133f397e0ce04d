//! Memory Tier Module
//!
//! Bounded in-process store with absolute TTL expiration and least recently
//! used eviction by `last_access_at`.

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::cache::{Entry, EntryInfo, MemoryStats};

// == Memory Cache ==
/// Thread-safe, fixed-capacity memory tier.
///
/// All operations run under a single mutex. Eviction is a method on the
/// locked state, so `set` evicts without re-acquiring the lock.
#[derive(Debug)]
pub struct MemoryCache {
    inner: Mutex<MemoryState>,
    default_ttl: u64,
}

#[derive(Debug)]
struct MemoryState {
    /// Insertion-ordered entries; iteration order breaks eviction ties
    entries: IndexMap<String, Entry>,
    stats: MemoryStats,
    capacity: usize,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a new MemoryCache.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries (at least 1)
    /// * `default_ttl` - TTL in seconds used when `set` gets none
    pub fn new(capacity: usize, default_ttl: u64) -> Self {
        let capacity = capacity.max(1);
        debug!(capacity, default_ttl, "memory cache initialized");
        Self {
            inner: Mutex::new(MemoryState {
                entries: IndexMap::with_capacity(capacity),
                stats: MemoryStats::new(capacity),
                capacity,
            }),
            default_ttl,
        }
    }

    /// Default TTL in seconds for this tier.
    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed and reported as misses.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.inner.lock();
        let now = Utc::now();

        let expired = match state.entries.get(key).map(|entry| entry.is_expired_at(now)) {
            None => {
                state.stats.record_miss();
                return None;
            }
            Some(expired) => expired,
        };

        if expired {
            state.entries.shift_remove(key);
            state.stats.record_expirations(1);
            state.stats.record_miss();
            debug!(key, "memory entry expired");
            return None;
        }

        state.stats.record_hit();
        state
            .entries
            .get_mut(key)
            .map(|entry| entry.access_at(now).clone())
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for `key`.
    ///
    /// If the tier is full after removing the old entry, the least recently
    /// accessed entry is evicted first.
    pub fn set(&self, key: &str, value: Value, ttl: Option<u64>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut state = self.inner.lock();

        state.entries.shift_remove(key);
        if state.entries.len() >= state.capacity {
            state.evict_lru();
        }

        state
            .entries
            .insert(key.to_string(), Entry::new(key, value, ttl));
        debug!(key, ttl, "memory cache set");
    }

    // == Delete ==
    /// Removes an entry. Returns whether one was present.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.inner.lock().entries.shift_remove(key).is_some();
        if removed {
            debug!(key, "memory cache deleted");
        }
        removed
    }

    // == Clear ==
    /// Removes every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        let count = state.entries.len();
        state.entries.clear();
        debug!(count, "memory cache cleared");
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.inner.lock();
        let now = Utc::now();
        let before = state.entries.len();

        state.entries.retain(|_, entry| !entry.is_expired_at(now));

        let removed = before - state.entries.len();
        state.stats.record_expirations(removed);
        if removed > 0 {
            debug!(removed, "memory cleanup removed expired entries");
        }
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the tier's statistics.
    pub fn stats(&self) -> MemoryStats {
        let state = self.inner.lock();
        let mut stats = state.stats.clone();
        stats.size = state.entries.len();
        stats
    }

    /// Metadata for every entry, in insertion order.
    pub fn entries(&self) -> Vec<EntryInfo> {
        self.inner.lock().entries.values().map(Entry::info).collect()
    }

    /// Number of unexpired keys starting with `prefix`.
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        let now = Utc::now();
        self.inner
            .lock()
            .entries
            .values()
            .filter(|entry| entry.key.starts_with(prefix) && !entry.is_expired_at(now))
            .count()
    }

    /// Returns a copy of the stored entry without recording an access.
    pub fn peek(&self, key: &str) -> Option<Entry> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl MemoryState {
    /// Evicts the entry with the smallest `last_access_at`.
    ///
    /// Ties go to the entry encountered first in insertion order.
    fn evict_lru(&mut self) {
        let mut victim: Option<(usize, chrono::DateTime<Utc>)> = None;
        for (index, entry) in self.entries.values().enumerate() {
            match victim {
                Some((_, oldest)) if entry.last_access_at >= oldest => {}
                _ => victim = Some((index, entry.last_access_at)),
            }
        }

        if let Some((index, _)) = victim {
            if let Some((key, _)) = self.entries.shift_remove_index(index) {
                self.stats.record_eviction();
                debug!(key = %key, "memory cache evicted LRU entry");
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_memory_new() {
        let cache = MemoryCache::new(100, 300);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().capacity, 100);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = MemoryCache::new(0, 300);
        cache.set("a", json!(1), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_and_get() {
        let cache = MemoryCache::new(100, 300);
        cache.set("key1", json!({"model": "a"}), None);

        assert_eq!(cache.get("key1"), Some(json!({"model": "a"})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_records_access() {
        let cache = MemoryCache::new(100, 300);
        cache.set("key1", json!(1), None);
        cache.get("key1");
        cache.get("key1");

        let entry = cache.peek("key1").unwrap();
        assert_eq!(entry.access_count, 2);
        assert!(entry.last_access_at >= entry.created_at);
    }

    #[test]
    fn test_get_nonexistent() {
        let cache = MemoryCache::new(100, 300);
        assert_eq!(cache.get("nope"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_default_ttl_applied() {
        let cache = MemoryCache::new(100, 42);
        cache.set("k", json!(1), None);
        assert_eq!(cache.peek("k").unwrap().ttl_seconds, 42);
    }

    #[test]
    fn test_delete() {
        let cache = MemoryCache::new(100, 300);
        cache.set("key1", json!(1), None);

        assert!(cache.delete("key1"));
        assert!(!cache.delete("key1"));
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_overwrite() {
        let cache = MemoryCache::new(100, 300);
        cache.set("key1", json!("v1"), None);
        cache.set("key1", json!("v2"), None);

        assert_eq!(cache.get("key1"), Some(json!("v2")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = MemoryCache::new(2, 300);
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        cache.set("a", json!(3), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_clear() {
        let cache = MemoryCache::new(100, 300);
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        cache.clear();

        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_two_evicts_first_inserted() {
        let cache = MemoryCache::new(2, 300);
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        cache.set("c", json!(3), None);

        assert!(cache.peek("a").is_none());
        assert!(cache.peek("b").is_some());
        assert!(cache.peek("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_lru_uses_last_access_not_insertion() {
        let cache = MemoryCache::new(3, 300);
        cache.set("key1", json!(1), None);
        sleep(Duration::from_millis(5));
        cache.set("key2", json!(2), None);
        sleep(Duration::from_millis(5));
        cache.set("key3", json!(3), None);
        sleep(Duration::from_millis(5));

        // Reading key1 makes key2 the least recently accessed
        cache.get("key1");
        cache.set("key4", json!(4), None);

        assert!(cache.peek("key1").is_some());
        assert!(cache.peek("key2").is_none());
    }

    #[test]
    fn test_ttl_expiration_on_get() {
        let cache = MemoryCache::new(100, 300);
        cache.set("x", json!(1), Some(1));
        assert!(cache.get("x").is_some());

        sleep(Duration::from_millis(2100));

        assert_eq!(cache.get("x"), None);
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
    }

    /// Inserts entries that all share one timestamp, bypassing `set`.
    fn insert_tied(cache: &MemoryCache, keys: &[&str], stamp: chrono::DateTime<Utc>) {
        let mut state = cache.inner.lock();
        for key in keys {
            state
                .entries
                .insert(key.to_string(), Entry::new_at(*key, json!(key), 0, stamp));
        }
    }

    #[test]
    fn test_eviction_tie_goes_to_first_inserted() {
        let cache = MemoryCache::new(3, 300);
        insert_tied(&cache, &["a", "b", "c"], Utc::now());

        cache.set("d", json!("d"), None);

        assert!(cache.peek("a").is_none());
        assert!(cache.peek("b").is_some());
        assert!(cache.peek("c").is_some());
        assert!(cache.peek("d").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_moves_key_to_back_of_tie_order() {
        let cache = MemoryCache::new(3, 300);
        let stamp = Utc::now();
        insert_tied(&cache, &["a", "b", "c"], stamp);

        // Overwriting at capacity never evicts
        cache.set("a", json!("a2"), Some(0));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 0);

        {
            let mut state = cache.inner.lock();
            let order: Vec<&str> = state.entries.keys().map(String::as_str).collect();
            assert_eq!(order, ["b", "c", "a"]);
            // Re-tie the overwritten entry with the others
            if let Some(entry) = state.entries.get_mut("a") {
                *entry = Entry::new_at("a", json!("a2"), 0, stamp);
            }
        }

        cache.set("d", json!("d"), None);

        assert!(cache.peek("b").is_none());
        assert_eq!(cache.peek("a").map(|entry| entry.value), Some(json!("a2")));
    }

    #[test]
    fn test_cleanup_expired() {
        let cache = MemoryCache::new(100, 300);
        cache.set("short", json!(1), Some(1));
        cache.set("long", json!(2), Some(60));
        cache.set("forever", json!(3), Some(0));

        sleep(Duration::from_millis(1100));

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("long").is_some());
        assert!(cache.get("forever").is_some());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_count_with_prefix() {
        let cache = MemoryCache::new(100, 300);
        cache.set("device_info:1", json!(1), None);
        cache.set("device_scan:2", json!(2), None);
        cache.set("other", json!(3), None);

        assert_eq!(cache.count_with_prefix("device_"), 2);
    }

    #[test]
    fn test_entries_listing() {
        let cache = MemoryCache::new(100, 300);
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), Some(0));

        let keys: Vec<String> = cache.entries().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
