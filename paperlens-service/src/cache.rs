//! Bounded in-memory cache for analysis results.
//!
//! Entries are keyed by content fingerprint and expire a fixed time after
//! insertion. When the cache is full, expired entries are purged first and
//! then the least-recently-used entry is evicted.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use tracing::debug;

/// A cached value with its insertion time
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Fixed-capacity TTL + LRU cache, safe to share across request handlers
pub struct ResultCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache holding at most `capacity` entries, each living `ttl`.
    ///
    /// A capacity of zero disables storage entirely.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let bound = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(bound)),
            capacity,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        // Every mutation leaves the cache consistent, so a poisoned lock is still usable
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) > self.ttl
    }

    /// Look up a live entry, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();

        let expired = match entries.peek(key) {
            Some(entry) => self.is_expired(entry, now),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            entries.pop(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        let value = entries.get(key).map(|entry| entry.value.clone());
        self.hits.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Store a value, replacing any existing entry for the key.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key.into(), value, Instant::now());
    }

    pub(crate) fn insert_at(&self, key: String, value: V, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.lock();

        if !entries.contains(&key) && entries.len() >= self.capacity {
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| self.is_expired(entry, now))
                .map(|(stale, _)| stale.clone())
                .collect();
            for stale in &expired {
                entries.pop(stale);
            }
            if !expired.is_empty() {
                debug!(purged = expired.len(), "Purged expired cache entries");
            }
        }

        let entry = CacheEntry {
            value,
            inserted_at: now,
        };
        // push hands back either the replaced entry for this key or the LRU victim
        if let Some((victim, _)) = entries.push(key.clone(), entry) {
            if victim != key {
                debug!(key = %victim, "Evicted least recently used cache entry");
            }
        }
    }

    /// Whether a key is present, without touching recency or counters.
    /// Expired entries still count until they are looked up or purged.
    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    #[test]
    fn test_miss_on_empty() {
        let cache: ResultCache<u32> = ResultCache::new(3, HOUR);
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.stats().misses, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_after_insert() {
        let cache = ResultCache::new(3, HOUR);
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.capacity, 3);
    }

    #[test]
    fn test_overflow_evicts_least_recently_inserted() {
        let cache = ResultCache::new(3, HOUR);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        cache.insert("d", 4);

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = ResultCache::new(3, HOUR);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        // "a" becomes most recently used, so "b" is the victim
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("d", 4);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn test_reinsert_replaces_without_eviction() {
        let cache = ResultCache::new(2, HOUR);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));

        // "a" was refreshed by the reinsert and the get; "b" by its get.
        // "a" is now older than "b", so it goes first.
        cache.insert("c", 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = ResultCache::new(3, HOUR);
        let start = Instant::now();
        cache.insert_at("a".to_string(), 1, start);

        assert_eq!(cache.get_at("a", start + HOUR), Some(1));
        assert_eq!(cache.get_at("a", start + HOUR + Duration::from_millis(1)), None);
        assert!(!cache.contains("a"));
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_reinsert_resets_age() {
        let cache = ResultCache::new(3, HOUR);
        let start = Instant::now();
        cache.insert_at("a".to_string(), 1, start);
        cache.insert_at("a".to_string(), 2, start + HOUR);

        let later = start + HOUR + Duration::from_secs(60);
        assert_eq!(cache.get_at("a", later), Some(2));
    }

    #[test]
    fn test_full_cache_purges_expired_before_evicting_lru() {
        let cache = ResultCache::new(2, HOUR);
        let start = Instant::now();
        cache.insert_at("fresh".to_string(), 1, start + HOUR);
        cache.insert_at("stale".to_string(), 2, start);

        // "fresh" is the LRU entry, but "stale" has expired by now
        let now = start + HOUR + Duration::from_secs(1);
        cache.insert_at("new".to_string(), 3, now);

        assert!(cache.contains("fresh"));
        assert!(!cache.contains("stale"));
        assert!(cache.contains("new"));
    }

    #[test]
    fn test_hit_refreshes_recency_but_not_age() {
        let cache = ResultCache::new(2, HOUR);
        let start = Instant::now();
        cache.insert_at("a".to_string(), 1, start);
        cache.insert_at("b".to_string(), 2, start);

        // A hit moves "a" to the front but its clock keeps running
        assert_eq!(cache.get_at("a", start + HOUR), Some(1));
        cache.insert_at("c".to_string(), 3, start + HOUR);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));

        assert_eq!(cache.get_at("a", start + HOUR + Duration::from_secs(1)), None);
        assert_eq!(cache.get_at("c", start + HOUR + Duration::from_secs(1)), Some(3));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = ResultCache::new(0, HOUR);
        cache.insert("a", 1);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new(3, HOUR);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.clear();
        assert!(cache.is_empty());

        // Refilling after a clear still evicts at capacity
        cache.insert("c", 3);
        cache.insert("d", 4);
        cache.insert("e", 5);
        cache.insert("f", 6);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("c"));
    }
}
