//! Short-TTL memoization
//!
//! Bounds call volume to the upstream collaborators. Plain TTL check, no
//! locking or single-flight: concurrent misses may fetch twice, which is
//! acceptable at this request volume.
//!
//! The clock is injected so cooldown/TTL behavior is testable without
//! sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    inserted_at: Instant,
    value: V,
}

/// TTL cache keyed per data source.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// A clone of the cached value, if present and fresh at `now`.
    pub fn get(&self, key: &K, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        (now.duration_since(entry.inserted_at) < self.ttl).then(|| entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                inserted_at: now,
                value,
            },
        );
    }

    /// Drop expired entries. Called opportunistically on writes so the map
    /// does not grow without bound across distinct lat/lon keys.
    pub fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for location-based lookups: lat/lon rounded to 0.1 degree so
/// nearby requests share one upstream fetch.
pub fn grid_key(latitude: f64, longitude: f64) -> (i64, i64) {
    ((latitude * 10.0).round() as i64, ((longitude * 10.0).round()) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_hits() {
        let now = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(120));
        cache.insert((), 42u32, now);
        assert_eq!(cache.get(&(), now + Duration::from_secs(119)), Some(42));
    }

    #[test]
    fn test_expired_entry_misses() {
        let now = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(120));
        cache.insert((), 42u32, now);
        assert_eq!(cache.get(&(), now + Duration::from_secs(120)), None);
    }

    #[test]
    fn test_reinsert_refreshes() {
        let now = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 1u8, now);
        cache.insert("k", 2u8, now + Duration::from_secs(59));
        assert_eq!(cache.get(&"k", now + Duration::from_secs(100)), Some(2));
    }

    #[test]
    fn test_purge_expired() {
        let now = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1, "a", now);
        cache.insert(2, "b", now + Duration::from_secs(8));
        cache.purge_expired(now + Duration::from_secs(12));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&2, now + Duration::from_secs(12)).is_some());
    }

    #[test]
    fn test_grid_key_rounds_to_tenths() {
        assert_eq!(grid_key(64.84, -147.72), (648, -1477));
        assert_eq!(grid_key(64.8449, -147.7201), (648, -1477));
        assert_ne!(grid_key(64.84, -147.72), grid_key(65.0, -147.72));
    }
}
