use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;

use super::list::{RecencyList, SlabIdx};
use super::{CacheStats, OrderCache};

/// Capacity used when the configured capacity is zero.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug)]
struct Entry {
    key: String,
    value: Bytes,
}

#[derive(Debug)]
struct Inner {
    index: HashMap<String, SlabIdx>,
    recency: RecencyList<Entry>,
    hits: u64,
    misses: u64,
    inserts: u64,
    updates: u64,
    evictions: u64,
}

/// Fixed-capacity LRU cache of raw order payloads.
///
/// The key index and the recency list sit behind one mutex. Every operation,
/// `get` included, takes it for a constant-time critical section, since a hit
/// reorders the list. Values are `Bytes`: `set` copies the caller's buffer
/// once and `get` hands out cheap clones of the stored, immutable payload.
#[derive(Debug)]
pub struct BoundedCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl BoundedCache {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero selects [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            inner: Mutex::new(Inner {
                index: HashMap::with_capacity(capacity),
                recency: RecencyList::with_capacity(capacity),
                hits: 0,
                misses: 0,
                inserts: 0,
                updates: 0,
                evictions: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Looks up `key`, promoting it to most recently used on a hit.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        let Some(&idx) = inner.index.get(key) else {
            inner.misses += 1;
            return None;
        };
        inner.recency.move_to_back(idx);
        inner.hits += 1;
        inner.recency.get(idx).map(|entry| entry.value.clone())
    }

    /// Inserts or replaces `key`.
    ///
    /// Replacing an existing key promotes it and never evicts. Inserting a new
    /// key into a full cache evicts exactly one entry, the least recently used.
    pub fn set(&self, key: &str, value: &[u8]) {
        let value = Bytes::copy_from_slice(value);
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.index.get(key) {
            if let Some(entry) = inner.recency.get_mut(idx) {
                entry.value = value;
            }
            inner.recency.move_to_back(idx);
            inner.updates += 1;
            return;
        }

        let idx = inner.recency.push_back(Entry {
            key: key.to_owned(),
            value,
        });
        inner.index.insert(key.to_owned(), idx);
        inner.inserts += 1;

        if inner.recency.len() > self.capacity
            && let Some(evicted) = inner.recency.pop_front()
        {
            inner.index.remove(&evicted.key);
            inner.evictions += 1;
            tracing::trace!(order_uid = %evicted.key, "cache entry evicted");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().recency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` is cached, without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().index.contains_key(key)
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.inner
            .lock()
            .recency
            .iter()
            .map(|entry| entry.key.clone())
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            len: inner.recency.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            inserts: inner.inserts,
            updates: inner.updates,
            evictions: inner.evictions,
        }
    }
}

impl Default for BoundedCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl OrderCache for BoundedCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        BoundedCache::get(self, key)
    }

    fn set(&self, key: &str, value: &[u8]) {
        BoundedCache::set(self, key, value)
    }

    fn len(&self) -> usize {
        BoundedCache::len(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn get_str(cache: &BoundedCache, key: &str) -> Option<String> {
        cache
            .get(key)
            .map(|v| String::from_utf8_lossy(&v).into_owned())
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        assert_eq!(BoundedCache::new(0).capacity(), DEFAULT_CAPACITY);
        assert_eq!(BoundedCache::new(3).capacity(), 3);
    }

    #[test]
    fn test_get_promotes_entry() {
        let cache = BoundedCache::new(2);
        cache.set("a", b"1");
        cache.set("b", b"2");
        assert_eq!(get_str(&cache, "a").as_deref(), Some("1"));
        cache.set("c", b"3");

        assert!(cache.get("b").is_none());
        assert_eq!(get_str(&cache, "a").as_deref(), Some("1"));
        assert_eq!(get_str(&cache, "c").as_deref(), Some("3"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_update_promotes_without_eviction() {
        let cache = BoundedCache::new(2);
        cache.set("x", b"1");
        cache.set("y", b"2");
        cache.set("x", b"10");

        assert_eq!(cache.len(), 2);
        assert_eq!(get_str(&cache, "x").as_deref(), Some("10"));

        cache.set("z", b"3");
        assert!(cache.get("y").is_none());
        assert!(cache.contains("x"));
        assert!(cache.contains("z"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_capacity_one_keeps_latest() {
        let cache = BoundedCache::new(1);
        cache.set("a", b"1");
        cache.set("b", b"2");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("a").is_none());
        assert_eq!(get_str(&cache, "b").as_deref(), Some("2"));
    }

    #[test]
    fn test_evicts_least_recent_in_order() {
        let cache = BoundedCache::new(3);
        for key in ["a", "b", "c", "d", "e"] {
            cache.set(key, key.as_bytes());
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.keys_by_recency(), ["c", "d", "e"]);

        cache.get("c");
        cache.set("f", b"f");
        assert_eq!(cache.keys_by_recency(), ["e", "c", "f"]);
    }

    #[test]
    fn test_set_copies_caller_buffer() {
        let cache = BoundedCache::new(2);
        let mut buf = b"payload".to_vec();
        cache.set("k", &buf);
        buf[0] = b'X';

        assert_eq!(cache.get("k").unwrap().as_ref(), b"payload");
    }

    #[test]
    fn test_returned_value_survives_replacement() {
        let cache = BoundedCache::new(2);
        cache.set("k", b"old");
        let held = cache.get("k").unwrap();
        cache.set("k", b"new");

        assert_eq!(held.as_ref(), b"old");
        assert_eq!(cache.get("k").unwrap().as_ref(), b"new");
    }

    #[test]
    fn test_stats() {
        let cache = BoundedCache::new(2);
        cache.set("a", b"1");
        cache.set("a", b"2");
        cache.set("b", b"1");
        cache.set("c", b"1");
        cache.get("c");
        cache.get("a");

        let stats = cache.stats();
        assert_eq!(stats.len, 2);
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.inserts, 3);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 50.0);
    }

    #[test]
    fn test_concurrent_access_respects_capacity() {
        let cache = Arc::new(BoundedCache::new(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..1_000 {
                        let key = format!("k{}", (t * 31 + i) % 200);
                        if i % 3 == 0 {
                            cache.get(&key);
                        } else {
                            cache.set(&key, key.as_bytes());
                        }
                        assert!(cache.len() <= 64);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 64);
        let keys = cache.keys_by_recency();
        assert_eq!(keys.len(), cache.len());
        for key in keys {
            assert_eq!(cache.get(&key).unwrap().as_ref(), key.as_bytes());
        }
    }
}
