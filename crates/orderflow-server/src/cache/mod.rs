//! In-process order cache.
//!
//! ```text
//! GET /order/{id} → BoundedCache → OrderStore
//!                        ↑
//!        ingest pipeline (after a successful upsert)
//! ```
//!
//! One [`BoundedCache`] is shared by the ingest pipeline and the lookup
//! service. It never returns errors: inserting into a full cache evicts the
//! least recently used entry.

mod list;
mod lru;

use bytes::Bytes;

pub use lru::{BoundedCache, DEFAULT_CAPACITY};

/// Cache seam used by the ingest pipeline and the lookup service.
pub trait OrderCache: Send + Sync {
    /// Returns the stored payload and marks the key most recently used.
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Stores a copy of `value` under `key`.
    fn set(&self, key: &str, value: &[u8]);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// `set` calls that added a new key.
    pub inserts: u64,
    /// `set` calls that replaced an existing key.
    pub updates: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
