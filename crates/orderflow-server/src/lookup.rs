//! Read path: cache first, then the durable store.

use std::sync::Arc;

use bytes::Bytes;
use orderflow_storage::DynOrderStore;
use tracing::warn;

use crate::cache::OrderCache;
use crate::metrics;

/// Result of an order lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// Served from the cache; the store was not queried.
    Hit(Bytes),
    /// Read from the store and written to the cache.
    Miss(Bytes),
    NotFound,
}

impl LookupResult {
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::Hit(raw) | Self::Miss(raw) => Some(raw),
            Self::NotFound => None,
        }
    }

    /// Value of the `X-Cache` response header.
    pub fn cache_status(&self) -> Option<&'static str> {
        match self {
            Self::Hit(_) => Some("HIT"),
            Self::Miss(_) => Some("MISS"),
            Self::NotFound => None,
        }
    }
}

#[derive(Clone)]
pub struct LookupService {
    cache: Arc<dyn OrderCache>,
    store: DynOrderStore,
}

impl LookupService {
    pub fn new(cache: Arc<dyn OrderCache>, store: DynOrderStore) -> Self {
        Self { cache, store }
    }

    /// Looks up an order's raw payload.
    ///
    /// Store errors are logged and reported as `NotFound`.
    pub async fn get_order(&self, order_uid: &str) -> LookupResult {
        if let Some(raw) = self.cache.get(order_uid) {
            metrics::record_cache_hit();
            return LookupResult::Hit(raw);
        }
        metrics::record_cache_miss();

        match self.store.get_order_raw(order_uid).await {
            Ok(Some(raw)) => {
                self.cache.set(order_uid, &raw);
                metrics::set_cache_entries(self.cache.len());
                LookupResult::Miss(raw)
            }
            Ok(None) => LookupResult::NotFound,
            Err(e) => {
                warn!(
                    order_uid,
                    category = %e.category(),
                    error = %e,
                    "order lookup failed"
                );
                LookupResult::NotFound
            }
        }
    }
}
