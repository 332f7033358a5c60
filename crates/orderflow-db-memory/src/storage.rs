use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use orderflow_core::Order;
use orderflow_storage::{OrderStore, StorageError, WarmupEntry};

#[derive(Debug, Clone)]
struct StoredOrder {
    raw: Bytes,
    /// Write sequence of the last upsert; larger is more recent.
    updated_seq: u64,
}

/// In-memory order store keyed by `order_uid`.
///
/// Upserts replace the whole entry, so replaying the same order is
/// idempotent. A monotonically increasing write sequence stands in for the
/// `updated_at` column of the relational backend when ordering warmup results.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, StoredOrder>,
    write_seq: AtomicU64,
}

impl MemoryOrderStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns `true` if an order with this identifier is stored.
    pub fn contains(&self, order_uid: &str) -> bool {
        self.orders.contains_key(order_uid)
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn upsert_order(&self, order: &Order, raw: &[u8]) -> Result<(), StorageError> {
        if order.order_uid.is_empty() {
            return Err(StorageError::invalid_order("empty order_uid"));
        }
        let updated_seq = self.write_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders.insert(
            order.order_uid.clone(),
            StoredOrder {
                raw: Bytes::copy_from_slice(raw),
                updated_seq,
            },
        );
        tracing::trace!(order_uid = %order.order_uid, updated_seq, "order upserted");
        Ok(())
    }

    async fn get_order_raw(&self, order_uid: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.orders.get(order_uid).map(|entry| entry.raw.clone()))
    }

    async fn warmup(&self, limit: usize) -> Result<Vec<WarmupEntry>, StorageError> {
        let mut entries: Vec<(u64, WarmupEntry)> = self
            .orders
            .iter()
            .map(|entry| {
                (
                    entry.updated_seq,
                    (entry.key().clone(), entry.value().raw.clone()),
                )
            })
            .collect();
        entries.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        if limit > 0 {
            entries.truncate(limit);
        }
        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_core::sample::{sample_order, sample_payload};

    async fn put(store: &MemoryOrderStore, uid: &str) {
        store
            .upsert_order(&sample_order(uid), &sample_payload(uid))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_and_get_raw() {
        let store = MemoryOrderStore::new();
        put(&store, "ORDER1").await;

        let raw = store.get_order_raw("ORDER1").await.unwrap().unwrap();
        assert_eq!(raw.as_ref(), sample_payload("ORDER1").as_slice());
        assert!(store.get_order_raw("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_replace() {
        let store = MemoryOrderStore::new();
        let order = sample_order("ORDER1");

        store.upsert_order(&order, b"{\"v\":1}").await.unwrap();
        store.upsert_order(&order, b"{\"v\":2}").await.unwrap();
        store.upsert_order(&order, b"{\"v\":2}").await.unwrap();

        assert_eq!(store.len(), 1);
        let raw = store.get_order_raw("ORDER1").await.unwrap().unwrap();
        assert_eq!(raw.as_ref(), b"{\"v\":2}");
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_uid() {
        let store = MemoryOrderStore::new();
        let err = store
            .upsert_order(&Order::default(), b"{}")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidOrder { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_stored_payload_is_a_copy() {
        let store = MemoryOrderStore::new();
        let mut raw = b"{\"a\":1}".to_vec();
        store
            .upsert_order(&sample_order("ORDER1"), &raw)
            .await
            .unwrap();
        raw[5] = b'9';

        let stored = store.get_order_raw("ORDER1").await.unwrap().unwrap();
        assert_eq!(stored.as_ref(), b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_warmup_orders_by_recency_and_limits() {
        let store = MemoryOrderStore::new();
        put(&store, "A").await;
        put(&store, "B").await;
        put(&store, "C").await;
        // Re-upserting A makes it the most recent.
        put(&store, "A").await;

        let all = store.warmup(0).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["A", "C", "B"]);

        let limited = store.warmup(2).await.unwrap();
        let ids: Vec<&str> = limited.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["A", "C"]);
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(MemoryOrderStore::new().backend_name(), "memory");
    }
}
