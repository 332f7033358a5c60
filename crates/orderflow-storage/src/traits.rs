//! Storage traits for the order store abstraction layer.

use async_trait::async_trait;
use bytes::Bytes;
use orderflow_core::Order;

use crate::error::StorageError;

/// One order returned by [`OrderStore::warmup`]: identifier and raw payload.
pub type WarmupEntry = (String, Bytes);

/// Durable order store.
///
/// Implementations must be thread-safe (`Send + Sync`): the ingest loop
/// writes while lookup requests read concurrently.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts or replaces an order keyed by `order_uid`.
    ///
    /// `raw` is the serialized payload served back by
    /// [`OrderStore::get_order_raw`]. Applying the same order twice leaves the
    /// same final state as applying it once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidOrder` if `order_uid` is empty or `raw`
    /// cannot be stored, and an infrastructure error if the write fails.
    async fn upsert_order(&self, order: &Order, raw: &[u8]) -> Result<(), StorageError>;

    /// Reads the raw payload of an order.
    ///
    /// Returns `None` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing orders.
    async fn get_order_raw(&self, order_uid: &str) -> Result<Option<Bytes>, StorageError>;

    /// Returns the most recently updated orders, newest first.
    ///
    /// `limit == 0` returns every stored order.
    async fn warmup(&self, limit: usize) -> Result<Vec<WarmupEntry>, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
