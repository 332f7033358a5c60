//! In-memory order store backend for orderflow.
//!
//! This crate provides an in-memory implementation of the `OrderStore` trait
//! from `orderflow-storage`, using a `DashMap` for concurrent access. It backs
//! the service when `storage.backend = "memory"` and doubles as the store in
//! tests.
//!
//! # Example
//!
//! ```ignore
//! use orderflow_db_memory::MemoryOrderStore;
//! use orderflow_storage::OrderStore;
//!
//! let store = MemoryOrderStore::new();
//! store.upsert_order(&order, &raw).await?;
//! let raw = store.get_order_raw(&order.order_uid).await?;
//! ```

mod storage;

pub use orderflow_storage::{OrderStore, StorageError};
pub use storage::MemoryOrderStore;

/// Creates a new shared in-memory order store.
pub fn create_store() -> orderflow_storage::DynOrderStore {
    std::sync::Arc::new(MemoryOrderStore::new())
}
