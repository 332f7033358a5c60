//! # orderflow-storage
//!
//! Storage abstraction layer for the orderflow service.
//!
//! This crate defines the trait that durable order stores implement. It does
//! not contain any implementations - those are provided by
//! `orderflow-db-memory` and `orderflow-db-postgres`.
//!
//! ## Example
//!
//! ```ignore
//! use orderflow_storage::{OrderStore, StorageError};
//!
//! async fn load(store: &dyn OrderStore, id: &str) -> Result<bytes::Bytes, StorageError> {
//!     store
//!         .get_order_raw(id)
//!         .await?
//!         .ok_or_else(|| StorageError::not_found(id))
//! }
//! ```

mod error;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use traits::{OrderStore, WarmupEntry};

/// Type alias for a shared store trait object.
pub type DynOrderStore = std::sync::Arc<dyn OrderStore>;
