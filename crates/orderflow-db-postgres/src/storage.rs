//! PostgreSQL implementation of the `OrderStore` trait.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use orderflow_core::Order;
use orderflow_storage::{OrderStore, StorageError, WarmupEntry};

use crate::config::PostgresConfig;
use crate::error::write_error;
use crate::{migrations, pool, queries};

/// PostgreSQL order store.
///
/// Each upsert writes the order row (including the raw payload), its
/// delivery and payment rows, and replaces its items in one transaction.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new `PostgresOrderStore` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a store from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip(self, order, raw), fields(order_uid = %order.order_uid))]
    async fn upsert_order(&self, order: &Order, raw: &[u8]) -> Result<(), StorageError> {
        if order.order_uid.is_empty() {
            return Err(StorageError::invalid_order("empty order_uid"));
        }
        let payload: Value = serde_json::from_slice(raw)
            .map_err(|e| StorageError::invalid_order(format!("raw payload is not JSON: {e}")))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| write_error("begin transaction", e))?;

        // Dropping `tx` on an early return rolls the transaction back.
        queries::upsert_order_row(&mut tx, order, &payload).await?;
        queries::upsert_delivery(&mut tx, order).await?;
        queries::upsert_payment(&mut tx, order).await?;
        queries::replace_items(&mut tx, order).await?;

        tx.commit().await.map_err(|e| write_error("commit", e))?;

        debug!(items = order.items.len(), "order upserted");
        Ok(())
    }

    async fn get_order_raw(&self, order_uid: &str) -> Result<Option<Bytes>, StorageError> {
        let raw: Option<String> = query_scalar(queries::SELECT_RAW)
            .bind(order_uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::connection_error(format!("order read failed: {e}")))?;
        Ok(raw.map(Bytes::from))
    }

    async fn warmup(&self, limit: usize) -> Result<Vec<WarmupEntry>, StorageError> {
        let limit = if limit == 0 {
            None
        } else {
            Some(i64::try_from(limit).unwrap_or(i64::MAX))
        };
        let rows: Vec<(String, String)> = query_as(queries::SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::connection_error(format!("warmup query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(order_uid, raw)| (order_uid, Bytes::from(raw)))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
