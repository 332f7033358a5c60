//! Error types for the PostgreSQL storage backend.

use orderflow_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is "undefined table" (42P01).
pub fn is_undefined_table(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNDEFINED_TABLE)
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Connection(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Maps a sqlx error raised inside a write transaction.
pub(crate) fn write_error(context: &str, err: SqlxError) -> StorageError {
    match err {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
            StorageError::connection_error(format!("{context}: {err}"))
        }
        other => StorageError::transaction_error(format!("{context}: {other}")),
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));

        let err = PostgresError::migration("checksum mismatch");
        assert_eq!(err.to_string(), "Migration error: checksum mismatch");
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let storage_err: StorageError = PostgresError::config("test error").into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));

        let storage_err: StorageError = PostgresError::Connection(SqlxError::PoolTimedOut).into();
        assert!(matches!(storage_err, StorageError::ConnectionError { .. }));
    }

    #[test]
    fn test_write_error_classification() {
        let err = write_error("orders upsert", SqlxError::PoolClosed);
        assert!(matches!(err, StorageError::ConnectionError { .. }));

        let err = write_error("orders upsert", SqlxError::RowNotFound);
        assert!(matches!(err, StorageError::TransactionError { .. }));
        assert!(err.to_string().contains("orders upsert"));
    }
}
