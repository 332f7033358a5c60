//! Storage error types for the order store abstraction layer.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested order was not found.
    #[error("Order not found: {order_uid}")]
    NotFound {
        /// The identifier that was not found.
        order_uid: String,
    },

    /// The order cannot be stored as given.
    #[error("Invalid order: {message}")]
    InvalidOrder {
        /// Description of why the order is invalid.
        message: String,
    },

    /// An error occurred while committing or rolling back a transaction.
    #[error("Transaction error: {message}")]
    TransactionError {
        /// Description of the transaction error.
        message: String,
    },

    /// Failed to connect to the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(order_uid: impl Into<String>) -> Self {
        Self::NotFound {
            order_uid: order_uid.into(),
        }
    }

    /// Creates a new `InvalidOrder` error.
    #[must_use]
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::InvalidOrder {
            message: message.into(),
        }
    }

    /// Creates a new `TransactionError` error.
    #[must_use]
    pub fn transaction_error(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidOrder { .. } => ErrorCategory::Validation,
            Self::TransactionError { .. } => ErrorCategory::Transaction,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Order not found.
    NotFound,
    /// Order rejected by the backend.
    Validation,
    /// Transaction-related error.
    Transaction,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Transaction => write!(f, "transaction"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
