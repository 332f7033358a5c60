//! Stream error types.

/// Errors returned by stream readers and publishers.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The stream was closed. Readers treat this as a shutdown signal.
    #[error("stream closed")]
    Closed,

    /// A commit referenced a message this stream never delivered.
    #[error("unknown message {topic}@{offset}")]
    UnknownMessage { topic: String, offset: u64 },

    /// The underlying transport failed.
    #[error("stream transport error: {message}")]
    Transport { message: String },
}

impl StreamError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns `true` for the shutdown class of errors.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_class() {
        assert!(StreamError::Closed.is_shutdown());
        assert!(!StreamError::transport("broker unreachable").is_shutdown());
        assert_eq!(
            StreamError::transport("broker unreachable").to_string(),
            "stream transport error: broker unreachable"
        );
    }
}
