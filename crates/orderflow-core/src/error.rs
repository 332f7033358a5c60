use thiserror::Error;

/// Core error types for orderflow operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed order payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns `true` when the payload could not be decoded at all.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
