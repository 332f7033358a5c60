use async_trait::async_trait;

use crate::error::StreamError;
use crate::message::StreamMessage;

/// Consumer side of a message stream.
///
/// Implementations must be safe to share between tasks.
#[async_trait]
pub trait MessageReader: Send + Sync {
    /// Waits for the next message.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Closed` once the reader or stream is closed;
    /// callers treat it as normal termination. Other errors are fatal to the
    /// consuming loop.
    async fn fetch_message(&self) -> Result<StreamMessage, StreamError>;

    /// Acknowledges messages so they are not delivered again.
    async fn commit_messages(&self, messages: &[StreamMessage]) -> Result<(), StreamError>;

    /// Closes the reader. Pending and future fetches return `StreamError::Closed`.
    async fn close(&self) -> Result<(), StreamError>;
}
