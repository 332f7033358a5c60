//! Message stream abstraction for the orderflow ingest pipeline.
//!
//! [`MessageReader`] is the consumer-side contract the pipeline is written
//! against: fetch one message at a time, acknowledge (commit) it once its
//! effects are durable, close on shutdown. Delivery is at-least-once:
//! anything fetched but not committed may be delivered again.
//!
//! [`MemoryStream`] is an in-process implementation with a cloneable
//! [`MemoryPublisher`] and a [`MemoryReader`] that redelivers a message when
//! it stays unacknowledged past the stream's redelivery delay.

mod error;
mod memory;
mod message;
mod reader;

pub use error::StreamError;
pub use memory::{DEFAULT_REDELIVERY_DELAY, MemoryPublisher, MemoryReader, MemoryStream};
pub use message::StreamMessage;
pub use reader::MessageReader;

/// Type alias for a shared reader trait object.
pub type DynMessageReader = std::sync::Arc<dyn MessageReader>;
