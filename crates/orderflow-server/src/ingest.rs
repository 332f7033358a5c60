//! Stream consumer: fetch, decode, validate, persist, cache, acknowledge.
//!
//! Delivery is at-least-once. A message is acknowledged only after its order
//! is durable and cached, or when it can never succeed (malformed or invalid
//! payload). A failed store write leaves the message unacknowledged so the
//! stream redelivers it; replaying it is harmless because the upsert and the
//! cache write both replace by `order_uid`.

use std::sync::Arc;

use orderflow_core::{Order, OrderValidator};
use orderflow_storage::DynOrderStore;
use orderflow_stream::{DynMessageReader, StreamError, StreamMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::OrderCache;
use crate::metrics;

/// Errors that end the ingest loop.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("stream fetch failed: {0}")]
    Fetch(#[source] StreamError),
}

/// What happened to a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Persisted, cached and acknowledged.
    Stored { order_uid: String },
    /// Payload was not a decodable order; acknowledged.
    DiscardedMalformed,
    /// Order failed validation; acknowledged.
    DiscardedInvalid,
    /// Store write failed; left unacknowledged for redelivery.
    PersistFailed,
}

impl MessageOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::DiscardedMalformed => "discarded_malformed",
            Self::DiscardedInvalid => "discarded_invalid",
            Self::PersistFailed => "persist_failed",
        }
    }

    /// Whether the message is acknowledged after this outcome.
    pub fn acknowledges(&self) -> bool {
        !matches!(self, Self::PersistFailed)
    }
}

pub struct IngestPipeline {
    reader: DynMessageReader,
    store: DynOrderStore,
    cache: Arc<dyn OrderCache>,
    validator: OrderValidator,
}

impl IngestPipeline {
    pub fn new(
        reader: DynMessageReader,
        store: DynOrderStore,
        cache: Arc<dyn OrderCache>,
    ) -> Self {
        Self {
            reader,
            store,
            cache,
            validator: OrderValidator::new(),
        }
    }

    /// Consumes messages until the stream closes or `shutdown` fires.
    ///
    /// Closes the reader before returning.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Fetch` when fetching fails for any reason other
    /// than the stream being closed.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), IngestError> {
        info!(store = self.store.backend_name(), "ingest loop started");

        let result = loop {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                fetched = self.reader.fetch_message() => fetched,
            };
            match fetched {
                Ok(message) => {
                    self.process_message(&message).await;
                }
                Err(e) if e.is_shutdown() => break Ok(()),
                Err(e) => break Err(IngestError::Fetch(e)),
            }
        };

        if let Err(e) = self.reader.close().await {
            warn!(error = %e, "failed to close stream reader");
        }
        match &result {
            Ok(()) => info!("ingest loop stopped"),
            Err(e) => error!(error = %e, "ingest loop failed"),
        }
        result
    }

    /// Handles one message end to end, including its acknowledgement.
    pub async fn process_message(&self, message: &StreamMessage) -> MessageOutcome {
        let outcome = self.apply(message).await;
        metrics::record_ingest_outcome(outcome.label());

        if outcome.acknowledges() {
            // A failed commit only means the message may be redelivered.
            if let Err(e) = self
                .reader
                .commit_messages(std::slice::from_ref(message))
                .await
            {
                warn!(
                    offset = message.offset,
                    outcome = outcome.label(),
                    error = %e,
                    "failed to commit message"
                );
            }
        }
        outcome
    }

    async fn apply(&self, message: &StreamMessage) -> MessageOutcome {
        let order = match Order::decode(&message.value) {
            Ok(order) => order,
            Err(e) => {
                warn!(
                    offset = message.offset,
                    error = %e,
                    "discarding malformed order payload"
                );
                return MessageOutcome::DiscardedMalformed;
            }
        };

        if let Err(e) = self.validator.validate_order(&order) {
            warn!(
                order_uid = order.display_uid(),
                offset = message.offset,
                error = %e,
                "discarding invalid order"
            );
            return MessageOutcome::DiscardedInvalid;
        }

        if let Err(e) = self.store.upsert_order(&order, &message.value).await {
            error!(
                order_uid = %order.order_uid,
                offset = message.offset,
                category = %e.category(),
                error = %e,
                "failed to persist order, leaving message unacknowledged"
            );
            return MessageOutcome::PersistFailed;
        }

        self.cache.set(&order.order_uid, &message.value);
        metrics::set_cache_entries(self.cache.len());
        debug!(order_uid = %order.order_uid, offset = message.offset, "order stored");

        MessageOutcome::Stored {
            order_uid: order.order_uid,
        }
    }
}
