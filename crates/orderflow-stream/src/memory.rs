//! In-process stream with consumer-group style at-least-once delivery.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::StreamError;
use crate::message::StreamMessage;
use crate::reader::MessageReader;

const PARTITION: i32 = 0;

/// How long a fetched message may stay unacknowledged before it is handed
/// out again.
pub const DEFAULT_REDELIVERY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct LogEntry {
    key: Option<Bytes>,
    value: Bytes,
    acked: bool,
    delivered_at: Option<Instant>,
}

/// Retained part of the log.
///
/// `log[0]` has offset `base`. The acknowledged prefix is dropped on commit,
/// so the front entry, when present, is the oldest unacknowledged message.
#[derive(Debug, Default)]
struct State {
    log: VecDeque<LogEntry>,
    base: u64,
    /// Next offset that has never been delivered.
    position: u64,
    unacked: usize,
    closed: bool,
}

impl State {
    fn end(&self) -> u64 {
        self.base + self.log.len() as u64
    }

    fn entry_mut(&mut self, offset: u64) -> Option<&mut LogEntry> {
        let idx = offset.checked_sub(self.base)?;
        self.log.get_mut(usize::try_from(idx).ok()?)
    }

    /// Picks the next message to hand out: an overdue redelivery first, then
    /// the next new message. Returns how long to wait for the earliest
    /// redelivery when nothing is ready.
    fn next_message(
        &mut self,
        topic: &str,
        redelivery_delay: Duration,
        now: Instant,
    ) -> Result<StreamMessage, Option<Duration>> {
        let mut wait: Option<Duration> = None;
        let mut overdue = None;
        for offset in self.base..self.position {
            let Some(entry) = self.entry_mut(offset) else {
                break;
            };
            if entry.acked {
                continue;
            }
            let Some(delivered_at) = entry.delivered_at else {
                continue;
            };
            let due = delivered_at + redelivery_delay;
            if due <= now {
                overdue = Some(offset);
                break;
            }
            let remaining = due - now;
            wait = Some(wait.map_or(remaining, |w| w.min(remaining)));
        }

        let offset = match overdue {
            Some(offset) => {
                tracing::debug!(topic, offset, "redelivering unacknowledged message");
                offset
            }
            None => loop {
                if self.position >= self.end() {
                    return Err(wait);
                }
                let offset = self.position;
                self.position += 1;
                if self.entry_mut(offset).is_some_and(|entry| !entry.acked) {
                    break offset;
                }
            },
        };

        let Some(entry) = self.entry_mut(offset) else {
            return Err(wait);
        };
        entry.delivered_at = Some(now);
        Ok(StreamMessage {
            topic: topic.to_string(),
            partition: PARTITION,
            offset,
            key: entry.key.clone(),
            value: entry.value.clone(),
        })
    }

    /// Marks `offset` acknowledged. `false` if the offset was never published.
    fn ack(&mut self, offset: u64) -> bool {
        if offset < self.base {
            return true;
        }
        let Some(entry) = self.entry_mut(offset) else {
            return false;
        };
        if !entry.acked {
            entry.acked = true;
            self.unacked -= 1;
        }
        true
    }

    fn compact(&mut self) {
        while self.log.front().is_some_and(|entry| entry.acked) {
            self.log.pop_front();
            self.base += 1;
        }
        self.position = self.position.max(self.base);
    }
}

#[derive(Debug)]
struct Shared {
    topic: String,
    redelivery_delay: Duration,
    state: Mutex<State>,
    notify: Notify,
}

/// Single-partition in-process stream.
///
/// All readers obtained from one stream share a position, so each message is
/// handed to one reader at a time, as in a consumer group. A fetched message
/// that is not acknowledged within the redelivery delay is fetched again,
/// ahead of newer messages. Acknowledged messages are released from memory.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    shared: Arc<Shared>,
}

impl MemoryStream {
    pub fn new(topic: impl Into<String>) -> Self {
        Self::with_redelivery_delay(topic, DEFAULT_REDELIVERY_DELAY)
    }

    pub fn with_redelivery_delay(topic: impl Into<String>, redelivery_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                topic: topic.into(),
                redelivery_delay,
                state: Mutex::new(State::default()),
                notify: Notify::new(),
            }),
        }
    }

    pub fn topic(&self) -> &str {
        &self.shared.topic
    }

    pub fn publisher(&self) -> MemoryPublisher {
        MemoryPublisher {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn reader(&self) -> MemoryReader {
        MemoryReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of messages published but not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().unacked
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Closes the stream for every reader and publisher.
    pub fn close(&self) {
        self.shared.close();
    }
}

impl Shared {
    fn close(&self) {
        let newly_closed = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        if newly_closed {
            tracing::debug!(topic = %self.topic, "stream closed");
        }
        self.notify.notify_waiters();
    }
}

/// Producer handle for a [`MemoryStream`].
#[derive(Debug, Clone)]
pub struct MemoryPublisher {
    shared: Arc<Shared>,
}

impl MemoryPublisher {
    /// Appends a message and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Closed` if the stream was closed.
    pub fn publish(
        &self,
        key: Option<Bytes>,
        value: impl Into<Bytes>,
    ) -> Result<u64, StreamError> {
        let offset = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(StreamError::Closed);
            }
            let offset = state.end();
            state.log.push_back(LogEntry {
                key,
                value: value.into(),
                acked: false,
                delivered_at: None,
            });
            state.unacked += 1;
            offset
        };
        self.shared.notify.notify_waiters();
        tracing::trace!(topic = %self.shared.topic, offset, "message published");
        Ok(offset)
    }
}

/// Consumer handle for a [`MemoryStream`].
#[derive(Debug, Clone)]
pub struct MemoryReader {
    shared: Arc<Shared>,
}

#[async_trait]
impl MessageReader for MemoryReader {
    async fn fetch_message(&self) -> Result<StreamMessage, StreamError> {
        loop {
            // Register interest before inspecting state so a publish between
            // the check and the await is not missed.
            let notified = self.shared.notify.notified();
            let wait = {
                let mut state = self.shared.state.lock();
                if state.closed {
                    return Err(StreamError::Closed);
                }
                match state.next_message(
                    &self.shared.topic,
                    self.shared.redelivery_delay,
                    Instant::now(),
                ) {
                    Ok(message) => return Ok(message),
                    Err(wait) => wait,
                }
            };
            match wait {
                Some(wait) => {
                    let _ = tokio::time::timeout(wait, notified).await;
                }
                None => notified.await,
            }
        }
    }

    async fn commit_messages(&self, messages: &[StreamMessage]) -> Result<(), StreamError> {
        let mut state = self.shared.state.lock();
        let mut result = Ok(());
        for message in messages {
            let known = message.topic == self.shared.topic && message.partition == PARTITION;
            if !known || !state.ack(message.offset) {
                result = Err(StreamError::UnknownMessage {
                    topic: message.topic.clone(),
                    offset: message.offset,
                });
                break;
            }
        }
        state.compact();
        result
    }

    async fn close(&self) -> Result<(), StreamError> {
        self.shared.close();
        Ok(())
    }
}
