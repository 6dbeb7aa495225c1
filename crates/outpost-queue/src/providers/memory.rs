//! In-memory queue provider.
//!
//! Provides at-least-once delivery with a visibility timeout: a received
//! message is held in an "in flight" table and is invisible to other
//! receivers until `complete` removes it or the timeout elapses and
//! [`QueueStorage::return_expired_messages`] puts it back at the front of
//! the queue. This is the only semantic spec.md §5 requires of the queue
//! layer; there is deliberately no session/ordering support (see
//! `SPEC_FULL.md` §E).

use crate::client::QueueProvider;
use crate::error::QueueError;
use crate::message::{Message, ReceivedMessage};
use crate::provider::InMemoryConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredMessage {
    message: Message,
    delivery_count: u32,
}

#[derive(Debug, Clone)]
struct InFlightMessage {
    queue: String,
    message: Message,
    delivery_count: u32,
    visible_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueStorage {
    queues: HashMap<String, VecDeque<StoredMessage>>,
    in_flight: HashMap<String, InFlightMessage>,
}

impl QueueStorage {
    /// Sweep the in-flight table for entries whose visibility timeout has
    /// elapsed and put them back at the front of their queue so they are
    /// the next thing redelivered.
    fn return_expired_messages(&mut self) {
        let now = Utc::now();
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, m)| m.visible_at <= now)
            .map(|(handle, _)| handle.clone())
            .collect();

        for handle in expired {
            if let Some(in_flight) = self.in_flight.remove(&handle) {
                warn!(
                    queue = %in_flight.queue,
                    delivery_count = in_flight.delivery_count,
                    "visibility timeout elapsed, redelivering message"
                );
                self.queues
                    .entry(in_flight.queue)
                    .or_default()
                    .push_front(StoredMessage {
                        message: in_flight.message,
                        delivery_count: in_flight.delivery_count,
                    });
            }
        }
    }
}

/// In-memory [`QueueProvider`]. One instance can back any number of named
/// queues (Outpost runs the publish queue and the delivery queue on the
/// same provider).
pub struct InMemoryQueueProvider {
    storage: Arc<RwLock<QueueStorage>>,
    config: InMemoryConfig,
}

impl InMemoryQueueProvider {
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage::default())),
            config,
        }
    }
}

impl Default for InMemoryQueueProvider {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueProvider for InMemoryQueueProvider {
    async fn send(&self, queue: &str, message: Message) -> Result<(), QueueError> {
        let mut storage = self.storage.write().await;
        let entry = storage.queues.entry(queue.to_string()).or_default();
        if entry.len() >= self.config.max_queue_size {
            return Err(QueueError::CapacityExceeded {
                queue: queue.to_string(),
                max_size: self.config.max_queue_size,
            });
        }
        entry.push_back(StoredMessage {
            message,
            delivery_count: 0,
        });
        Ok(())
    }

    async fn receive(
        &self,
        queue: &str,
        wait_time_ms: u64,
    ) -> Result<Option<ReceivedMessage>, QueueError> {
        let deadline = Utc::now() + chrono::Duration::milliseconds(wait_time_ms as i64);
        loop {
            {
                let mut storage = self.storage.write().await;
                storage.return_expired_messages();

                if let Some(stored) = storage
                    .queues
                    .get_mut(queue)
                    .and_then(|q| q.pop_front())
                {
                    let receipt_handle = Uuid::new_v4().to_string();
                    let delivery_count = stored.delivery_count + 1;
                    storage.in_flight.insert(
                        receipt_handle.clone(),
                        InFlightMessage {
                            queue: queue.to_string(),
                            message: stored.message.clone(),
                            delivery_count,
                            visible_at: Utc::now() + self.config.visibility_timeout,
                        },
                    );
                    debug!(queue, delivery_count, "message received");
                    return Ok(Some(ReceivedMessage {
                        message: stored.message,
                        receipt_handle,
                        delivery_count,
                    }));
                }
            }

            if Utc::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(
                self.config
                    .poll_interval
                    .to_std()
                    .unwrap_or(std::time::Duration::from_millis(10)),
            )
            .await;
        }
    }

    async fn complete(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let mut storage = self.storage.write().await;
        match storage.in_flight.get(receipt_handle) {
            Some(m) if m.queue == queue => {
                storage.in_flight.remove(receipt_handle);
                Ok(())
            }
            _ => Err(QueueError::MessageNotFound {
                receipt_handle: receipt_handle.to_string(),
            }),
        }
    }

    async fn abandon(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let mut storage = self.storage.write().await;
        match storage.in_flight.remove(receipt_handle) {
            Some(in_flight) if in_flight.queue == queue => {
                storage
                    .queues
                    .entry(queue.to_string())
                    .or_default()
                    .push_back(StoredMessage {
                        message: in_flight.message,
                        delivery_count: in_flight.delivery_count,
                    });
                Ok(())
            }
            Some(in_flight) => {
                // Put it back so it isn't lost, but report the mismatch.
                storage.in_flight.insert(receipt_handle.to_string(), in_flight);
                Err(QueueError::MessageNotFound {
                    receipt_handle: receipt_handle.to_string(),
                })
            }
            None => Err(QueueError::MessageNotFound {
                receipt_handle: receipt_handle.to_string(),
            }),
        }
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        let storage = self.storage.read().await;
        Ok(storage.queues.get(queue).map(|q| q.len()).unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
