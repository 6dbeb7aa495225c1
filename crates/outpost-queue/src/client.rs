//! The `QueueClient` trait and the standard client built on top of a
//! [`QueueProvider`].

use crate::error::QueueError;
use crate::message::{Message, ReceivedMessage};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations a caller needs against a named queue: send, receive,
/// complete (ack), abandon (nack / release back for immediate redelivery).
///
/// Implementations provide at-least-once delivery with a visibility
/// timeout: a received message is invisible to other receivers until
/// either `complete_message` is called or the timeout elapses, at which
/// point it reappears automatically.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn send_message(&self, queue: &str, message: Message) -> Result<(), QueueError>;

    /// Receive up to one message, waiting at most `wait_time_ms`.
    /// `None` means the queue was empty for the whole wait.
    async fn receive_message(
        &self,
        queue: &str,
        wait_time_ms: u64,
    ) -> Result<Option<ReceivedMessage>, QueueError>;

    async fn complete_message(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError>;

    async fn abandon_message(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError>;

    /// Current number of messages visible (i.e. not currently in flight) in
    /// `queue`. Used by the publish handler for backpressure (spec §5).
    async fn depth(&self, queue: &str) -> Result<usize, QueueError>;
}

/// Backing storage a [`QueueClient`] delegates to. Kept separate from
/// `QueueClient` so a single provider instance can back several named
/// queues (Outpost uses this for the publish queue and the delivery queue
/// sharing one in-memory broker).
#[async_trait]
pub trait QueueProvider: Send + Sync {
    async fn send(&self, queue: &str, message: Message) -> Result<(), QueueError>;
    async fn receive(
        &self,
        queue: &str,
        wait_time_ms: u64,
    ) -> Result<Option<ReceivedMessage>, QueueError>;
    async fn complete(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError>;
    async fn abandon(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError>;
    async fn depth(&self, queue: &str) -> Result<usize, QueueError>;
}

/// Thin [`QueueClient`] that forwards to a shared [`QueueProvider`].
pub struct StandardQueueClient {
    provider: Arc<dyn QueueProvider>,
}

impl StandardQueueClient {
    pub fn new(provider: Arc<dyn QueueProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl QueueClient for StandardQueueClient {
    async fn send_message(&self, queue: &str, message: Message) -> Result<(), QueueError> {
        self.provider.send(queue, message).await
    }

    async fn receive_message(
        &self,
        queue: &str,
        wait_time_ms: u64,
    ) -> Result<Option<ReceivedMessage>, QueueError> {
        self.provider.receive(queue, wait_time_ms).await
    }

    async fn complete_message(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError> {
        self.provider.complete(queue, receipt_handle).await
    }

    async fn abandon_message(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError> {
        self.provider.abandon(queue, receipt_handle).await
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        self.provider.depth(queue).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
