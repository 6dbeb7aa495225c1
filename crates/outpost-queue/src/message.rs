//! Wire shape of a queued message.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message sent to or received from a queue.
///
/// `body` is opaque to the queue itself; callers (the publish handler, the
/// delivery worker) serialize their own payload shapes (an `Event` or a
/// `DeliveryEvent`) into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub body: serde_json::Value,
    pub attributes: HashMap<String, String>,
    /// Caller-assigned id used for log correlation; not interpreted by the
    /// queue.
    pub correlation_id: Option<String>,
}

impl Message {
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            body,
            attributes: HashMap::new(),
            correlation_id: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// A message as handed back by [`crate::client::QueueClient::receive_message`],
/// carrying the receipt handle needed to complete or abandon it.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message: Message,
    pub receipt_handle: String,
    pub delivery_count: u32,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
