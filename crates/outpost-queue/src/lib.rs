//! Publish/delivery queue abstraction.
//!
//! Outpost runs two named queues over one provider: the publish queue
//! (PQ) and the delivery queue (DQ). Both need only the same at-least-
//! once-with-visibility-timeout semantic, so they share the
//! [`client::QueueClient`] trait and the in-memory provider in
//! [`providers::memory`].

pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

pub use client::{QueueClient, QueueProvider, StandardQueueClient};
pub use error::QueueError;
pub use message::{Message, ReceivedMessage};
pub use provider::{InMemoryConfig, QueueConfig};
pub use providers::InMemoryQueueProvider;

/// Name of the publish queue.
pub const PUBLISH_QUEUE: &str = "outpost.publish";

/// Name of the delivery queue.
pub const DELIVERY_QUEUE: &str = "outpost.delivery";

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
