//! Concrete [`crate::client::QueueProvider`] implementations.

pub mod memory;

pub use memory::InMemoryQueueProvider;
