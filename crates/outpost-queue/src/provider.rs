//! Provider configuration.
//!
//! Outpost ships a single provider: an in-memory queue with visibility-
//! timeout redelivery. The trait boundary in [`crate::client`] is kept
//! separate from the concrete provider so a durable backend can be added
//! later without touching callers.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for queue client initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub provider: InMemoryConfig,
    pub default_visibility_timeout: Duration,
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: InMemoryConfig::default(),
            default_visibility_timeout: Duration::seconds(30),
            max_queue_size: 100_000,
        }
    }
}

/// In-memory provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    pub max_queue_size: usize,
    pub visibility_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 100_000,
            visibility_timeout: Duration::seconds(30),
            poll_interval: Duration::milliseconds(10),
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
