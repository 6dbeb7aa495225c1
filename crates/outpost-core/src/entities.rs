//! Data model (spec.md §3).

use crate::ids::{AttemptId, DestinationId, EventId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// The sentinel that matches every known topic.
pub const WILDCARD_TOPIC: &str = "*";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Webhook,
}

/// Secret material for a webhook destination. `secret` and
/// `previous_secret` are never serialized in plaintext except at creation
/// or rotation time by an admin (spec.md §4.5) — callers that need to
/// surface a `Destination` over the API are responsible for redacting
/// these fields; the core stores and reads them as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCredentials {
    pub secret: String,
    pub previous_secret: Option<String>,
    pub previous_secret_invalid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DestinationTopics {
    Wildcard,
    Set(HashSet<String>),
}

impl DestinationTopics {
    pub fn wildcard() -> Self {
        DestinationTopics::Wildcard
    }

    pub fn set(topics: HashSet<String>) -> Self {
        DestinationTopics::Set(topics)
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            DestinationTopics::Wildcard => true,
            DestinationTopics::Set(topics) => topics.contains(topic),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, DestinationTopics::Wildcard)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub tenant_id: TenantId,
    pub destination_type: DestinationType,
    pub topics: DestinationTopics,
    /// Document-predicate filter (spec.md §4.1 step 3); see [`crate::filter`].
    pub filter: Option<Value>,
    pub config: WebhookConfig,
    pub credentials: WebhookCredentials,
    pub delivery_metadata: Option<HashMap<String, String>>,
    pub metadata: Option<HashMap<String, String>>,
    pub disabled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Destination {
    pub fn is_enabled(&self) -> bool {
        self.disabled_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub tenant_id: TenantId,
    pub topic: String,
    pub time: DateTime<Utc>,
    pub data: Value,
    pub metadata: Option<HashMap<String, Value>>,
    pub eligible_for_retry: bool,
    pub destination_id: Option<DestinationId>,
}

/// DQ item (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub event: Event,
    pub destination_id: DestinationId,
    pub attempt_count: u32,
    pub manual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub status: Option<u16>,
    pub body: Option<String>,
    pub headers: HashMap<String, String>,
}

/// Attempt log row. Exactly one is appended for every terminal outcome of
/// a `DeliveryEvent` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub event_id: EventId,
    pub destination_id: DestinationId,
    pub tenant_id: TenantId,
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub response_data: Option<ResponseData>,
    pub manual: bool,
    pub delivered_at: DateTime<Utc>,
}

/// Per-destination failure counters (spec.md §3), mutated only by the
/// Worker and the Alert Engine under the per-destination lock (spec.md
/// §5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FailureCounters {
    pub consecutive_failures: u32,
    pub max_consecutive_failures: u32,
    pub last_alert_count: u32,
}

impl FailureCounters {
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_consecutive_failures,
            last_alert_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.last_alert_count = 0;
    }
}

#[cfg(test)]
#[path = "entities_tests.rs"]
mod tests;
