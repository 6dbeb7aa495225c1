//! Alert / Auto-Disable Engine (spec.md §4.4).

use crate::entities::{Destination, Event, FailureCounters};
use crate::ids::{AttemptId, DestinationId, EventId, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub consecutive_failure_count: u32,
    pub auto_disable_destination: bool,
    pub callback_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            consecutive_failure_count: 20,
            auto_disable_destination: true,
            callback_url: None,
            api_key: None,
        }
    }
}

/// Trigger curve: `{⌈t/2⌉, ⌈0.7t⌉, ⌈0.9t⌉, t}`, de-duplicated and sorted.
pub fn alert_tiers(threshold: u32) -> Vec<u32> {
    let t = threshold as f64;
    let mut tiers = vec![
        (t / 2.0).ceil() as u32,
        (t * 0.7).ceil() as u32,
        (t * 0.9).ceil() as u32,
        threshold,
    ];
    tiers.sort_unstable();
    tiers.dedup();
    tiers
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AlertPayload {
    ConsecutiveFailure {
        tenant_id: TenantId,
        attempt: AttemptId,
        event: EventId,
        destination: DestinationId,
        consecutive_failures: ConsecutiveFailuresField,
    },
    DestinationDisabled {
        tenant_id: TenantId,
        destination: DestinationId,
        disabled_at: DateTime<Utc>,
        reason: String,
        attempt: Option<AttemptId>,
        event: Option<EventId>,
    },
}

/// Nested shape per spec.md §9's Open Question resolution: the flat
/// legacy shape (`consecutive_failures:int, max_consecutive_failures,
/// will_disable, attempt_response`) is not implemented.
#[derive(Debug, Clone, Serialize)]
pub struct ConsecutiveFailuresField {
    pub current: u32,
    pub max: u32,
    pub threshold: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertEnvelope {
    pub topic: &'static str,
    pub timestamp: DateTime<Utc>,
    pub data: AlertPayload,
}

impl AlertEnvelope {
    fn new(data: AlertPayload) -> Self {
        let topic = match &data {
            AlertPayload::ConsecutiveFailure { .. } => "alert.consecutive_failure",
            AlertPayload::DestinationDisabled { .. } => "alert.destination.disabled",
        };
        Self {
            topic,
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Delivers an [`AlertEnvelope`] to `alert.callback_url`. Separated from
/// [`AlertEngine`] so tests can substitute a recording sink instead of a
/// real HTTP call.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, callback_url: &str, api_key: Option<&str>, envelope: AlertEnvelope);
}

/// `reqwest`-backed [`AlertSink`]. Failures are logged, never propagated —
/// alert delivery has no bearing on the delivery pipeline's own retry
/// logic (spec.md §4.4 robustness note).
pub struct HttpAlertSink {
    client: reqwest::Client,
}

impl Default for HttpAlertSink {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AlertSink for HttpAlertSink {
    async fn send(&self, callback_url: &str, api_key: Option<&str>, envelope: AlertEnvelope) {
        let mut request = self.client.post(callback_url).json(&json!(envelope));
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }
        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(topic = envelope.topic, "alert callback delivered")
            }
            Ok(resp) => warn!(
                topic = envelope.topic,
                status = resp.status().as_u16(),
                "alert callback returned non-2xx"
            ),
            Err(err) => warn!(topic = envelope.topic, error = %err, "alert callback failed"),
        }
    }
}

/// Deterministic state machine on `consecutive_failures` for one
/// destination (spec.md §4.4). Pure with respect to the counters it is
/// given; callers are responsible for holding the per-destination lock
/// (spec.md §5) around the read-modify-write of those counters.
pub struct AlertEngine {
    config: AlertConfig,
    sink: std::sync::Arc<dyn AlertSink>,
}

/// Outcome of [`AlertEngine::record_failure`]: whether the destination
/// should transition to disabled as a result of this failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoDisableDecision {
    pub should_disable: bool,
}

impl AlertEngine {
    pub fn new(config: AlertConfig, sink: std::sync::Arc<dyn AlertSink>) -> Self {
        Self { config, sink }
    }

    /// Called by the Worker after incrementing `counters.consecutive_failures`
    /// under the per-destination lock. Fires any alert tiers newly crossed
    /// and reports whether auto-disable should occur.
    #[tracing::instrument(skip(self, counters, event), fields(destination_id = %destination_id, tenant_id = %tenant_id))]
    pub async fn record_failure(
        &self,
        tenant_id: &TenantId,
        destination_id: &DestinationId,
        counters: &mut FailureCounters,
        attempt_id: &AttemptId,
        event: &Event,
    ) -> AutoDisableDecision {
        let threshold = counters.max_consecutive_failures;
        let tiers = alert_tiers(threshold);

        for tier in tiers {
            if counters.consecutive_failures >= tier && counters.last_alert_count < tier {
                counters.last_alert_count = tier;
                self.fire_consecutive_failure(
                    tenant_id,
                    destination_id,
                    attempt_id,
                    &event.id,
                    counters.consecutive_failures,
                    threshold,
                )
                .await;
            }
        }

        AutoDisableDecision {
            should_disable: self.config.auto_disable_destination
                && counters.consecutive_failures >= threshold,
        }
    }

    async fn fire_consecutive_failure(
        &self,
        tenant_id: &TenantId,
        destination_id: &DestinationId,
        attempt_id: &AttemptId,
        event_id: &EventId,
        current: u32,
        threshold: u32,
    ) {
        self.dispatch(AlertPayload::ConsecutiveFailure {
            tenant_id: tenant_id.clone(),
            attempt: attempt_id.clone(),
            event: event_id.clone(),
            destination: destination_id.clone(),
            consecutive_failures: ConsecutiveFailuresField {
                current,
                max: threshold,
                threshold,
            },
        })
        .await;
    }

    /// Emitted by the caller once it has atomically set
    /// `destination.disabled_at`. Kept as a separate call (rather than
    /// folded into `record_failure`) because the disable transition itself
    /// is the caller's responsibility under the entity store's lock.
    pub async fn fire_destination_disabled(
        &self,
        destination: &Destination,
        attempt_id: Option<AttemptId>,
        event_id: Option<EventId>,
    ) {
        self.dispatch(AlertPayload::DestinationDisabled {
            tenant_id: destination.tenant_id.clone(),
            destination: destination.id.clone(),
            disabled_at: destination.disabled_at.unwrap_or_else(Utc::now),
            reason: "consecutive_failure".to_string(),
            attempt: attempt_id,
            event: event_id,
        })
        .await;
    }

    async fn dispatch(&self, payload: AlertPayload) {
        let Some(callback_url) = self.config.callback_url.as_deref() else {
            // spec.md §4.4 robustness: silently dropped, auto-disable
            // still happens via the caller's own logic.
            return;
        };
        if callback_url.is_empty() {
            return;
        }
        let envelope = AlertEnvelope::new(payload);
        self.sink
            .send(callback_url, self.config.api_key.as_deref(), envelope)
            .await;
    }
}

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;
