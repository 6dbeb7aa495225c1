//! Publish Handler (spec.md §4.1): admission, idempotency, fan-out.

use crate::entities::{DeliveryEvent, Destination, Event};
use crate::error::OutpostError;
use crate::filter;
use crate::id_factory::IdFactory;
use crate::ids::DestinationId;
use crate::log::{AttemptLogWriter, LogRow};
use crate::store::{publish_fingerprint, IdempotenceOutcome, SharedEntityStore, SharedIdempotenceStore};
use chrono::Duration;
use outpost_queue::{Message, QueueClient, DELIVERY_QUEUE, PUBLISH_QUEUE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// TTL for a recorded "accepted" publish fingerprint (spec.md §4.1
    /// step 6, e.g. 24h).
    pub idempotence_ttl: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            idempotence_ttl: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationStatus {
    NotFound,
    Disabled,
    TopicMismatch,
    /// Resolved and topic-eligible, but excluded by the destination's
    /// filter (spec.md §4.1 step 3: silent, not an error).
    Filtered,
    Queued,
}

#[derive(Debug, Clone, Serialize)]
pub struct DestinationResult {
    pub id: DestinationId,
    pub status: DestinationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishResult {
    pub event_id: String,
    pub matched_count: usize,
    pub queued_count: usize,
    /// Populated only when the event targeted a specific `destination_id`
    /// (spec.md §4.1).
    pub destinations: Option<Vec<DestinationResult>>,
}

pub struct PublishHandler {
    entity_store: SharedEntityStore,
    idempotence_store: SharedIdempotenceStore,
    log_writer: Arc<AttemptLogWriter>,
    queue_client: Arc<dyn QueueClient>,
    id_factory: Arc<IdFactory>,
    config: PublishConfig,
}

impl PublishHandler {
    pub fn new(
        entity_store: SharedEntityStore,
        idempotence_store: SharedIdempotenceStore,
        log_writer: Arc<AttemptLogWriter>,
        queue_client: Arc<dyn QueueClient>,
        id_factory: Arc<IdFactory>,
        config: PublishConfig,
    ) -> Self {
        Self {
            entity_store,
            idempotence_store,
            log_writer,
            queue_client,
            id_factory,
            config,
        }
    }

    /// Put `event` onto PQ for asynchronous fan-out by [`Self::run`].
    pub async fn enqueue(&self, event: &Event) -> Result<(), OutpostError> {
        let body = serde_json::to_value(event).map_err(|e| OutpostError::Validation {
            reason: e.to_string(),
        })?;
        self.queue_client
            .send_message(PUBLISH_QUEUE, Message::new(body))
            .await?;
        Ok(())
    }

    /// Consume PQ until `shutdown` resolves, fanning out each event.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                received = self.queue_client.receive_message(PUBLISH_QUEUE, 2_000) => {
                    match received {
                        Ok(Some(message)) => self.handle_received(message).await,
                        Ok(None) => {}
                        Err(err) => warn!(error = %err, "publish queue receive failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn handle_received(&self, received: outpost_queue::ReceivedMessage) {
        let event: Event = match serde_json::from_value(received.message.body.clone()) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "malformed Event on PQ, dropping");
                let _ = self
                    .queue_client
                    .complete_message(PUBLISH_QUEUE, &received.receipt_handle)
                    .await;
                return;
            }
        };

        match self.publish(event).await {
            Ok(result) => {
                info!(
                    event_id = %result.event_id,
                    matched = result.matched_count,
                    queued = result.queued_count,
                    "fanned out event"
                );
                let _ = self
                    .queue_client
                    .complete_message(PUBLISH_QUEUE, &received.receipt_handle)
                    .await;
            }
            Err(err) if err.should_retry() => {
                crate::metrics::metrics().record_error(err.category());
                warn!(error = %err, "publish failed transiently, abandoning for redelivery");
                let _ = self
                    .queue_client
                    .abandon_message(PUBLISH_QUEUE, &received.receipt_handle)
                    .await;
            }
            Err(err) => {
                crate::metrics::metrics().record_error(err.category());
                warn!(error = %err, "publish failed permanently, dropping");
                let _ = self
                    .queue_client
                    .complete_message(PUBLISH_QUEUE, &received.receipt_handle)
                    .await;
            }
        }
    }

    /// Run the full fan-out algorithm against one event and return its
    /// summary. Used both by [`Self::handle_received`] (async PQ-driven
    /// path) and directly by callers that need the result inline (the
    /// `/publish` API edge).
    #[instrument(skip(self, event), fields(event_id = %event.id, tenant_id = %event.tenant_id))]
    pub async fn publish(&self, event: Event) -> Result<PublishResult, OutpostError> {
        let fingerprint = publish_fingerprint(&event.tenant_id, event.id.as_str());
        if let Some(IdempotenceOutcome::Accepted) = self.idempotence_store.check(&fingerprint).await? {
            info!("duplicate publish, returning cached outcome");
            return Ok(PublishResult {
                event_id: event.id.into_string(),
                matched_count: 0,
                queued_count: 0,
                destinations: None,
            });
        }

        let (candidates, explicit_results) = self.resolve_destinations(&event).await?;
        let matched_count = candidates.len();

        let mut survivors = Vec::with_capacity(candidates.len());
        let mut resolved = explicit_results;
        for destination in candidates {
            let passes = match &destination.filter {
                None => true,
                Some(filter) => match filter::matches(filter, &event.data) {
                    Ok(matched) => matched,
                    Err(err) => {
                        warn!(destination_id = %destination.id, error = %err, "filter evaluation failed, treating as miss");
                        false
                    }
                },
            };
            if passes {
                survivors.push(destination);
            } else if let Some(results) = resolved.as_mut() {
                mark_status(results, &destination.id, DestinationStatus::Filtered);
            }
        }

        self.log_writer
            .append(LogRow::Event(event.clone()))
            .await;

        let queued_count = survivors.len();
        for destination in &survivors {
            if let Some(results) = resolved.as_mut() {
                mark_status(results, &destination.id, DestinationStatus::Queued);
            }
            let delivery_event = DeliveryEvent {
                event: event.clone(),
                destination_id: destination.id.clone(),
                attempt_count: 0,
                manual: false,
            };
            let body = serde_json::to_value(&delivery_event).map_err(|e| OutpostError::Validation {
                reason: e.to_string(),
            })?;
            self.queue_client
                .send_message(DELIVERY_QUEUE, Message::new(body))
                .await?;
        }

        self.idempotence_store
            .record(&fingerprint, IdempotenceOutcome::Accepted, self.config.idempotence_ttl)
            .await?;

        Ok(PublishResult {
            event_id: event.id.into_string(),
            matched_count,
            queued_count,
            destinations: resolved,
        })
    }

    /// Resolve the candidate destinations for `event`, plus (for the
    /// explicit `destination_id` path) the per-destination status list
    /// seeded with everything that is already known before filtering.
    async fn resolve_destinations(
        &self,
        event: &Event,
    ) -> Result<(Vec<Destination>, Option<Vec<DestinationResult>>), OutpostError> {
        if let Some(destination_id) = &event.destination_id {
            let destination = self.entity_store.get_destination(destination_id).await?;
            let Some(destination) = destination else {
                return Ok((
                    Vec::new(),
                    Some(vec![DestinationResult {
                        id: destination_id.clone(),
                        status: DestinationStatus::NotFound,
                    }]),
                ));
            };
            if !destination.is_enabled() {
                return Ok((
                    Vec::new(),
                    Some(vec![DestinationResult {
                        id: destination.id,
                        status: DestinationStatus::Disabled,
                    }]),
                ));
            }
            if !destination.topics.matches(&event.topic) {
                return Ok((
                    Vec::new(),
                    Some(vec![DestinationResult {
                        id: destination.id,
                        status: DestinationStatus::TopicMismatch,
                    }]),
                ));
            }
            let id = destination.id.clone();
            Ok((
                vec![destination],
                Some(vec![DestinationResult {
                    id,
                    status: DestinationStatus::Queued,
                }]),
            ))
        } else {
            let destinations = self
                .entity_store
                .get_destinations_by_tenant_and_topic(&event.tenant_id, &event.topic)
                .await?;
            Ok((destinations, None))
        }
    }
}

fn mark_status(results: &mut [DestinationResult], id: &DestinationId, status: DestinationStatus) {
    if let Some(result) = results.iter_mut().find(|r| &r.id == id) {
        result.status = status;
    }
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
