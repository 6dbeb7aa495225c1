//! Delivery Worker (spec.md §4.2): consumes one `DeliveryEvent` at a time
//! from DQ, invokes the destination's transport, and drives destination
//! failure state under the per-destination lock (spec.md §5).

use crate::alerts::AlertEngine;
use crate::entities::{Attempt, AttemptStatus, DeliveryEvent, Destination, FailureCounters};
use crate::error::OutpostError;
use crate::id_factory::IdFactory;
use crate::ids::{AttemptId, DestinationId};
use crate::log::{AttemptLogWriter, LogRow};
use crate::retry_scheduler::RetryScheduler;
use crate::store::SharedEntityStore;
use crate::transport::Transport;
use chrono::Utc;
use outpost_queue::{QueueClient, DELIVERY_QUEUE};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub transport_timeout: Duration,
    pub poll_wait_ms: u64,
    pub default_failure_threshold: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            transport_timeout: Duration::from_secs(10),
            poll_wait_ms: 2_000,
            default_failure_threshold: 20,
        }
    }
}

/// Per-destination failure counters, lazily created on first use. A
/// dedicated lock per destination (spec.md §5) rather than one global
/// lock, so deliveries to distinct destinations never contend.
#[derive(Default)]
struct CounterTable {
    counters: RwLock<HashMap<DestinationId, Arc<Mutex<FailureCounters>>>>,
}

impl CounterTable {
    async fn get(&self, destination_id: &DestinationId, default_threshold: u32) -> Arc<Mutex<FailureCounters>> {
        if let Some(existing) = self.counters.read().await.get(destination_id) {
            return existing.clone();
        }
        let mut table = self.counters.write().await;
        table
            .entry(destination_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(FailureCounters::new(default_threshold))))
            .clone()
    }
}

pub struct Worker {
    entity_store: SharedEntityStore,
    log_writer: Arc<AttemptLogWriter>,
    alert_engine: Arc<AlertEngine>,
    retry_scheduler: Arc<RetryScheduler>,
    transport: Arc<dyn Transport>,
    queue_client: Arc<dyn QueueClient>,
    id_factory: Arc<IdFactory>,
    config: WorkerConfig,
    counters: CounterTable,
}

impl Worker {
    pub fn new(
        entity_store: SharedEntityStore,
        log_writer: Arc<AttemptLogWriter>,
        alert_engine: Arc<AlertEngine>,
        retry_scheduler: Arc<RetryScheduler>,
        transport: Arc<dyn Transport>,
        queue_client: Arc<dyn QueueClient>,
        id_factory: Arc<IdFactory>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            entity_store,
            log_writer,
            alert_engine,
            retry_scheduler,
            transport,
            queue_client,
            id_factory,
            config,
            counters: CounterTable::default(),
        }
    }

    /// Run the receive loop until `shutdown` resolves. Multiple `Worker`s
    /// (or multiple `run` calls against the same `Worker`) can consume DQ
    /// concurrently to form a pool (spec.md §5).
    pub async fn run(self: &Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                received = self.queue_client.receive_message(DELIVERY_QUEUE, self.config.poll_wait_ms) => {
                    match received {
                        Ok(Some(message)) => {
                            if let Err(err) = self.handle_received(message).await {
                                crate::metrics::metrics().record_error(err.category());
                                warn!(error = %err, "delivery worker failed to process message");
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            let err = OutpostError::from(err);
                            crate::metrics::metrics().record_error(err.category());
                            warn!(error = %err, "delivery queue receive failed");
                        }
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

    async fn handle_received(
        &self,
        received: outpost_queue::ReceivedMessage,
    ) -> Result<(), OutpostError> {
        let delivery_event: DeliveryEvent =
            serde_json::from_value(received.message.body.clone()).map_err(|e| {
                OutpostError::Validation {
                    reason: format!("malformed DeliveryEvent on DQ: {e}"),
                }
            })?;

        self.handle_one(delivery_event).await;

        self.queue_client
            .complete_message(DELIVERY_QUEUE, &received.receipt_handle)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, delivery_event), fields(event_id = %delivery_event.event.id, destination_id = %delivery_event.destination_id, attempt_count = delivery_event.attempt_count))]
    async fn handle_one(&self, delivery_event: DeliveryEvent) {
        let destination = match self
            .entity_store
            .get_destination(&delivery_event.destination_id)
            .await
        {
            Ok(Some(destination)) => destination,
            Ok(None) => {
                info!("destination no longer exists, dropping delivery");
                return;
            }
            Err(err) => {
                crate::metrics::metrics().record_error(err.category());
                warn!(error = %err, "entity store lookup failed, dropping delivery");
                return;
            }
        };

        if !destination.is_enabled() && !delivery_event.manual {
            let synthetic = crate::entities::ResponseData {
                status: None,
                body: Some("destination_disabled".to_string()),
                headers: HashMap::new(),
            };
            self.record_attempt(&delivery_event, &destination, false, Some(synthetic))
                .await;
            return;
        }

        let outcome = self
            .transport
            .deliver(&delivery_event.event, &destination, self.config.transport_timeout)
            .await;

        let attempt_id = self
            .record_attempt(&delivery_event, &destination, outcome.success, outcome.response)
            .await;

        let counters_lock = self
            .counters
            .get(&destination.id, self.config.default_failure_threshold)
            .await;

        if outcome.success {
            let mut counters = counters_lock.lock().await;
            counters.reset();
            return;
        }

        let should_disable = {
            let mut counters = counters_lock.lock().await;
            counters.consecutive_failures += 1;
            let decision = self
                .alert_engine
                .record_failure(
                    &destination.tenant_id,
                    &destination.id,
                    &mut counters,
                    &attempt_id,
                    &delivery_event.event,
                )
                .await;
            decision.should_disable
        };

        if should_disable {
            self.disable_destination(destination, attempt_id, delivery_event.event.id.clone())
                .await;
        }

        self.retry_scheduler
            .schedule(DeliveryEvent {
                event: delivery_event.event,
                destination_id: delivery_event.destination_id,
                attempt_count: delivery_event.attempt_count + 1,
                manual: delivery_event.manual,
            })
            .await;
    }

    async fn record_attempt(
        &self,
        delivery_event: &DeliveryEvent,
        destination: &Destination,
        success: bool,
        response: Option<crate::entities::ResponseData>,
    ) -> AttemptId {
        let attempt_id = AttemptId::new(self.id_factory.generate_attempt_id());
        let attempt = Attempt {
            id: attempt_id.clone(),
            event_id: delivery_event.event.id.clone(),
            destination_id: destination.id.clone(),
            tenant_id: destination.tenant_id.clone(),
            attempt_number: delivery_event.attempt_count,
            status: if success {
                AttemptStatus::Success
            } else {
                AttemptStatus::Failed
            },
            response_data: response,
            manual: delivery_event.manual,
            delivered_at: Utc::now(),
        };
        self.log_writer.append(LogRow::Attempt(attempt)).await;
        attempt_id
    }

    async fn disable_destination(
        &self,
        mut destination: Destination,
        attempt_id: AttemptId,
        event_id: crate::ids::EventId,
    ) {
        if destination.disabled_at.is_some() {
            return;
        }
        destination.disabled_at = Some(Utc::now());
        if let Err(err) = self.entity_store.upsert_destination(destination.clone()).await {
            crate::metrics::metrics().record_error(err.category());
            warn!(error = %err, "failed to persist auto-disable");
            return;
        }
        self.alert_engine
            .fire_destination_disabled(&destination, Some(attempt_id), Some(event_id))
            .await;
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
