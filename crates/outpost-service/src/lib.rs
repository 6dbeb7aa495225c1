//! Wires the delivery pipeline's independent pools (spec.md §5: "a
//! parallel-tasks runtime hosting multiple independent pools") behind the
//! HTTP edge: the publish fan-out loop, the delivery worker pool, the
//! retry scheduler, and the log writer's timer-driven flush.

use outpost_api::{AppState, InMemoryEventLookup, ServiceConfig};
use outpost_core::entities::Destination;
use outpost_core::log::InMemoryLogBackend;
use outpost_core::store::{InMemoryEntityStore, InMemoryIdempotenceStore};
use outpost_core::{
    AlertEngine, AttemptLogWriter, IdFactory, PublishConfig, PublishHandler, RetryScheduler,
    Worker, WorkerConfig,
};
use outpost_core::alerts::HttpAlertSink;
use outpost_core::transport::WebhookTransport;
use outpost_queue::{InMemoryQueueProvider, QueueClient, StandardQueueClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ServiceHandle {
    pub state: AppState,
    /// Exposed for test observability; the HTTP surface never reads the
    /// log backend directly (log-query endpoints are out of scope).
    pub log_backend: Arc<InMemoryLogBackend>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl ServiceHandle {
    /// Signal every pool to stop and wait for them to drain, bounded by
    /// `config.server.shutdown_timeout_seconds` (spec.md §5).
    pub async fn shutdown(self, timeout: Duration) {
        let _ = self.shutdown_tx.send(true);
        let drain = async {
            for task in self.tasks {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            tracing::warn!("shutdown window elapsed with pools still draining");
        }
    }
}

/// Build every in-memory collaborator and spin up the publish loop, the
/// worker pool, and the retry scheduler. The service binary's deployment
/// mode is in-memory only; swapping in durable stores/queues means
/// substituting the trait implementations constructed here.
pub async fn bootstrap(config: ServiceConfig, seed_destinations: Vec<Destination>) -> ServiceHandle {
    let entity_store = Arc::new(InMemoryEntityStore::default());
    for destination in seed_destinations {
        entity_store
            .upsert_destination(destination)
            .await
            .expect("in-memory store upsert is infallible");
    }
    let idempotence_store = Arc::new(InMemoryIdempotenceStore::default());
    let log_backend = Arc::new(InMemoryLogBackend::default());
    let log_writer = Arc::new(AttemptLogWriter::new(
        log_backend.clone(),
        config.log.clone(),
    ));
    let queue_provider = Arc::new(InMemoryQueueProvider::default());
    let queue_client: Arc<dyn QueueClient> = Arc::new(StandardQueueClient::new(queue_provider));
    let id_factory = Arc::new(IdFactory::new(config.id_gen.clone()));

    let alert_sink = Arc::new(HttpAlertSink::default());
    let alert_engine = Arc::new(AlertEngine::new(config.alert.clone(), alert_sink));
    let retry_scheduler = Arc::new(RetryScheduler::new(config.retry.clone(), queue_client.clone()));
    let transport = Arc::new(WebhookTransport::default());

    let worker = Arc::new(Worker::new(
        entity_store.clone(),
        log_writer.clone(),
        alert_engine,
        retry_scheduler.clone(),
        transport,
        queue_client.clone(),
        id_factory.clone(),
        WorkerConfig {
            transport_timeout: Duration::from_secs(config.server.transport_timeout_seconds),
            default_failure_threshold: config.alert.consecutive_failure_count,
            ..WorkerConfig::default()
        },
    ));

    let publish_handler = Arc::new(PublishHandler::new(
        entity_store.clone(),
        idempotence_store,
        log_writer.clone(),
        queue_client.clone(),
        id_factory.clone(),
        PublishConfig::default(),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut tasks = Vec::new();

    for pool_index in 0..config.server.worker_pool_size.max(1) {
        let worker = worker.clone();
        let shutdown_rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            info!(pool_index, "starting delivery worker");
            worker.run(shutdown_rx).await;
        }));
    }

    {
        let retry_scheduler = retry_scheduler.clone();
        let shutdown_rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            retry_scheduler.run(shutdown_rx).await;
        }));
    }

    {
        let log_writer = log_writer.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = ticker.tick() => log_writer.flush_if_due().await,
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            log_writer.flush().await;
                            break;
                        }
                    }
                }
            }
        }));
    }

    {
        let publish_handler = publish_handler.clone();
        let shutdown_rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            publish_handler.run(shutdown_rx).await;
        }));
    }

    let state = AppState {
        publish_handler,
        entity_store,
        queue_client,
        event_lookup: Arc::new(InMemoryEventLookup::default()),
        id_factory,
    };

    ServiceHandle {
        state,
        log_backend,
        shutdown_tx,
        tasks,
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
