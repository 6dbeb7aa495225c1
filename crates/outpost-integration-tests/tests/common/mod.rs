//! Shared fixtures for component-level tests: real in-memory providers
//! wired the way `outpost-service::bootstrap` wires them, minus the HTTP
//! edge and the background task pools, so tests can drive one piece
//! (the publish handler, the worker, the router) directly.

use outpost_core::entities::{
    Destination, DestinationTopics, DestinationType, Event, WebhookConfig, WebhookCredentials,
};
use outpost_core::ids::{DestinationId, EventId, TenantId};
use outpost_core::log::InMemoryLogBackend;
use outpost_core::store::{InMemoryEntityStore, InMemoryIdempotenceStore};
use outpost_core::{
    AlertConfig, AlertEngine, AttemptLogWriter, EntityStore, IdFactory, LogWriterConfig,
    PublishConfig, PublishHandler, RetryConfig, RetryScheduler, Worker, WorkerConfig,
};
use outpost_core::alerts::HttpAlertSink;
use outpost_core::transport::Transport;
use outpost_queue::{InMemoryQueueProvider, QueueClient, StandardQueueClient};
use std::sync::Arc;

pub const TENANT: &str = "tenant-a";
pub const DESTINATION: &str = "dest-a";
pub const SECRET: &str = "testsecret1234567890abcdefghijklmnop";

/// Everything a test needs to drive the dispatch fabric directly, with no
/// network edge in front of it.
pub struct Fixture {
    pub entity_store: Arc<InMemoryEntityStore>,
    pub log_backend: Arc<InMemoryLogBackend>,
    pub queue_client: Arc<dyn QueueClient>,
    pub publish_handler: Arc<PublishHandler>,
    pub worker: Arc<Worker>,
}

impl Fixture {
    pub async fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, WorkerConfig::default(), AlertConfig::default()).await
    }

    pub async fn with_config(
        transport: Arc<dyn Transport>,
        worker_config: WorkerConfig,
        alert_config: AlertConfig,
    ) -> Self {
        let entity_store = Arc::new(InMemoryEntityStore::default());
        let idempotence_store = Arc::new(InMemoryIdempotenceStore::default());
        let log_backend = Arc::new(InMemoryLogBackend::default());
        let log_writer = Arc::new(AttemptLogWriter::new(log_backend.clone(), LogWriterConfig {
            batch_size: 1,
            ..LogWriterConfig::default()
        }));
        let queue_provider = Arc::new(InMemoryQueueProvider::default());
        let queue_client: Arc<dyn QueueClient> = Arc::new(StandardQueueClient::new(queue_provider));
        let id_factory = Arc::new(IdFactory::default());

        let alert_sink = Arc::new(HttpAlertSink::default());
        let alert_engine = Arc::new(AlertEngine::new(alert_config, alert_sink));
        let retry_scheduler = Arc::new(RetryScheduler::new(RetryConfig::default(), queue_client.clone()));

        let worker = Arc::new(Worker::new(
            entity_store.clone(),
            log_writer.clone(),
            alert_engine,
            retry_scheduler,
            transport,
            queue_client.clone(),
            id_factory.clone(),
            worker_config,
        ));

        let publish_handler = Arc::new(PublishHandler::new(
            entity_store.clone(),
            idempotence_store,
            log_writer,
            queue_client.clone(),
            id_factory,
            PublishConfig::default(),
        ));

        Self {
            entity_store,
            log_backend,
            queue_client,
            publish_handler,
            worker,
        }
    }

    pub async fn seed(&self, destination: Destination) {
        self.entity_store.upsert_destination(destination).await.unwrap();
    }
}

pub fn sample_destination(url: &str) -> Destination {
    Destination {
        id: DestinationId::new(DESTINATION),
        tenant_id: TenantId::new(TENANT),
        destination_type: DestinationType::Webhook,
        topics: DestinationTopics::wildcard(),
        filter: None,
        config: WebhookConfig { url: url.to_string() },
        credentials: WebhookCredentials {
            secret: SECRET.to_string(),
            previous_secret: None,
            previous_secret_invalid_at: None,
        },
        delivery_metadata: None,
        metadata: None,
        disabled_at: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

pub fn sample_event(id: &str, topic: &str) -> Event {
    Event {
        id: EventId::new(id),
        tenant_id: TenantId::new(TENANT),
        topic: topic.to_string(),
        time: chrono::Utc::now(),
        data: serde_json::json!({}),
        metadata: None,
        eligible_for_retry: true,
        destination_id: None,
    }
}
