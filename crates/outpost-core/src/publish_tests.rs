use super::*;
use crate::entities::{
    Destination, DestinationTopics, DestinationType, WebhookConfig, WebhookCredentials,
};
use crate::id_factory::IdGenConfig;
use crate::ids::{EventId, TenantId};
use crate::log::InMemoryLogBackend;
use crate::store::{InMemoryEntityStore, InMemoryIdempotenceStore};
use chrono::Utc;
use outpost_queue::{InMemoryQueueProvider, StandardQueueClient};

fn sample_destination(id: &str, filter: Option<serde_json::Value>) -> Destination {
    Destination {
        id: DestinationId::new(id),
        tenant_id: TenantId::new("tenant-a"),
        destination_type: DestinationType::Webhook,
        topics: DestinationTopics::wildcard(),
        filter,
        config: WebhookConfig {
            url: "https://example.invalid/hook".to_string(),
        },
        credentials: WebhookCredentials {
            secret: "s".repeat(32),
            previous_secret: None,
            previous_secret_invalid_at: None,
        },
        delivery_metadata: None,
        metadata: None,
        disabled_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn sample_event(destination_id: Option<DestinationId>) -> Event {
    Event {
        id: EventId::new("evt-1"),
        tenant_id: TenantId::new("tenant-a"),
        topic: "orders.created".into(),
        time: Utc::now(),
        data: serde_json::json!({"amount": 42}),
        metadata: None,
        eligible_for_retry: true,
        destination_id,
    }
}

async fn build_handler() -> (
    PublishHandler,
    Arc<InMemoryEntityStore>,
    Arc<dyn QueueClient>,
    Arc<InMemoryLogBackend>,
) {
    let entity_store = Arc::new(InMemoryEntityStore::default());
    let idempotence_store = Arc::new(InMemoryIdempotenceStore::default());
    let log_backend = Arc::new(InMemoryLogBackend::default());
    let log_writer = Arc::new(AttemptLogWriter::new(
        log_backend.clone(),
        crate::log::LogWriterConfig {
            batch_size: 1,
            ..Default::default()
        },
    ));
    let provider = Arc::new(InMemoryQueueProvider::default());
    let queue_client: Arc<dyn QueueClient> = Arc::new(StandardQueueClient::new(provider));
    let id_factory = Arc::new(IdFactory::new(IdGenConfig::default()));

    let handler = PublishHandler::new(
        entity_store.clone(),
        idempotence_store,
        log_writer,
        queue_client.clone(),
        id_factory,
        PublishConfig::default(),
    );
    (handler, entity_store, queue_client, log_backend)
}

#[tokio::test]
async fn wildcard_destination_receives_matching_event() {
    let (handler, entity_store, queue_client, log_backend) = build_handler().await;
    entity_store
        .upsert_destination(sample_destination("dest-1", None))
        .await
        .unwrap();

    let result = handler.publish(sample_event(None)).await.unwrap();

    assert_eq!(result.matched_count, 1);
    assert_eq!(result.queued_count, 1);
    assert!(result.destinations.is_none());
    assert_eq!(queue_client.depth(DELIVERY_QUEUE).await.unwrap(), 1);
    assert_eq!(log_backend.rows().await.len(), 1);
}

#[tokio::test]
async fn filter_mismatch_excludes_destination_silently() {
    let (handler, entity_store, queue_client, _log_backend) = build_handler().await;
    entity_store
        .upsert_destination(sample_destination(
            "dest-1",
            Some(serde_json::json!({"amount": {"$gte": 1000}})),
        ))
        .await
        .unwrap();

    let result = handler.publish(sample_event(None)).await.unwrap();

    assert_eq!(result.matched_count, 1);
    assert_eq!(result.queued_count, 0);
    assert_eq!(queue_client.depth(DELIVERY_QUEUE).await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_publish_returns_zero_queued_and_does_not_reenqueue() {
    let (handler, entity_store, queue_client, _log_backend) = build_handler().await;
    entity_store
        .upsert_destination(sample_destination("dest-1", None))
        .await
        .unwrap();

    let first = handler.publish(sample_event(None)).await.unwrap();
    assert_eq!(first.queued_count, 1);

    let second = handler.publish(sample_event(None)).await.unwrap();
    assert_eq!(second.queued_count, 0);
    assert_eq!(queue_client.depth(DELIVERY_QUEUE).await.unwrap(), 1);
}

#[tokio::test]
async fn explicit_destination_not_found_is_reported_without_enqueue() {
    let (handler, _entity_store, queue_client, _log_backend) = build_handler().await;

    let result = handler
        .publish(sample_event(Some(DestinationId::new("missing"))))
        .await
        .unwrap();

    assert_eq!(result.matched_count, 0);
    assert_eq!(result.queued_count, 0);
    let destinations = result.destinations.unwrap();
    assert_eq!(destinations.len(), 1);
    assert_eq!(destinations[0].status, DestinationStatus::NotFound);
    assert_eq!(queue_client.depth(DELIVERY_QUEUE).await.unwrap(), 0);
}

#[tokio::test]
async fn explicit_destination_disabled_is_reported() {
    let (handler, entity_store, _queue_client, _log_backend) = build_handler().await;
    let mut destination = sample_destination("dest-1", None);
    destination.disabled_at = Some(Utc::now());
    entity_store.upsert_destination(destination).await.unwrap();

    let result = handler
        .publish(sample_event(Some(DestinationId::new("dest-1"))))
        .await
        .unwrap();

    let destinations = result.destinations.unwrap();
    assert_eq!(destinations[0].status, DestinationStatus::Disabled);
}

#[tokio::test]
async fn explicit_destination_topic_mismatch_is_reported() {
    let (handler, entity_store, _queue_client, _log_backend) = build_handler().await;
    let mut destination = sample_destination("dest-1", None);
    destination.topics = DestinationTopics::set(["payments.created".to_string()].into_iter().collect());
    entity_store.upsert_destination(destination).await.unwrap();

    let result = handler
        .publish(sample_event(Some(DestinationId::new("dest-1"))))
        .await
        .unwrap();

    let destinations = result.destinations.unwrap();
    assert_eq!(destinations[0].status, DestinationStatus::TopicMismatch);
}
