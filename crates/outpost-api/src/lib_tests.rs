use super::*;
use axum::body::Body;
use axum::http::Request;
use outpost_core::entities::{
    Destination, DestinationTopics, DestinationType, WebhookConfig, WebhookCredentials,
};
use outpost_core::store::{InMemoryEntityStore, InMemoryIdempotenceStore};
use outpost_core::{AttemptLogWriter, IdGenConfig, LogWriterConfig, PublishConfig};
use outpost_queue::{InMemoryQueueProvider, StandardQueueClient};
use tower::ServiceExt;

fn sample_destination() -> Destination {
    Destination {
        id: DestinationId::new("dest-1"),
        tenant_id: TenantId::new("tenant-a"),
        destination_type: DestinationType::Webhook,
        topics: DestinationTopics::wildcard(),
        filter: None,
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
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

async fn build_state() -> (AppState, Arc<InMemoryEntityStore>) {
    let entity_store = Arc::new(InMemoryEntityStore::default());
    let idempotence_store = Arc::new(InMemoryIdempotenceStore::default());
    let log_writer = Arc::new(AttemptLogWriter::new(
        Arc::new(outpost_core::log::InMemoryLogBackend::default()),
        LogWriterConfig::default(),
    ));
    let provider = Arc::new(InMemoryQueueProvider::default());
    let queue_client: Arc<dyn QueueClient> = Arc::new(StandardQueueClient::new(provider));
    let id_factory = Arc::new(IdFactory::new(IdGenConfig::default()));

    let publish_handler = Arc::new(PublishHandler::new(
        entity_store.clone(),
        idempotence_store,
        log_writer,
        queue_client.clone(),
        id_factory.clone(),
        PublishConfig::default(),
    ));

    let state = AppState {
        publish_handler,
        entity_store: entity_store.clone(),
        queue_client,
        event_lookup: Arc::new(InMemoryEventLookup::default()),
        id_factory,
    };
    (state, entity_store)
}

#[tokio::test]
async fn publish_returns_202_with_queued_count() {
    let (state, entity_store) = build_state().await;
    entity_store
        .upsert_destination(sample_destination())
        .await
        .unwrap();
    let router = create_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/publish")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "tenant_id": "tenant-a",
                "topic": "orders.created",
                "data": {"amount": 1}
            })
            .to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn retry_against_disabled_destination_returns_400() {
    let (state, entity_store) = build_state().await;
    let mut destination = sample_destination();
    destination.disabled_at = Some(chrono::Utc::now());
    entity_store.upsert_destination(destination).await.unwrap();
    state
        .event_lookup
        .record(&outpost_core::entities::Event {
            id: EventId::new("evt-1"),
            tenant_id: TenantId::new("tenant-a"),
            topic: "orders.created".into(),
            time: chrono::Utc::now(),
            data: serde_json::json!({}),
            metadata: None,
            eligible_for_retry: true,
            destination_id: None,
        })
        .await;
    let router = create_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/retry")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"event_id": "evt-1", "destination_id": "dest-1"}).to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn retry_against_missing_destination_returns_404() {
    let (state, _entity_store) = build_state().await;
    let router = create_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/retry")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"event_id": "evt-1", "destination_id": "missing"}).to_string(),
        ))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text_format() {
    let (state, _entity_store) = build_state().await;
    let router = create_router(state);

    let request = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("outpost_retry_attempts_total"));
}
