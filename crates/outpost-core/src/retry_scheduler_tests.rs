use super::*;
use crate::entities::Event;
use crate::ids::EventId;
use outpost_queue::{InMemoryQueueProvider, StandardQueueClient};

fn sample_delivery_event(attempt_count: u32) -> DeliveryEvent {
    DeliveryEvent {
        event: Event {
            id: EventId::new("evt-1"),
            tenant_id: crate::ids::TenantId::new("tenant-a"),
            topic: "orders.created".into(),
            time: Utc::now(),
            data: serde_json::json!({}),
            metadata: None,
            eligible_for_retry: true,
            destination_id: None,
        },
        destination_id: crate::ids::DestinationId::new("dest-1"),
        attempt_count,
        manual: false,
    }
}

#[test]
fn backoff_delay_is_deterministic_for_same_inputs() {
    let config = RetryConfig::default();
    let a = backoff_delay(&config, "evt-1:dest-1", 2);
    let b = backoff_delay(&config, "evt-1:dest-1", 2);
    assert_eq!(a, b);
}

#[test]
fn backoff_delay_is_capped() {
    let config = RetryConfig::default();
    let delay = backoff_delay(&config, "evt-1:dest-1", 19);
    assert!(delay <= config.max_delay + Duration::milliseconds(config.max_delay.num_milliseconds() / 10 + 1));
}

#[test]
fn schedulable_respects_retry_max_limit_and_eligibility() {
    let config = RetryConfig {
        retry_max_limit: 3,
        ..RetryConfig::default()
    };
    assert!(is_schedulable(&config, &sample_delivery_event(2)));
    assert!(!is_schedulable(&config, &sample_delivery_event(3)));

    let mut not_eligible = sample_delivery_event(0);
    not_eligible.event.eligible_for_retry = false;
    assert!(!is_schedulable(&config, &not_eligible));
}

#[tokio::test]
async fn poll_once_moves_due_items_onto_delivery_queue() {
    let provider = Arc::new(InMemoryQueueProvider::default());
    let client: Arc<dyn QueueClient> = Arc::new(StandardQueueClient::new(provider));
    let config = RetryConfig {
        base_delay: Duration::milliseconds(1),
        max_delay: Duration::milliseconds(5),
        ..RetryConfig::default()
    };
    let scheduler = RetryScheduler::new(config, client.clone());

    scheduler.schedule(sample_delivery_event(0)).await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let moved = scheduler.poll_once().await.unwrap();

    assert_eq!(moved, 1);
    assert_eq!(client.depth(DELIVERY_QUEUE).await.unwrap(), 1);
}

#[tokio::test]
async fn unschedulable_event_is_never_moved_onto_delivery_queue() {
    let provider = Arc::new(InMemoryQueueProvider::default());
    let client: Arc<dyn QueueClient> = Arc::new(StandardQueueClient::new(provider));
    let config = RetryConfig {
        retry_max_limit: 1,
        ..RetryConfig::default()
    };
    let scheduler = RetryScheduler::new(config, client.clone());

    scheduler.schedule(sample_delivery_event(5)).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let moved = scheduler.poll_once().await.unwrap();

    assert_eq!(moved, 0);
    assert_eq!(client.depth(DELIVERY_QUEUE).await.unwrap(), 0);
}
