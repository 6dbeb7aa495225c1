//! Retry Scheduler (spec.md §4.3): a delay queue polled at a fixed
//! interval, re-enqueuing failed work items onto DQ with backoff until the
//! per-event retry budget is exhausted.
//!
//! The scheduler never consults the attempt log; retry eligibility lives
//! entirely in the `DeliveryEvent` it already holds (spec.md §9 "Retry
//! race" regression).

use crate::entities::DeliveryEvent;
use crate::error::OutpostError;
use chrono::{DateTime, Duration, Utc};
use outpost_queue::{Message, QueueClient, DELIVERY_QUEUE};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub retry_interval_seconds: u64,
    pub retry_poll_backoff_ms: u64,
    pub retry_visibility_timeout_seconds: u64,
    pub retry_max_limit: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_interval_seconds: 5,
            retry_poll_backoff_ms: 100,
            retry_visibility_timeout_seconds: 30,
            retry_max_limit: 5,
            base_delay: Duration::seconds(1),
            max_delay: Duration::minutes(10),
        }
    }
}

/// A monotone, capped backoff schedule: exponential in `attempt_count`
/// with a ceiling, plus jitter derived from a hash of `key` and
/// `attempt_count` so the same inputs always produce the same delay
/// (spec.md §4.3: "must be deterministic given attempt_count").
pub fn backoff_delay(config: &RetryConfig, key: &str, attempt_count: u32) -> Duration {
    let exponent = attempt_count.min(20);
    let base_ms = config.base_delay.num_milliseconds().max(1);
    let uncapped_ms = base_ms.saturating_mul(1i64 << exponent);
    let capped_ms = uncapped_ms.min(config.max_delay.num_milliseconds());

    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    attempt_count.hash(&mut hasher);
    // Jitter within +/-10% of the capped delay, derived deterministically.
    let jitter_range = (capped_ms / 10).max(1);
    let jitter = (hasher.finish() % (2 * jitter_range as u64)) as i64 - jitter_range;

    Duration::milliseconds((capped_ms + jitter).max(0))
}

/// Whether a failed `DeliveryEvent` is within its retry budget.
pub fn is_schedulable(config: &RetryConfig, delivery_event: &DeliveryEvent) -> bool {
    delivery_event.event.eligible_for_retry
        && delivery_event.attempt_count < config.retry_max_limit
}

pub struct RetryScheduler {
    config: RetryConfig,
    queue_client: Arc<dyn QueueClient>,
    delay_queue: Mutex<BinaryHeap<Reverse<DelayKey>>>,
    items: Mutex<std::collections::HashMap<u64, DeliveryEvent>>,
    next_seq: AtomicU64,
}

/// Heap key separate from the stored item so cloning into the heap stays
/// cheap; the item itself lives in `items` keyed by a monotonically
/// increasing sequence number embedded in the key.
struct DelayKey {
    due_at: DateTime<Utc>,
    seq: u64,
}
impl PartialEq for DelayKey {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}
impl Eq for DelayKey {}
impl PartialOrd for DelayKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DelayKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at.cmp(&other.due_at).then(self.seq.cmp(&other.seq))
    }
}

impl RetryScheduler {
    pub fn new(config: RetryConfig, queue_client: Arc<dyn QueueClient>) -> Self {
        Self {
            config,
            queue_client,
            delay_queue: Mutex::new(BinaryHeap::new()),
            items: Mutex::new(std::collections::HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Hand a failed `DeliveryEvent` (with `attempt_count` already
    /// incremented by the caller) to the scheduler. No-op if the event is
    /// no longer schedulable.
    #[instrument(skip(self, delivery_event), fields(event_id = %delivery_event.event.id, destination_id = %delivery_event.destination_id, attempt_count = delivery_event.attempt_count))]
    pub async fn schedule(&self, delivery_event: DeliveryEvent) {
        if !is_schedulable(&self.config, &delivery_event) {
            info!("retry budget exhausted, not scheduling");
            return;
        }

        let key = format!(
            "{}:{}",
            delivery_event.event.id, delivery_event.destination_id
        );
        let delay = backoff_delay(&self.config, &key, delivery_event.attempt_count);
        let due_at = Utc::now() + delay;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.items.lock().await.insert(seq, delivery_event);

        self.delay_queue
            .lock()
            .await
            .push(Reverse(DelayKey { due_at, seq }));

        crate::metrics::metrics().retry_attempts_total.inc();
    }

    /// Move any items whose `due_at <= now` back onto DQ. Returns the
    /// number of items moved.
    pub async fn poll_once(&self) -> Result<usize, OutpostError> {
        let now = Utc::now();
        let mut due_seqs = Vec::new();
        {
            let mut heap = self.delay_queue.lock().await;
            while let Some(Reverse(top)) = heap.peek() {
                if top.due_at > now {
                    break;
                }
                if let Some(Reverse(key)) = heap.pop() {
                    due_seqs.push(key.seq);
                }
            }
        }

        let mut moved = 0;
        let mut items = self.items.lock().await;
        for seq in due_seqs {
            if let Some(delivery_event) = items.remove(&seq) {
                let body = serde_json::to_value(&delivery_event).map_err(|e| {
                    OutpostError::QueueTemporary {
                        reason: e.to_string(),
                    }
                })?;
                if let Err(err) = self
                    .queue_client
                    .send_message(DELIVERY_QUEUE, Message::new(body))
                    .await
                {
                    crate::metrics::metrics().queue_send_errors_total.inc();
                    let err = OutpostError::from(err);
                    crate::metrics::metrics().record_error(err.category());
                    return Err(err);
                }
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Run the poll loop until `shutdown` resolves.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            self.config.retry_interval_seconds.max(1),
        ));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.poll_once().await {
                        tracing::warn!(error = %err, "retry scheduler poll failed");
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
}

#[cfg(test)]
#[path = "retry_scheduler_tests.rs"]
mod tests;
