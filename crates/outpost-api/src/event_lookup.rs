//! Minimal by-id event lookup backing `POST /retry` (spec.md §6).
//!
//! Full log queries (`GET /events`, `GET /attempts`, pagination) are out of
//! scope (spec.md §1); this is only enough state to resolve the event a
//! manual retry targets.

use async_trait::async_trait;
use outpost_core::{entities::Event, ids::EventId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait EventLookup: Send + Sync {
    async fn record(&self, event: &Event);
    async fn get(&self, event_id: &EventId) -> Option<Event>;
}

#[derive(Default)]
pub struct InMemoryEventLookup {
    events: RwLock<HashMap<EventId, Event>>,
}

#[async_trait]
impl EventLookup for InMemoryEventLookup {
    async fn record(&self, event: &Event) {
        self.events
            .write()
            .await
            .insert(event.id.clone(), event.clone());
    }

    async fn get(&self, event_id: &EventId) -> Option<Event> {
        self.events.read().await.get(event_id).cloned()
    }
}

pub type SharedEventLookup = Arc<dyn EventLookup>;

#[cfg(test)]
#[path = "event_lookup_tests.rs"]
mod tests;
