//! Entity Store and Idempotence Store (spec.md §2).

use crate::entities::Destination;
use crate::error::OutpostError;
use crate::ids::{DestinationId, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key/value-backed lookup for tenants and destinations. spec.md names
/// this the "core's dependency on" the otherwise out-of-scope tenant/
/// destination CRUD storage; the core only ever reads and upserts.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_destination(
        &self,
        destination_id: &DestinationId,
    ) -> Result<Option<Destination>, OutpostError>;

    async fn get_destinations_by_tenant_and_topic(
        &self,
        tenant_id: &TenantId,
        topic: &str,
    ) -> Result<Vec<Destination>, OutpostError>;

    async fn upsert_destination(&self, destination: Destination) -> Result<(), OutpostError>;
}

/// In-memory [`EntityStore`], used by the service binary's in-memory
/// deployment mode and by tests.
#[derive(Default)]
pub struct InMemoryEntityStore {
    destinations: RwLock<HashMap<DestinationId, Destination>>,
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get_destination(
        &self,
        destination_id: &DestinationId,
    ) -> Result<Option<Destination>, OutpostError> {
        Ok(self.destinations.read().await.get(destination_id).cloned())
    }

    async fn get_destinations_by_tenant_and_topic(
        &self,
        tenant_id: &TenantId,
        topic: &str,
    ) -> Result<Vec<Destination>, OutpostError> {
        let destinations = self.destinations.read().await;
        Ok(destinations
            .values()
            .filter(|d| &d.tenant_id == tenant_id && d.is_enabled() && d.topics.matches(topic))
            .cloned()
            .collect())
    }

    async fn upsert_destination(&self, destination: Destination) -> Result<(), OutpostError> {
        self.destinations
            .write()
            .await
            .insert(destination.id.clone(), destination);
        Ok(())
    }
}

/// Outcome recorded for a fingerprint: publish de-duplication records
/// `Accepted`; delivery de-duplication (best-effort, spec.md §5) can use
/// the same store keyed by a delivery fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotenceOutcome {
    Accepted,
}

/// Mapping fingerprint -> outcome with TTL (spec.md §2). Used both for
/// publish de-duplication and delivery de-duplication.
#[async_trait]
pub trait IdempotenceStore: Send + Sync {
    async fn check(&self, fingerprint: &str) -> Result<Option<IdempotenceOutcome>, OutpostError>;

    async fn record(
        &self,
        fingerprint: &str,
        outcome: IdempotenceOutcome,
        ttl: Duration,
    ) -> Result<(), OutpostError>;
}

struct Entry {
    outcome: IdempotenceOutcome,
    expires_at: DateTime<Utc>,
}

/// In-memory [`IdempotenceStore`]. Expired entries are evicted lazily on
/// `check`, matching the teacher's lazy-expiry style for the in-memory
/// queue provider.
#[derive(Default)]
pub struct InMemoryIdempotenceStore {
    entries: RwLock<HashMap<String, Entry>>,
}

#[async_trait]
impl IdempotenceStore for InMemoryIdempotenceStore {
    async fn check(&self, fingerprint: &str) -> Result<Option<IdempotenceOutcome>, OutpostError> {
        let mut entries = self.entries.write().await;
        match entries.get(fingerprint) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.outcome)),
            Some(_) => {
                entries.remove(fingerprint);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn record(
        &self,
        fingerprint: &str,
        outcome: IdempotenceOutcome,
        ttl: Duration,
    ) -> Result<(), OutpostError> {
        self.entries.write().await.insert(
            fingerprint.to_string(),
            Entry {
                outcome,
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Publish fingerprint over `(tenant_id, event.id)` (spec.md §4.1 step 1).
pub fn publish_fingerprint(tenant_id: &TenantId, event_id: &str) -> String {
    format!("publish:{tenant_id}:{event_id}")
}

pub type SharedEntityStore = Arc<dyn EntityStore>;
pub type SharedIdempotenceStore = Arc<dyn IdempotenceStore>;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
