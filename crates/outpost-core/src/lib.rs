//! Outpost's delivery pipeline: publish intake, dispatch fabric,
//! destination state machine, webhook signing, and the attempt/event log
//! write path. The HTTP surface, tenant/destination CRUD storage, and log
//! queries live in `outpost-api`; this crate is their shared engine.

pub mod alerts;
pub mod entities;
pub mod error;
pub mod filter;
pub mod id_factory;
pub mod ids;
pub mod log;
pub mod metrics;
pub mod publish;
pub mod retry_scheduler;
pub mod signing;
pub mod store;
pub mod transport;
pub mod worker;

pub use alerts::{AlertConfig, AlertEngine, AlertSink};
pub use error::{ErrorCategory, OutpostError};
pub use id_factory::{IdFactory, IdGenConfig, IdGenKind};
pub use ids::{AttemptId, DestinationId, EventId, TenantId};
pub use log::{AttemptLogWriter, LogBackend, LogWriterConfig};
pub use metrics::{metrics, PipelineMetrics};
pub use publish::{PublishConfig, PublishHandler, PublishResult};
pub use retry_scheduler::{RetryConfig, RetryScheduler};
pub use store::{EntityStore, IdempotenceStore, SharedEntityStore, SharedIdempotenceStore};
pub use transport::{Transport, WebhookTransport};
pub use worker::{Worker, WorkerConfig};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
