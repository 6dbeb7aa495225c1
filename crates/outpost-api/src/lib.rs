//! # Outpost HTTP Service
//!
//! The thin edge the core depends on: `POST /publish` and `POST /retry`
//! (spec.md §6). Tenant/destination CRUD, auth modes, the portal, and
//! log-query pagination are named out of scope (spec.md §1) and are not
//! implemented here.

pub mod config;
pub mod errors;
pub mod event_lookup;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use outpost_core::entities::{DeliveryEvent, Event};
use outpost_core::ids::{DestinationId, EventId, TenantId};
use outpost_core::{EntityStore, IdFactory, PublishHandler, PublishResult};
use outpost_queue::{Message, QueueClient, DELIVERY_QUEUE};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

pub use config::ServiceConfig;
pub use errors::{ApiError, ConfigError};
pub use event_lookup::{EventLookup, InMemoryEventLookup, SharedEventLookup};

#[derive(Clone)]
pub struct AppState {
    pub publish_handler: Arc<PublishHandler>,
    pub entity_store: Arc<dyn EntityStore>,
    pub queue_client: Arc<dyn QueueClient>,
    pub event_lookup: SharedEventLookup,
    pub id_factory: Arc<IdFactory>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequestBody {
    pub id: Option<String>,
    pub tenant_id: TenantId,
    pub topic: String,
    pub time: Option<chrono::DateTime<chrono::Utc>>,
    pub data: serde_json::Value,
    pub metadata: Option<std::collections::HashMap<String, serde_json::Value>>,
    #[serde(default = "default_eligible_for_retry")]
    pub eligible_for_retry: bool,
    pub destination_id: Option<DestinationId>,
}

fn default_eligible_for_retry() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RetryRequestBody {
    pub event_id: EventId,
    pub destination_id: DestinationId,
}

#[derive(Debug, Serialize)]
pub struct RetryResponseBody {
    pub event_id: String,
    pub destination_id: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/publish", post(handle_publish))
        .route("/api/v1/retry", post(handle_retry))
        .route("/metrics", get(metrics_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

#[instrument(skip(state, body), fields(tenant_id = %body.tenant_id))]
async fn handle_publish(
    State(state): State<AppState>,
    Json(body): Json<PublishRequestBody>,
) -> Result<(StatusCode, Json<PublishResult>), ApiError> {
    let event = Event {
        id: EventId::new(
            body.id
                .unwrap_or_else(|| state.id_factory.generate_event_id()),
        ),
        tenant_id: body.tenant_id,
        topic: body.topic,
        time: body.time.unwrap_or_else(chrono::Utc::now),
        data: body.data,
        metadata: body.metadata,
        eligible_for_retry: body.eligible_for_retry,
        destination_id: body.destination_id,
    };

    state.event_lookup.record(&event).await;
    let result = state.publish_handler.publish(event).await?;
    Ok((StatusCode::ACCEPTED, Json(result)))
}

#[instrument(skip(state, body), fields(event_id = %body.event_id, destination_id = %body.destination_id))]
async fn handle_retry(
    State(state): State<AppState>,
    Json(body): Json<RetryRequestBody>,
) -> Result<(StatusCode, Json<RetryResponseBody>), ApiError> {
    let destination = state
        .entity_store
        .get_destination(&body.destination_id)
        .await?
        .ok_or_else(|| ApiError::Pipeline(outpost_core::OutpostError::NotFound {
            entity: format!("destination {}", body.destination_id),
        }))?;

    if !destination.is_enabled() {
        return Err(ApiError::DestinationDisabled);
    }

    let event = state
        .event_lookup
        .get(&body.event_id)
        .await
        .ok_or_else(|| ApiError::Pipeline(outpost_core::OutpostError::NotFound {
            entity: format!("event {}", body.event_id),
        }))?;

    let delivery_event = DeliveryEvent {
        event,
        destination_id: body.destination_id.clone(),
        attempt_count: 0,
        manual: true,
    };
    let payload = serde_json::to_value(&delivery_event).map_err(|e| {
        ApiError::BadRequest(format!("failed to serialize delivery event: {e}"))
    })?;
    state
        .queue_client
        .send_message(DELIVERY_QUEUE, Message::new(payload))
        .await
        .map_err(outpost_core::OutpostError::from)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RetryResponseBody {
            event_id: body.event_id.into_string(),
            destination_id: body.destination_id.into_string(),
        }),
    ))
}

/// Exposes the process-wide [`outpost_core::metrics`] counters in
/// prometheus text format.
#[instrument(skip_all)]
async fn metrics_endpoint() -> Result<String, StatusCode> {
    use prometheus::TextEncoder;
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn start_server(config: ServiceConfig, state: AppState) -> Result<(), ConfigError> {
    config.validate()?;

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ConfigError::Invalid {
            message: format!("failed to bind {addr}: {e}"),
        })?;

    info!(%addr, "starting Outpost HTTP server");
    axum::serve(listener, app)
        .await
        .map_err(|e| ConfigError::Invalid {
            message: format!("server error: {e}"),
        })?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
