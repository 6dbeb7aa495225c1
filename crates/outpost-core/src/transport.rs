//! The Worker's transport abstraction (spec.md §4.2, §6 "Webhook
//! delivery").

use crate::entities::{Destination, Event, ResponseData};
use crate::signing;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct TransportOutcome {
    pub success: bool,
    pub response: Option<ResponseData>,
}

/// Invokes a destination's transport. For webhooks, success is a non-
/// retriable 2xx; every other outcome (including a transport-level error)
/// is `success: false`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(
        &self,
        event: &Event,
        destination: &Destination,
        timeout: Duration,
    ) -> TransportOutcome;
}

const MAX_CAPTURED_BODY_BYTES: usize = 4096;
const CAPTURED_HEADERS: &[&str] = &["content-type", "x-request-id"];

/// `reqwest`-backed webhook transport: `POST <destination.config.url>`
/// with the event payload as the JSON body, `delivery_metadata` merged
/// into request headers, and signature headers from
/// [`signing::sign`].
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl Default for WebhookTransport {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn deliver(
        &self,
        event: &Event,
        destination: &Destination,
        timeout: Duration,
    ) -> TransportOutcome {
        let payload = serde_json::json!({
            "id": event.id,
            "tenant_id": event.tenant_id,
            "topic": event.topic,
            "time": event.time,
            "data": event.data,
            "metadata": event.metadata,
        });
        let body = match serde_json::to_vec(&payload) {
            Ok(b) => b,
            Err(err) => {
                warn!(error = %err, "failed to serialize webhook payload");
                return TransportOutcome {
                    success: false,
                    response: None,
                };
            }
        };

        let signatures = signing::sign(&destination.credentials, &body, chrono::Utc::now());

        let mut request = self
            .client
            .post(&destination.config.url)
            .timeout(timeout)
            .header("content-type", "application/json")
            .header("x-outpost-signature-256", format!("sha256={}", signatures.current));
        if let Some(previous) = &signatures.previous {
            request = request.header("x-outpost-signature-256-previous", format!("sha256={previous}"));
        }
        if let Some(metadata) = &destination.delivery_metadata {
            for (key, value) in metadata {
                request = request.header(key.as_str(), value.as_str());
            }
        }

        match request.body(body).send().await {
            Ok(response) => {
                let status = response.status();
                let headers: HashMap<String, String> = response
                    .headers()
                    .iter()
                    .filter(|(name, _)| CAPTURED_HEADERS.contains(&name.as_str()))
                    .map(|(name, value)| {
                        (
                            name.to_string(),
                            value.to_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect();
                let body_text = response.text().await.unwrap_or_default();
                let truncated: String = body_text.chars().take(MAX_CAPTURED_BODY_BYTES).collect();

                TransportOutcome {
                    success: status.is_success(),
                    response: Some(ResponseData {
                        status: Some(status.as_u16()),
                        body: Some(truncated),
                        headers,
                    }),
                }
            }
            Err(err) => {
                warn!(error = %err, url = %destination.config.url, "webhook delivery failed");
                TransportOutcome {
                    success: false,
                    response: None,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
