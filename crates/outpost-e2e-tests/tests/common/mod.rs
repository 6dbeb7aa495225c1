//! Shared harness for the end-to-end scenario tests: an in-process
//! Outpost service bound to an ephemeral port, and a `wiremock` receiver
//! standing in for both the webhook endpoint and the alert callback.

use outpost_api::config::ServiceConfig;
use outpost_core::entities::{
    Destination, DestinationTopics, DestinationType, WebhookConfig, WebhookCredentials,
};
use outpost_core::ids::{DestinationId, TenantId};
use outpost_core::EntityStore;
use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TENANT: &str = "tenant-A";
pub const DESTINATION: &str = "D";
pub const SECRET: &str = "testsecret1234567890abcdefghijklmnop";
pub const THRESHOLD: u32 = 20;

/// Runs the full Outpost dispatch fabric in-process, HTTP edge included,
/// bound to a free localhost port. Dropped at the end of each test along
/// with its background pools.
pub struct TestService {
    pub base_url: String,
    handle: outpost_service::ServiceHandle,
    _server_task: tokio::task::JoinHandle<()>,
}

impl TestService {
    pub async fn start(config: ServiceConfig, destinations: Vec<Destination>) -> Self {
        let port = find_available_port();
        let mut config = config;
        config.server.port = port;

        let handle = outpost_service::bootstrap(config.clone(), destinations).await;
        let state = handle.state.clone();
        let server_task = tokio::spawn(async move {
            let _ = outpost_api::start_server(config, state).await;
        });

        wait_for_port(port).await;

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            handle,
            _server_task: server_task,
        }
    }

    pub async fn publish(&self, body: serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/v1/publish", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("publish request failed")
    }

    pub async fn retry(&self, body: serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/v1/retry", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("retry request failed")
    }

    pub async fn destination(&self, id: &str) -> Option<Destination> {
        self.handle
            .state
            .entity_store
            .get_destination(&DestinationId::new(id))
            .await
            .expect("entity store lookup is infallible in-memory")
    }

    pub async fn attempts(&self) -> Vec<outpost_core::log::LogRow> {
        self.handle.log_backend.rows().await
    }

    pub fn destination_store(&self) -> std::sync::Arc<dyn EntityStore> {
        self.handle.state.entity_store.clone()
    }

    pub async fn shutdown(self) {
        self.handle.shutdown(Duration::from_secs(2)).await;
    }
}

fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind ephemeral port");
    listener.local_addr().unwrap().port()
}

async fn wait_for_port(port: u16) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("service did not start listening on port {port}");
}

pub fn sample_destination(webhook_base: &str) -> Destination {
    Destination {
        id: DestinationId::new(DESTINATION),
        tenant_id: TenantId::new(TENANT),
        destination_type: DestinationType::Webhook,
        topics: DestinationTopics::wildcard(),
        filter: None,
        config: WebhookConfig {
            url: format!("{webhook_base}/webhook"),
        },
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

/// Responds 500 when the forwarded event's `metadata.should_err` is
/// `true`, 200 otherwise — the mock analogue of a flaky receiver.
struct ScriptedWebhookResponder;

impl Respond for ScriptedWebhookResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let should_err = serde_json::from_slice::<serde_json::Value>(&request.body)
            .ok()
            .and_then(|body| body.get("metadata").cloned())
            .and_then(|metadata| metadata.get("should_err").cloned())
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if should_err {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200)
        }
    }
}

pub async fn mock_receiver() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ScriptedWebhookResponder)
        .mount(&server)
        .await;
    server
}

/// Verifies the `x-outpost-signature-256[-previous]` headers against the
/// credentials currently held in `credentials`, recording one bool per
/// request received. Lets a test mutate `credentials` mid-run to model
/// a secret rotation on the receiver side (scenario 3).
struct VerifyingWebhookResponder {
    credentials: std::sync::Arc<std::sync::Mutex<WebhookCredentials>>,
    verified: std::sync::Arc<std::sync::Mutex<Vec<bool>>>,
}

impl Respond for VerifyingWebhookResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let header = request
            .headers
            .get("x-outpost-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let credentials = self.credentials.lock().unwrap().clone();
        let ok = outpost_core::signing::verify(&credentials, &request.body, &header, chrono::Utc::now());
        self.verified.lock().unwrap().push(ok);
        ResponseTemplate::new(200)
    }
}

pub struct SigningMockReceiver {
    pub server: MockServer,
    credentials: std::sync::Arc<std::sync::Mutex<WebhookCredentials>>,
    verified: std::sync::Arc<std::sync::Mutex<Vec<bool>>>,
}

impl SigningMockReceiver {
    pub async fn start(credentials: WebhookCredentials) -> Self {
        let credentials = std::sync::Arc::new(std::sync::Mutex::new(credentials));
        let verified = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let responder = VerifyingWebhookResponder {
            credentials: credentials.clone(),
            verified: verified.clone(),
        };
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(responder).mount(&server).await;
        Self { server, credentials, verified }
    }

    /// Mirrors a rotation performed on the destination onto the
    /// receiver's view of its credentials.
    pub fn rotate(&self, new_credentials: WebhookCredentials) {
        *self.credentials.lock().unwrap() = new_credentials;
    }

    pub fn verified_results(&self) -> Vec<bool> {
        self.verified.lock().unwrap().clone()
    }
}

/// Records every JSON body posted to it, for alert-callback assertions.
pub struct RecordingAlertServer {
    pub server: MockServer,
}

impl RecordingAlertServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn callback_url(&self) -> String {
        format!("{}/alerts", self.server.uri())
    }

    pub async fn received_bodies(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|req| serde_json::from_slice(&req.body).unwrap_or(serde_json::Value::Null))
            .collect()
    }
}

pub fn failing_event(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "tenant_id": TENANT,
        "topic": "orders.created",
        "data": {"n": id},
        "metadata": {"should_err": true},
        "eligible_for_retry": false,
    })
}

pub fn succeeding_event(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "tenant_id": TENANT,
        "topic": "orders.created",
        "data": {"n": id},
        "eligible_for_retry": false,
    })
}
