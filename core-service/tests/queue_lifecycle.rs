//! End-to-end tests for the queue service
//!
//! These tests drive the real transport, session, queue API and reconciler
//! against an in-memory ClearML server:
//! - Create / read / update / delete lifecycle, including a repeated delete
//! - Transport retry and per-attempt tracing
//! - Construction failures (bad config, rejected login)

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy},
    observer::{HttpObserver, RequestRecord, ResponseRecord},
};
use bytes::Bytes;
use core_service::{
    CancellationToken, ClientConfig, ConvergeAction, DeleteOutcome, QueueService, QueueSpec,
    ServiceDependencies, ServiceError, SyncError,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const API_URL: &str = "http://clearml.test:8008";
const TOKEN: &str = "tok-e2e";

// ============================================================================
// Fake ClearML server
// ============================================================================

#[derive(Default)]
struct ServerState {
    queues: BTreeMap<String, (String, Vec<String>)>,
    next_id: u32,
}

#[derive(Default)]
struct FakeClearml {
    state: Mutex<ServerState>,
    /// Endpoint of every request received, in order
    received: Mutex<Vec<String>>,
    /// Number of upcoming requests that fail before reaching the server
    connection_failures: Mutex<u32>,
    /// Answer every `queues.*` call as an unknown endpoint
    queue_endpoints_missing: Mutex<bool>,
}

impl FakeClearml {
    fn fail_connections(&self, count: u32) {
        *self.connection_failures.lock().unwrap() = count;
    }

    fn drop_queue_endpoints(&self) {
        *self.queue_endpoints_missing.lock().unwrap() = true;
    }

    fn queue_count(&self) -> usize {
        self.state.lock().unwrap().queues.len()
    }

    fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    fn reply(status: u16, body: Value) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    fn error(status: u16, subcode: u32, message: &str) -> HttpResponse {
        Self::reply(
            status,
            json!({
                "meta": {
                    "result_code": status,
                    "result_subcode": subcode,
                    "result_msg": message
                },
                "data": {}
            }),
        )
    }

    fn invalid_queue() -> HttpResponse {
        Self::error(400, 701, "Invalid queue id")
    }

    fn handle(&self, endpoint: &str, request: &HttpRequest) -> HttpResponse {
        let auth = request.header_value("Authorization").unwrap_or_default();

        if endpoint == "auth.login" {
            // base64("AK:SK")
            if auth != "Basic QUs6U0s=" || request.body.is_some() {
                return Self::error(401, 0, "Unauthorized (invalid credentials)");
            }
            return Self::reply(200, json!({ "data": { "token": TOKEN } }));
        }

        if *self.queue_endpoints_missing.lock().unwrap() {
            return Self::error(404, 0, "Unknown endpoint");
        }

        if auth != format!("Bearer {}", TOKEN) {
            return Self::error(401, 0, "Unauthorized");
        }

        let body: Value = request
            .body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(Value::Null);
        let queue_id = body["queue"].as_str().unwrap_or_default().to_string();
        let tags = |v: &Value| -> Vec<String> {
            v.as_array()
                .map(|a| a.iter().filter_map(|t| t.as_str().map(String::from)).collect())
                .unwrap_or_default()
        };

        let mut state = self.state.lock().unwrap();
        match endpoint {
            "queues.create" => {
                let name = body["name"].as_str().unwrap_or_default().to_string();
                if state.queues.values().any(|(n, _)| *n == name) {
                    return Self::error(400, 702, "Queue with this name already exists");
                }
                state.next_id += 1;
                let id = format!("q-{}", state.next_id);
                state.queues.insert(id.clone(), (name, tags(&body["tags"])));
                Self::reply(200, json!({ "data": { "id": id } }))
            }
            "queues.get_by_id" => match state.queues.get(&queue_id) {
                Some((name, queue_tags)) => Self::reply(
                    200,
                    json!({
                        "data": {
                            "queue": {
                                "id": queue_id,
                                "name": name,
                                "tags": queue_tags,
                                "system_tags": [],
                                "created": "2024-05-01T10:00:00.000000+00:00",
                                "entries": []
                            }
                        }
                    }),
                ),
                None => Self::invalid_queue(),
            },
            "queues.update" => match state.queues.get_mut(&queue_id) {
                Some(queue) => {
                    queue.0 = body["name"].as_str().unwrap_or_default().to_string();
                    queue.1 = tags(&body["tags"]);
                    Self::reply(200, json!({ "data": { "updated": 1 } }))
                }
                None => Self::invalid_queue(),
            },
            "queues.delete" => match state.queues.remove(&queue_id) {
                Some(_) => Self::reply(200, json!({ "data": { "deleted": true } })),
                None => Self::invalid_queue(),
            },
            _ => Self::error(404, 0, "Unknown endpoint"),
        }
    }
}

#[async_trait]
impl HttpClient for FakeClearml {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let endpoint = request
            .url
            .strip_prefix(API_URL)
            .unwrap_or(&request.url)
            .trim_start_matches('/')
            .to_string();
        self.received.lock().unwrap().push(endpoint.clone());

        {
            let mut failures = self.connection_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(BridgeError::Connect("connection reset by peer".to_string()));
            }
        }

        Ok(self.handle(&endpoint, &request))
    }
}

// ============================================================================
// Recording observer
// ============================================================================

#[derive(Default)]
struct RecordingObserver {
    requests: Mutex<Vec<RequestRecord>>,
    responses: Mutex<Vec<ResponseRecord>>,
}

impl RecordingObserver {
    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpObserver for RecordingObserver {
    fn on_request(&self, record: &RequestRecord) {
        self.requests.lock().unwrap().push(record.clone());
    }

    fn on_response(&self, record: &ResponseRecord) {
        self.responses.lock().unwrap().push(record.clone());
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn config() -> ClientConfig {
    ClientConfig::builder()
        .api_url(API_URL)
        .access_key("AK")
        .secret_key("SK")
        .retry_policy(RetryPolicy::immediate(3))
        .build()
        .unwrap()
}

async fn connect(
    server: &Arc<FakeClearml>,
    observer: &Arc<RecordingObserver>,
) -> Result<QueueService, ServiceError> {
    connect_with_config(server, observer, config()).await
}

async fn connect_with_config(
    server: &Arc<FakeClearml>,
    observer: &Arc<RecordingObserver>,
    config: ClientConfig,
) -> Result<QueueService, ServiceError> {
    let deps = ServiceDependencies::new(server.clone()).with_observer(observer.clone());
    QueueService::connect_with(&config, deps, &CancellationToken::new()).await
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_queue_lifecycle_scenario() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();
    let cancel = CancellationToken::new();

    let created = service
        .create(
            &QueueSpec::new("terraform-test-abc123", ["env:test"]).unwrap(),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(created.id, "q-1");

    let read = service.read("q-1", &cancel).await.unwrap();
    assert_eq!(read.name, "terraform-test-abc123");
    assert_eq!(read.tags, vec!["env:test"]);

    let updated = service
        .update(
            "q-1",
            &QueueSpec::new("terraform-test-abc123", ["env:test", "team:ml"]).unwrap(),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(updated.tags, vec!["env:test", "team:ml"]);

    let reread = service.read("q-1", &cancel).await.unwrap();
    assert_eq!(reread.id, "q-1");
    assert_eq!(reread.tags, vec!["env:test", "team:ml"]);

    assert_eq!(
        service.delete("q-1", &cancel).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        service.delete("q-1", &cancel).await.unwrap(),
        DeleteOutcome::AlreadyAbsent
    );

    assert_eq!(
        server.received(),
        vec![
            "auth.login",
            "queues.create",
            "queues.get_by_id",
            "queues.get_by_id",
            "queues.update",
            "queues.get_by_id",
            "queues.get_by_id",
            "queues.delete",
            "queues.delete",
        ]
    );
}

#[tokio::test]
async fn test_read_of_unknown_queue_is_not_found() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();

    let err = service
        .read("q-never", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Sync(SyncError::NotFound { ref id }) if id == "q-never"
    ));
}

#[tokio::test]
async fn test_delete_against_unknown_endpoint_is_an_error() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();
    let cancel = CancellationToken::new();
    let queue = service
        .create(&QueueSpec::named("still-here").unwrap(), &cancel)
        .await
        .unwrap();

    server.drop_queue_endpoints();
    let err = service.delete(&queue.id, &cancel).await.unwrap_err();

    assert!(matches!(err, ServiceError::Sync(SyncError::Provider(_))));
    assert!(err.to_string().contains("Unknown endpoint"));
    assert_eq!(server.queue_count(), 1);
}

#[tokio::test]
async fn test_duplicate_name_is_remote_rejection() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();
    let cancel = CancellationToken::new();
    let spec = QueueSpec::named("shared").unwrap();

    service.create(&spec, &cancel).await.unwrap();
    let err = service.create(&spec, &cancel).await.unwrap_err();

    assert!(matches!(err, ServiceError::Sync(SyncError::Provider(_))));
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn test_transient_failures_are_retried_and_traced() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();
    let cancel = CancellationToken::new();
    service
        .create(&QueueSpec::named("retry-me").unwrap(), &cancel)
        .await
        .unwrap();

    let before = observer.request_count();
    server.fail_connections(2);

    let queue = service.read("q-1", &cancel).await.unwrap();

    assert_eq!(queue.name, "retry-me");
    assert_eq!(observer.request_count() - before, 3);
    let attempts: Vec<u32> = observer.requests.lock().unwrap()[before..]
        .iter()
        .map(|r| r.attempt)
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_retry_budget_is_bounded() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();

    let before = server.received().len();
    server.fail_connections(10);

    let err = service
        .read("q-1", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Sync(SyncError::Provider(_))));
    assert_eq!(server.received().len() - before, 3);
}

#[tokio::test]
async fn test_traces_never_carry_authorization() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();
    service
        .create(&QueueSpec::new("traced", ["a"]).unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    let requests = observer.requests.lock().unwrap();
    assert!(requests.iter().any(|r| r.url.ends_with("/auth.login")));
    for record in requests.iter() {
        assert!(record
            .headers
            .iter()
            .all(|(k, _)| !k.eq_ignore_ascii_case("authorization")));
        assert!(!record.render_headers().contains(TOKEN));
    }

    let responses = observer.responses.lock().unwrap();
    assert_eq!(responses.len(), requests.len());
    assert!(responses
        .iter()
        .any(|r| r.render_body().contains("\"id\": \"q-1\"")));
}

#[tokio::test]
async fn test_rejected_login_fails_construction() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let config = ClientConfig::builder()
        .api_url(API_URL)
        .access_key("AK")
        .secret_key("wrong")
        .build()
        .unwrap();

    let err = connect_with_config(&server, &observer, config)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, ServiceError::ConstructionAuth(_)));
    assert!(err.is_construction());
    assert_eq!(server.received(), vec!["auth.login"]);
}

#[tokio::test]
async fn test_invalid_config_fails_before_any_request() {
    async fn connect_from(
        server: &Arc<FakeClearml>,
        observer: &Arc<RecordingObserver>,
        url: &str,
        access_key: &str,
    ) -> Result<QueueService, ServiceError> {
        let config = ClientConfig::builder()
            .api_url(url)
            .access_key(access_key)
            .secret_key("SK")
            .build()?;
        connect_with_config(server, observer, config).await
    }

    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());

    for (url, access_key) in [(API_URL, ""), ("", "AK"), ("not a url", "AK")] {
        let err = connect_from(&server, &observer, url, access_key)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::ConstructionConfig(_)));
        assert!(err.is_construction());
    }

    assert!(server.received().is_empty());
}

#[tokio::test]
async fn test_converge_creates_then_updates_drift() {
    let server = Arc::new(FakeClearml::default());
    let observer = Arc::new(RecordingObserver::default());
    let service = connect(&server, &observer).await.unwrap();
    let cancel = CancellationToken::new();
    let spec = QueueSpec::new("converged", ["env:test"]).unwrap();

    let first = service.converge(None, &spec, &cancel).await.unwrap();
    assert_eq!(first.action, ConvergeAction::Created);

    let again = service
        .converge(Some(&first.queue.id), &spec, &cancel)
        .await
        .unwrap();
    assert_eq!(again.action, ConvergeAction::Unchanged);

    let imported = service.import(&first.queue.id, &cancel).await.unwrap();
    assert_eq!(imported, again.queue);
}
