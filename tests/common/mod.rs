//! Mock backend for the integration tests.
//!
//! An axum server on an ephemeral port that answers every actors endpoint with
//! a record whose `id` names the endpoint (`list-actors`, `get-actor`, ...),
//! and records each request it receives. Any path segment equal to `404`
//! yields a `record-not-found` error.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use apify_client::{ApifyClient, ClientConfig};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const DEFAULT_TOKEN: &str = "default-token";

/// A request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json_body(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Assert method, path and the exact query, on top of the default token.
    pub fn assert_matches(&self, method: Method, path: &str, query: &[(&str, &str)]) {
        let mut expected: BTreeMap<String, String> = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        expected.insert("token".to_string(), DEFAULT_TOKEN.to_string());

        assert_eq!(self.method, method, "method of {}", self.path);
        assert_eq!(self.path, path);
        assert_eq!(self.query, expected, "query of {}", self.path);
    }
}

/// A canned reply that replaces an endpoint's default once.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl MockResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn error(status: StatusCode, error_type: &str, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": { "type": error_type, "message": message } }),
        }
    }
}

#[derive(Clone, Copy)]
enum Kind {
    List,
    Item,
    /// A run record with this status, `id` = endpoint label.
    Run(&'static str),
    /// A run record with this status, `id` = last path segment.
    RunById(&'static str),
    Text,
    Delete,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    overrides: Arc<Mutex<HashMap<&'static str, VecDeque<MockResponse>>>>,
}

impl MockState {
    fn handle(
        &self,
        label: &'static str,
        kind: Kind,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response {
        let query = uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        let headers = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: uri.path().to_string(),
            query,
            headers,
            body,
        });

        let replacement = self
            .overrides
            .lock()
            .unwrap()
            .get_mut(label)
            .and_then(VecDeque::pop_front);
        if let Some(reply) = replacement {
            return (reply.status, Json(reply.body)).into_response();
        }

        if uri.path().split('/').any(|segment| segment == "404") {
            let reply = MockResponse::error(
                StatusCode::NOT_FOUND,
                "record-not-found",
                "Record was not found",
            );
            return (reply.status, Json(reply.body)).into_response();
        }

        let created = if method == Method::POST {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        match kind {
            Kind::List => Json(json!({
                "data": {
                    "total": 1,
                    "offset": 0,
                    "limit": 1000,
                    "count": 1,
                    "desc": false,
                    "items": [{ "id": label }]
                }
            }))
            .into_response(),
            Kind::Item => (created, Json(json!({ "data": { "id": label } }))).into_response(),
            Kind::Run(status) => (
                created,
                Json(json!({ "data": { "id": label, "status": status } })),
            )
                .into_response(),
            Kind::RunById(status) => {
                let id = uri.path().rsplit('/').next().unwrap_or(label);
                Json(json!({ "data": { "id": id, "status": status } })).into_response()
            }
            Kind::Text => ([(header::CONTENT_TYPE, "text/plain")], label).into_response(),
            Kind::Delete => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

type Reply = Pin<Box<dyn Future<Output = Response> + Send>>;

fn respond(
    label: &'static str,
    kind: Kind,
) -> impl Fn(State<MockState>, Method, Uri, HeaderMap, Bytes) -> Reply + Clone + Send + Sync + 'static
{
    move |State(state), method, uri, headers, body| {
        Box::pin(async move { state.handle(label, kind, method, &uri, &headers, body) })
    }
}

fn router(state: MockState) -> Router {
    Router::new()
        .route(
            "/v2/acts",
            get(respond("list-actors", Kind::List)).post(respond("create-actor", Kind::Item)),
        )
        .route(
            "/v2/acts/{actor_id}",
            get(respond("get-actor", Kind::Item))
                .put(respond("update-actor", Kind::Item))
                .delete(respond("delete-actor", Kind::Delete)),
        )
        .route(
            "/v2/acts/{actor_id}/runs",
            get(respond("list-runs", Kind::List)).post(respond("run-actor", Kind::Run("READY"))),
        )
        .route(
            "/v2/acts/{actor_id}/runs/last",
            get(respond("last-run-get", Kind::Run("SUCCEEDED"))),
        )
        .route(
            "/v2/acts/{actor_id}/runs/last/dataset",
            get(respond("last-run-dataset", Kind::Item)),
        )
        .route(
            "/v2/acts/{actor_id}/runs/last/key-value-store",
            get(respond("last-run-keyValueStore", Kind::Item)),
        )
        .route(
            "/v2/acts/{actor_id}/runs/last/request-queue",
            get(respond("last-run-requestQueue", Kind::Item)),
        )
        .route(
            "/v2/acts/{actor_id}/runs/last/log",
            get(respond("last-run-log", Kind::Text)),
        )
        .route(
            "/v2/acts/{actor_id}/runs/{run_id}",
            get(respond("get-run", Kind::RunById("RUNNING"))),
        )
        .route(
            "/v2/acts/{actor_id}/builds",
            get(respond("list-builds", Kind::List)).post(respond("build-actor", Kind::Item)),
        )
        .route(
            "/v2/acts/{actor_id}/versions",
            get(respond("list-actor-versions", Kind::List))
                .post(respond("create-actor-version", Kind::Item)),
        )
        .route(
            "/v2/acts/{actor_id}/versions/{version_number}",
            get(respond("get-actor-version", Kind::Item))
                .put(respond("update-actor-version", Kind::Item))
                .delete(respond("delete-actor-version", Kind::Delete)),
        )
        .route(
            "/v2/acts/{actor_id}/webhooks",
            get(respond("list-webhooks", Kind::List)),
        )
        .route(
            "/v2/actor-runs/{run_id}",
            get(respond("get-run", Kind::RunById("RUNNING"))),
        )
        .route(
            "/v2/actor-runs/{run_id}/abort",
            post(respond("abort-run", Kind::Run("ABORTED"))),
        )
        .with_state(state)
}

/// Running mock backend; shut down on drop.
pub struct MockServer {
    base_url: String,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let addr = listener.local_addr().expect("mock server has no address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server crashed");
        });

        Self {
            base_url: format!("http://{addr}/v2"),
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configuration the tests use: default token, no retries, fast polling.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url)
            .with_token(DEFAULT_TOKEN)
            .with_max_retries(0)
            .with_poll_interval_ms(50)
    }

    /// Two independently configured bindings to the same backend: the
    /// default transport, and one around a caller-built `reqwest` client.
    pub fn clients(&self) -> [ApifyClient; 2] {
        let direct = ApifyClient::new(self.config()).expect("failed to build client");
        let http = reqwest::Client::builder()
            .user_agent("second-execution-context")
            .http1_only()
            .build()
            .expect("failed to build reqwest client");
        let custom =
            ApifyClient::with_http_client(self.config(), http).expect("failed to build client");
        [direct, custom]
    }

    /// Queue a reply for the endpoint labelled `label`; used once.
    pub fn set_response(&self, label: &'static str, response: MockResponse) {
        self.state
            .overrides
            .lock()
            .unwrap()
            .entry(label)
            .or_default()
            .push_back(response);
    }

    /// Requests received since the last call, oldest first.
    pub fn take_requests(&self) -> Vec<RecordedRequest> {
        std::mem::take(&mut *self.state.requests.lock().unwrap())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run `op` through both client bindings, check the requests each one sent,
/// and assert both produced the same value.
pub async fn in_both_contexts<T, F, Fut, C>(mock: &MockServer, op: F, check: C) -> T
where
    F: Fn(ApifyClient) -> Fut,
    Fut: Future<Output = apify_client::Result<T>>,
    C: Fn(&[RecordedRequest]),
    T: PartialEq + Debug,
{
    let mut results = Vec::new();
    for client in mock.clients() {
        let result = op(client).await.expect("operation failed");
        check(&mock.take_requests());
        results.push(result);
    }
    let second = results.pop().expect("second context result");
    let first = results.pop().expect("first context result");
    assert_eq!(first, second, "execution contexts disagree");
    first
}

/// The single request in `requests`.
pub fn only(requests: &[RecordedRequest]) -> &RecordedRequest {
    assert_eq!(requests.len(), 1, "expected exactly one request: {requests:?}");
    &requests[0]
}
