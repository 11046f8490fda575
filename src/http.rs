//! HTTP transport.
//!
//! Resource clients describe requests as [`ApiRequest`] values and hand them to
//! a [`Transport`]. The transport owns everything below that line: URL
//! assembly, default query parameters, body encoding, and retries. It never
//! interprets status codes beyond deciding whether to retry, so error responses
//! reach the resource layer as plain [`ApiResponse`]s.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::resource::ResourcePath;

/// Longest single backoff step, as a power of two of the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

// =============================================================================
// Requests & Responses
// =============================================================================

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `content-type: application/json`.
    Json(Value),
    /// Sent verbatim with the given content type.
    Raw {
        /// Value of the `content-type` header.
        content_type: String,
        /// Body bytes.
        body: Vec<u8>,
    },
}

/// A request, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: ResourcePath,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, path: ResourcePath) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    /// Append query pairs.
    #[must_use]
    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response as received, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Convert a non-success response into [`Error::Api`].
    ///
    /// Uses the API's `{"error": {"type", "message"}}` body when present and
    /// falls back to the raw text otherwise.
    pub fn into_error(self) -> Error {
        let (error_type, message) = match serde_json::from_slice::<ErrorBody>(&self.body) {
            Ok(ErrorBody { error }) => (error.error_type, error.message.unwrap_or_default()),
            Err(_) => (None, self.text()),
        };
        let message = if message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            message
        };
        Error::Api {
            status: self.status,
            error_type,
            message,
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Sends [`ApiRequest`]s and returns the raw responses.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// [`Transport`] backed by `reqwest`, with retries on network errors,
/// `429` and `5xx` responses.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    http: reqwest::Client,
    default_query: Vec<(String, String)>,
    max_retries: u32,
    min_delay: Duration,
}

impl HttpTransport {
    /// Create a transport with a `reqwest` client built from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("apify-client-rust/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(config, http)
    }

    /// Create a transport around a caller-supplied `reqwest` client.
    ///
    /// The client's own timeout and headers apply; everything else comes from
    /// `config`.
    pub fn with_client(config: &ClientConfig, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidRequest(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }
        Ok(Self {
            base_url,
            http,
            default_query: config.default_query_pairs(),
            max_retries: config.max_retries,
            min_delay: config.min_delay_between_retries(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                Error::InvalidRequest(format!("base URL {} cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty();
            segments.extend(request.path.segments());
        }
        if !self.default_query.is_empty() || !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.default_query.iter())
                .extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.min_delay.saturating_mul(1 << exponent)
    }

    async fn send_once(&self, request: &ApiRequest, url: &Url) -> Result<ApiResponse> {
        let mut builder = self.http.request(request.method.clone(), url.clone());
        match &request.body {
            Some(RequestBody::Json(value)) => builder = builder.json(value),
            Some(RequestBody::Raw { content_type, body }) => {
                builder = builder
                    .header(CONTENT_TYPE, content_type.as_str())
                    .body(body.clone());
            }
            None => {}
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?.to_vec();

        debug!(name: "http.response", status, bytes = body.len(), "Received response");
        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(
                name: "http.request",
                method = %request.method,
                url = %url,
                attempt,
                "Sending request"
            );

            let outcome = self.send_once(&request, &url).await;
            let retryable = match &outcome {
                Ok(response) => response.status == 429 || response.status >= 500,
                Err(err) => matches!(err, Error::Http(_)),
            };
            if !retryable || attempt > self.max_retries {
                return outcome;
            }

            let delay = self.retry_delay(attempt);
            match &outcome {
                Ok(response) => warn!(
                    name: "http.retry",
                    status = response.status,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying request"
                ),
                Err(err) => warn!(
                    name: "http.retry",
                    error = %err,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying request"
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }
}

// =============================================================================
// Query encoding
// =============================================================================

/// Flatten an options struct into query pairs.
///
/// Strings are sent as-is, numbers and booleans in their JSON spelling, and
/// nested values as compact JSON. `null` fields, and `()`, produce nothing.
pub(crate) fn query_pairs<T: Serialize>(options: &T) -> Result<Vec<(String, String)>> {
    let fields = match serde_json::to_value(options)? {
        Value::Object(fields) => fields,
        Value::Null => return Ok(Vec::new()),
        _ => {
            return Err(Error::InvalidRequest(
                "query options must serialize to an object".to_string(),
            ));
        }
    };
    Ok(fields
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((key, value))
        })
        .collect())
}
