//! Shared plumbing for the scoped resource clients.
//!
//! Every scoped client is an immutable value wrapping a [`ResourceContext`]:
//! the transport, the accumulated path, and query pairs that apply to all of
//! its requests. Sub-resource accessors build new contexts by extension.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::http::{ApiRequest, ApiResponse, RequestBody, Transport, query_pairs};
use crate::types::{Envelope, PaginationList};

/// Make an identifier usable as a single path segment.
///
/// The owner qualifier in `username/actor-name` becomes `username~actor-name`.
pub fn to_safe_id(id: &str) -> String {
    id.replacen('/', "~", 1)
}

/// Path of a resource, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn root(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// This path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResourceContext {
    transport: Arc<dyn Transport>,
    path: ResourcePath,
    query: Vec<(String, String)>,
    poll_interval: Duration,
}

impl ResourceContext {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        path: ResourcePath,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            path,
            query: Vec::new(),
            poll_interval,
        }
    }

    pub(crate) fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Context for a nested resource. Inherits the base query.
    pub(crate) fn child(&self, segment: impl Into<String>) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            path: self.path.child(segment),
            query: self.query.clone(),
            poll_interval: self.poll_interval,
        }
    }

    /// Same resource, with extra query pairs on every request.
    pub(crate) fn with_base_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub(crate) fn request(&self, method: Method) -> ApiRequest {
        ApiRequest::new(method, self.path.clone()).with_query(self.query.iter().cloned())
    }

    pub(crate) async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.transport.send(request).await
    }

    /// `GET` a single record; `404` yields `None`.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        query: Vec<(String, String)>,
    ) -> Result<Option<T>> {
        let response = self.send(self.request(Method::GET).with_query(query)).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        decode(response).map(Some)
    }

    /// `GET` a plain-text resource; `404` yields `None`.
    pub(crate) async fn get_text(&self) -> Result<Option<String>> {
        let response = self.send(self.request(Method::GET)).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(response.into_error());
        }
        Ok(Some(response.text()))
    }

    pub(crate) async fn list<T, O>(&self, options: &O) -> Result<PaginationList<T>>
    where
        T: DeserializeOwned,
        O: Serialize,
    {
        let request = self.request(Method::GET).with_query(query_pairs(options)?);
        decode(self.send(request).await?)
    }

    pub(crate) async fn create<T, B>(&self, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = RequestBody::Json(serde_json::to_value(body)?);
        decode(self.send(self.request(Method::POST).with_body(body)).await?)
    }

    pub(crate) async fn update<T, B>(&self, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = RequestBody::Json(serde_json::to_value(body)?);
        decode(self.send(self.request(Method::PUT).with_body(body)).await?)
    }

    /// `DELETE` the resource. Deleting something already gone is not an error.
    pub(crate) async fn delete(&self) -> Result<()> {
        let response = self.send(self.request(Method::DELETE)).await?;
        if response.is_success() || response.is_not_found() {
            Ok(())
        } else {
            Err(response.into_error())
        }
    }

    /// `POST` with query pairs and an optional body, decoding the created record.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        query: Vec<(String, String)>,
        body: Option<RequestBody>,
    ) -> Result<T> {
        let mut request = self.request(Method::POST).with_query(query);
        request.body = body;
        decode(self.send(request).await?)
    }
}

/// Unwrap the `data` envelope of a successful response.
pub(crate) fn decode<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
    if !response.is_success() {
        return Err(response.into_error());
    }
    let envelope: Envelope<T> = response.json()?;
    Ok(envelope.data)
}
