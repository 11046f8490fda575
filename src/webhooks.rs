//! Webhooks: ad-hoc definitions attached to a run, and an actor's registered webhooks.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resource::ResourceContext;
use crate::types::{ListOptions, PaginationList, Webhook};

/// Event a webhook can fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "ACTOR.RUN.CREATED")]
    ActorRunCreated,
    #[serde(rename = "ACTOR.RUN.SUCCEEDED")]
    ActorRunSucceeded,
    #[serde(rename = "ACTOR.RUN.FAILED")]
    ActorRunFailed,
    #[serde(rename = "ACTOR.RUN.TIMED_OUT")]
    ActorRunTimedOut,
    #[serde(rename = "ACTOR.RUN.ABORTED")]
    ActorRunAborted,
    #[serde(rename = "ACTOR.RUN.RESURRECTED")]
    ActorRunResurrected,
    #[serde(rename = "ACTOR.BUILD.CREATED")]
    ActorBuildCreated,
    #[serde(rename = "ACTOR.BUILD.SUCCEEDED")]
    ActorBuildSucceeded,
    #[serde(rename = "ACTOR.BUILD.FAILED")]
    ActorBuildFailed,
    #[serde(rename = "ACTOR.BUILD.TIMED_OUT")]
    ActorBuildTimedOut,
    #[serde(rename = "ACTOR.BUILD.ABORTED")]
    ActorBuildAborted,
}

/// A webhook to attach to a single run.
///
/// Serialized field order is the declaration order; unset optionals are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDefinition {
    pub event_types: Vec<WebhookEventType>,
    pub request_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl WebhookDefinition {
    pub fn new(event_types: Vec<WebhookEventType>, request_url: impl Into<String>) -> Self {
        Self {
            event_types,
            request_url: request_url.into(),
            payload_template: None,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn with_payload_template(mut self, template: impl Into<String>) -> Self {
        self.payload_template = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Encode webhook definitions for the `webhooks` query parameter.
///
/// Compact JSON, then standard padded base64. Same list in the same order,
/// same string.
pub fn stringify_webhooks_to_base64(webhooks: &[WebhookDefinition]) -> Result<String> {
    let json = serde_json::to_string(webhooks)?;
    Ok(STANDARD.encode(json))
}

/// Webhooks registered on an actor.
#[derive(Debug, Clone)]
pub struct WebhookCollectionClient {
    ctx: ResourceContext,
}

impl WebhookCollectionClient {
    pub(crate) fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, options: &ListOptions) -> Result<PaginationList<Webhook>> {
        self.ctx.list(options).await
    }
}
