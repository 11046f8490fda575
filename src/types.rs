//! Records returned by the API and the per-operation option structs.
//!
//! Records keep the fields this crate interprets as typed members and carry
//! everything else verbatim in `extra`, so nothing the backend sends is lost.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::webhooks::WebhookDefinition;

// =============================================================================
// Envelope & Pagination
// =============================================================================

/// Wrapper the API puts around every JSON response body.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationList<T> {
    /// Total number of items in the collection.
    #[serde(default)]
    pub total: u64,
    /// Offset of the first returned item.
    #[serde(default)]
    pub offset: u64,
    /// Page size the backend applied.
    #[serde(default)]
    pub limit: u64,
    /// Number of items on this page.
    #[serde(default)]
    pub count: u64,
    /// Whether the listing is sorted newest first.
    #[serde(default)]
    pub desc: bool,
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

// =============================================================================
// Records
// =============================================================================

/// An actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Unique identifier.
    pub id: String,
    /// Technical name, unique per owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owner's user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A version of an actor's source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorVersion {
    /// Version number in `MAJOR.MINOR` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_number: Option<String>,
    /// Tag applied to builds of this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_tag: Option<String>,
    /// Where the source lives (`SOURCE_FILES`, `GIT_REPO`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A build of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Unique identifier.
    pub id: String,
    /// Actor the build belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub act_id: Option<String>,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    /// Build number (e.g. `0.0.12`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A run of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Unique identifier.
    pub id: String,
    /// Actor the run belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub act_id: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: RunStatus,
    /// Start timestamp (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// Finish timestamp (RFC 3339), once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Build the run was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    /// Default dataset of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_dataset_id: Option<String>,
    /// Default key-value store of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_key_value_store_id: Option<String>,
    /// Default request queue of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_request_queue_id: Option<String>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A webhook registered on an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    /// Unique identifier.
    pub id: String,
    /// Events the webhook fires on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_types: Vec<String>,
    /// Target URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Unique identifier.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A key-value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueStore {
    /// Unique identifier.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A request queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQueue {
    /// Unique identifier.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_request_count: Option<u64>,
    /// Remaining fields, as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Run Status
// =============================================================================

/// Lifecycle status shared by runs and builds.
///
/// Travels as its wire name (`"TIMED-OUT"`). Names this client does not know
/// are kept verbatim in [`RunStatus::Unknown`] and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    #[default]
    Ready,
    Running,
    Succeeded,
    Failed,
    TimingOut,
    TimedOut,
    Aborting,
    Aborted,
    /// A status this client does not know about. Treated as non-terminal.
    Unknown(String),
}

impl RunStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::TimingOut => "TIMING-OUT",
            Self::TimedOut => "TIMED-OUT",
            Self::Aborting => "ABORTING",
            Self::Aborted => "ABORTED",
            Self::Unknown(name) => name,
        }
    }

    /// Whether the job can no longer change status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Aborted
        )
    }

    /// Whether the job finished, but not successfully.
    pub fn is_unsuccessful(&self) -> bool {
        self.is_terminal() && *self != Self::Succeeded
    }
}

impl From<String> for RunStatus {
    fn from(name: String) -> Self {
        match name.as_str() {
            "READY" => Self::Ready,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "TIMING-OUT" => Self::TimingOut,
            "TIMED-OUT" => Self::TimedOut,
            "ABORTING" => Self::Aborting,
            "ABORTED" => Self::Aborted,
            _ => Self::Unknown(name),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Options
// =============================================================================

/// Options for listing actors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActorsOptions {
    /// Maximum number of items to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Number of items to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Sort newest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<bool>,
    /// Only list actors owned by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my: Option<bool>,
}

/// Pagination options shared by builds, versions and webhooks listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Maximum number of items to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Number of items to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Sort newest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<bool>,
}

/// Options for listing runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRunsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<bool>,
    /// Only list runs with this status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
}

/// Options for scoping to an actor's last run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRunOptions {
    /// Only consider runs with this status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
}

/// Options for building an actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    /// Version of the actor to build.
    #[serde(rename = "version", skip_serializing_if = "Option::is_none")]
    pub version_number: Option<String>,
    /// Build with beta versions of the platform packages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_packages: Option<bool>,
    /// Tag to apply to the build.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Reuse cached image layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_cache: Option<bool>,
    /// Seconds the backend should hold the request waiting for the build.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_finish: Option<u64>,
}

/// Input payload of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunInput {
    /// A JSON document, sent as `application/json`.
    Json(Value),
    /// Opaque bytes with an explicit content type.
    Raw {
        /// Value of the `content-type` header.
        content_type: String,
        /// Body bytes.
        body: Vec<u8>,
    },
}

impl RunInput {
    /// Content type used by [`RunInput::text`].
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded";

    /// Raw text input with the default form content type.
    pub fn text(body: impl Into<String>) -> Self {
        Self::raw(Self::DEFAULT_CONTENT_TYPE, body.into().into_bytes())
    }

    /// Raw input with an explicit content type.
    pub fn raw(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::Raw {
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

/// Options for starting a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartOptions {
    /// Input payload, sent as the request body.
    pub input: Option<RunInput>,
    /// Run timeout in seconds.
    pub timeout: Option<u64>,
    /// Memory limit in megabytes.
    pub memory: Option<u32>,
    /// Build tag or number to run.
    pub build: Option<String>,
    /// Ad-hoc webhooks for this run only.
    pub webhooks: Option<Vec<WebhookDefinition>>,
    /// Seconds the backend should hold the start request waiting for the run.
    pub wait_for_finish: Option<u64>,
}

/// What [`crate::ActorClient::call`] does when a run ends unsuccessfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the run whatever its terminal status; callers inspect `status`.
    #[default]
    ReturnRun,
    /// Turn `FAILED`, `ABORTED` and `TIMED-OUT` runs into [`crate::Error::RunFailed`].
    Error,
}

/// Options for starting a run and waiting for it.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Options forwarded to the start request.
    pub start: StartOptions,
    /// Wait budget in seconds. `None` or `0` waits until the run finishes.
    pub wait_secs: Option<u64>,
    /// Handling of unsuccessful terminal runs.
    pub failure_policy: FailurePolicy,
    /// Parent token; cancelling it stops the wait early.
    pub cancel: Option<tokio_util::sync::CancellationToken>,
}

impl From<StartOptions> for CallOptions {
    fn from(start: StartOptions) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }
}
