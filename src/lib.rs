//! Client for the actors resource of the Apify API v2.
//!
//! Scoped clients are cheap immutable values. Each one carries the path it
//! was reached through and shares a single [`Transport`]:
//!
//! ```rust,no_run
//! use apify_client::{ApifyClient, CallOptions, ClientConfig, RunInput, StartOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApifyClient::new(ClientConfig::default().with_token("my-token"))?;
//!
//!     let actor = client.actor("apify/hello-world");
//!     let run = actor
//!         .call(&CallOptions {
//!             start: StartOptions {
//!                 input: Some(RunInput::Json(serde_json::json!({ "message": "hi" }))),
//!                 memory: Some(256),
//!                 ..StartOptions::default()
//!             },
//!             wait_secs: Some(60),
//!             ..CallOptions::default()
//!         })
//!         .await?;
//!     println!("{} finished with {}", run.id, run.status);
//!
//!     if let Some(version) = actor.version("0.0").get().await? {
//!         println!("build tag: {:?}", version.build_tag);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`actors`]: `/acts` and `/acts/{id}`, including start/call/build
//! - [`runs`]: runs, the last run, and run storages and logs
//! - [`versions`], [`builds`], [`webhooks`]: actor sub-resources
//! - [`http`]: the transport seam and its `reqwest` implementation
//! - [`config`]: layered client configuration

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::default_trait_access)]

pub mod actors;
pub mod builds;
pub mod config;
pub mod error;
pub mod http;
pub mod resource;
pub mod runs;
pub mod types;
pub mod versions;
mod waiter;
pub mod webhooks;

use std::sync::Arc;
use std::time::Duration;

pub use actors::{ActorClient, ActorCollectionClient};
pub use builds::BuildCollectionClient;
pub use config::{ClientConfig, ConnectionArgs};
pub use error::{Error, Result};
pub use http::{ApiRequest, ApiResponse, HttpTransport, RequestBody, Transport};
pub use resource::{ResourcePath, to_safe_id};
pub use runs::{
    DatasetClient, KeyValueStoreClient, LogClient, RequestQueueClient, RunClient,
    RunCollectionClient, StorageClient,
};
pub use types::*;
pub use versions::{ActorVersionClient, ActorVersionCollectionClient};
pub use waiter::MAX_WAIT_FOR_FINISH_SECS;
pub use webhooks::{
    WebhookCollectionClient, WebhookDefinition, WebhookEventType, stringify_webhooks_to_base64,
};

use resource::ResourceContext;

/// Entry point of the client.
///
/// Holds no per-call state; clone it or share it freely across tasks.
#[derive(Debug, Clone)]
pub struct ApifyClient {
    transport: Arc<dyn Transport>,
    poll_interval: Duration,
}

impl ApifyClient {
    /// Create a client with a `reqwest` transport built from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Create a client around a caller-supplied `reqwest` client.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Result<Self> {
        let transport = HttpTransport::with_client(&config, http)?;
        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Create a client on top of any [`Transport`].
    ///
    /// Only `poll_interval_ms` is read from `config`; the transport owns the rest.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            poll_interval: config.poll_interval(),
        }
    }

    fn context(&self, segment: &str) -> ResourceContext {
        ResourceContext::new(
            Arc::clone(&self.transport),
            ResourcePath::root(segment),
            self.poll_interval,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// All actors.
    pub fn actors(&self) -> ActorCollectionClient {
        ActorCollectionClient::new(self.context("acts"))
    }

    /// One actor, by ID or `username/actor-name`.
    pub fn actor(&self, id: &str) -> ActorClient {
        ActorClient::new(&self.context("acts"), id)
    }

    /// One run, by ID.
    pub fn run(&self, id: &str) -> RunClient {
        RunClient::new(self.context("actor-runs").child(id))
    }
}
