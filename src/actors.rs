//! Actors: the collection and single-actor clients.

use serde::Serialize;
use tracing::debug;

use crate::builds::BuildCollectionClient;
use crate::error::Result;
use crate::http::{RequestBody, query_pairs};
use crate::resource::{ResourceContext, to_safe_id};
use crate::runs::{RunClient, RunCollectionClient};
use crate::types::{
    Actor, Build, BuildOptions, CallOptions, LastRunOptions, ListActorsOptions, PaginationList,
    Run, RunInput, StartOptions,
};
use crate::versions::{ActorVersionClient, ActorVersionCollectionClient};
use crate::waiter::RunWaiter;
use crate::webhooks::{WebhookCollectionClient, stringify_webhooks_to_base64};

// =============================================================================
// Collection
// =============================================================================

/// All actors: `/acts`.
#[derive(Debug, Clone)]
pub struct ActorCollectionClient {
    ctx: ResourceContext,
}

impl ActorCollectionClient {
    pub(crate) fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, options: &ListActorsOptions) -> Result<PaginationList<Actor>> {
        self.ctx.list(options).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, actor: &B) -> Result<Actor> {
        self.ctx.create(actor).await
    }
}

// =============================================================================
// Single actor
// =============================================================================

/// Query of the start request. Input travels in the body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhooks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_finish: Option<u64>,
}

/// One actor: `/acts/{id}`.
///
/// The identifier is made path-safe once, here; every request and sub-resource
/// scoped to this actor uses the normalized form.
#[derive(Debug, Clone)]
pub struct ActorClient {
    id: String,
    ctx: ResourceContext,
}

impl ActorClient {
    pub(crate) fn new(collection: &ResourceContext, id: &str) -> Self {
        let id = to_safe_id(id);
        Self {
            ctx: collection.child(id.clone()),
            id,
        }
    }

    /// The normalized identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn get(&self) -> Result<Option<Actor>> {
        self.ctx.get(Vec::new()).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, fields: &B) -> Result<Actor> {
        self.ctx.update(fields).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.ctx.delete().await
    }

    /// Start a run and return it right away, without waiting for it.
    pub async fn start(&self, options: &StartOptions) -> Result<Run> {
        let webhooks = options
            .webhooks
            .as_deref()
            .map(stringify_webhooks_to_base64)
            .transpose()?;
        let query = StartQuery {
            timeout: options.timeout,
            memory: options.memory,
            build: options.build.as_deref(),
            webhooks,
            wait_for_finish: options.wait_for_finish,
        };
        let body = options.input.as_ref().map(|input| match input {
            RunInput::Json(value) => RequestBody::Json(value.clone()),
            RunInput::Raw { content_type, body } => RequestBody::Raw {
                content_type: content_type.clone(),
                body: body.clone(),
            },
        });

        let run: Run = self.ctx.child("runs").post(query_pairs(&query)?, body).await?;
        debug!(name: "actor.run.started", actor_id = %self.id, run_id = %run.id, "Run started");
        Ok(run)
    }

    /// Start a run and wait for it to finish.
    ///
    /// Returns the latest run record once the run is terminal or the wait
    /// budget is spent, whichever comes first. An unfinished run is left
    /// running. Unsuccessful terminal runs are returned as-is unless
    /// [`crate::FailurePolicy::Error`] is set.
    pub async fn call(&self, options: &CallOptions) -> Result<Run> {
        let started = self.start(&options.start).await?;
        let run = self.run(&started.id);
        let outcome = RunWaiter::new(run, options.wait_secs, options.cancel.as_ref())
            .wait(started)
            .await?;
        outcome.into_result(options.failure_policy)
    }

    /// Build the actor.
    pub async fn build(&self, options: &BuildOptions) -> Result<Build> {
        self.ctx
            .child("builds")
            .post(query_pairs(options)?, None)
            .await
    }

    pub fn builds(&self) -> BuildCollectionClient {
        BuildCollectionClient::new(self.ctx.child("builds"))
    }

    pub fn runs(&self) -> RunCollectionClient {
        RunCollectionClient::new(self.ctx.child("runs"))
    }

    /// One run of this actor: `/acts/{id}/runs/{runId}`.
    pub fn run(&self, run_id: &str) -> RunClient {
        RunClient::new(self.ctx.child("runs").child(run_id))
    }

    /// The most recent run, optionally of a given status. The status filter
    /// also applies to the run's storages and log.
    pub fn last_run(&self, options: &LastRunOptions) -> RunClient {
        let query = options
            .status
            .as_ref()
            .map(|status| ("status".to_string(), status.as_str().to_string()))
            .into_iter()
            .collect();
        RunClient::new(self.ctx.child("runs").child("last").with_base_query(query))
    }

    pub fn versions(&self) -> ActorVersionCollectionClient {
        ActorVersionCollectionClient::new(self.ctx.child("versions"))
    }

    pub fn version(&self, version_number: &str) -> ActorVersionClient {
        ActorVersionClient::new(self.ctx.child("versions").child(version_number))
    }

    pub fn webhooks(&self) -> WebhookCollectionClient {
        WebhookCollectionClient::new(self.ctx.child("webhooks"))
    }
}
