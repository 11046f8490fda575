//! Runs: listing, single runs, and the storages and log a run owns.

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::resource::ResourceContext;
use crate::types::{
    Dataset, KeyValueStore, ListRunsOptions, PaginationList, RequestQueue, Run,
};
use crate::waiter::{RunWaiter, WaitOutcome};

/// Runs of an actor.
#[derive(Debug, Clone)]
pub struct RunCollectionClient {
    ctx: ResourceContext,
}

impl RunCollectionClient {
    pub(crate) fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, options: &ListRunsOptions) -> Result<PaginationList<Run>> {
        self.ctx.list(options).await
    }
}

/// A single run: `/actor-runs/{id}`, `/acts/{actor}/runs/{id}` or an actor's last run.
#[derive(Debug, Clone)]
pub struct RunClient {
    ctx: ResourceContext,
}

impl RunClient {
    pub(crate) fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    /// Path of the run, relative to the API base URL.
    pub fn path(&self) -> String {
        self.ctx.path().to_string()
    }

    /// Last path segment: the run ID, or `last` for an actor's last run.
    pub fn id(&self) -> &str {
        self.ctx
            .path()
            .segments()
            .last()
            .map_or("", String::as_str)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.ctx.poll_interval()
    }

    pub async fn get(&self) -> Result<Option<Run>> {
        self.ctx.get(Vec::new()).await
    }

    /// Fetch the run, letting the backend hold the request up to `secs`
    /// seconds for it to finish.
    pub(crate) async fn get_waiting(&self, secs: u64) -> Result<Option<Run>> {
        self.ctx
            .get(vec![("waitForFinish".to_string(), secs.to_string())])
            .await
    }

    /// Abort the run and return its updated record.
    pub async fn abort(&self) -> Result<Run> {
        self.ctx.child("abort").post(Vec::new(), None).await
    }

    /// Wait for the run to finish, at most `wait_secs` seconds (`None` or `0`
    /// waits indefinitely). Returns the latest run record either way.
    pub async fn wait_for_finish(&self, wait_secs: Option<u64>) -> Result<Run> {
        let run = self.get().await?.ok_or_else(|| Error::RunNotFound {
            run_id: self.id().to_string(),
        })?;
        let outcome = RunWaiter::new(self.clone(), wait_secs, None).wait(run).await?;
        Ok(match outcome {
            WaitOutcome::Finished(run) | WaitOutcome::TimedOut(run) => run,
        })
    }

    pub fn dataset(&self) -> DatasetClient {
        StorageClient::new(self.ctx.child("dataset"))
    }

    pub fn key_value_store(&self) -> KeyValueStoreClient {
        StorageClient::new(self.ctx.child("key-value-store"))
    }

    pub fn request_queue(&self) -> RequestQueueClient {
        StorageClient::new(self.ctx.child("request-queue"))
    }

    pub fn log(&self) -> LogClient {
        LogClient {
            ctx: self.ctx.child("log"),
        }
    }
}

/// A storage owned by a run.
#[derive(Debug, Clone)]
pub struct StorageClient<T> {
    ctx: ResourceContext,
    record: PhantomData<fn() -> T>,
}

pub type DatasetClient = StorageClient<Dataset>;
pub type KeyValueStoreClient = StorageClient<KeyValueStore>;
pub type RequestQueueClient = StorageClient<RequestQueue>;

impl<T: DeserializeOwned> StorageClient<T> {
    fn new(ctx: ResourceContext) -> Self {
        Self {
            ctx,
            record: PhantomData,
        }
    }

    pub async fn get(&self) -> Result<Option<T>> {
        self.ctx.get(Vec::new()).await
    }
}

/// Log of a run, as plain text.
#[derive(Debug, Clone)]
pub struct LogClient {
    ctx: ResourceContext,
}

impl LogClient {
    pub async fn get(&self) -> Result<Option<String>> {
        self.ctx.get_text().await
    }
}
