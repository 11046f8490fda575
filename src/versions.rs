//! Source versions of an actor.

use serde::Serialize;

use crate::error::Result;
use crate::resource::ResourceContext;
use crate::types::{ActorVersion, PaginationList};

/// Versions of an actor: `/acts/{id}/versions`.
#[derive(Debug, Clone)]
pub struct ActorVersionCollectionClient {
    ctx: ResourceContext,
}

impl ActorVersionCollectionClient {
    pub(crate) fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    /// List all versions. The backend does not paginate versions.
    pub async fn list(&self) -> Result<PaginationList<ActorVersion>> {
        self.ctx.list(&()).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, version: &B) -> Result<ActorVersion> {
        self.ctx.create(version).await
    }
}

/// A single version: `/acts/{id}/versions/{versionNumber}`.
#[derive(Debug, Clone)]
pub struct ActorVersionClient {
    ctx: ResourceContext,
}

impl ActorVersionClient {
    pub(crate) fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    pub async fn get(&self) -> Result<Option<ActorVersion>> {
        self.ctx.get(Vec::new()).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, fields: &B) -> Result<ActorVersion> {
        self.ctx.update(fields).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.ctx.delete().await
    }
}
