//! Builds of an actor.

use crate::error::Result;
use crate::resource::ResourceContext;
use crate::types::{Build, ListOptions, PaginationList};

/// Builds of an actor: `/acts/{id}/builds`.
#[derive(Debug, Clone)]
pub struct BuildCollectionClient {
    ctx: ResourceContext,
}

impl BuildCollectionClient {
    pub(crate) fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, options: &ListOptions) -> Result<PaginationList<Build>> {
        self.ctx.list(options).await
    }
}
