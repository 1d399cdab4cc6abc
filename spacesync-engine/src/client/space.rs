//! Space client abstraction.
//!
//! Defines the capability surface the engines consume. Implementations
//! route every call to the remote backend; tests substitute in-process
//! doubles.

use crate::error::SyncResult;
use async_trait::async_trait;
use spacesync_types::{Entity, ResourceKind};
use std::sync::Arc;

/// Query for collection list endpoints.
///
/// The only filter the engines use is `sys.id[in]`, a comma-joined id
/// run whose length the batch query engine bounds before it gets here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    ids: Option<String>,
}

impl ListQuery {
    /// Query filtering on an already comma-joined id run.
    ///
    /// The caller is responsible for the run being within the remote's
    /// query-length limit and not trailing-comma-terminated.
    #[must_use]
    pub fn by_ids_joined(ids: impl Into<String>) -> Self {
        Self {
            ids: Some(ids.into()),
        }
    }

    /// The raw `sys.id[in]` filter value, when one is set.
    #[must_use]
    pub fn ids_filter(&self) -> Option<&str> {
        self.ids.as_deref()
    }

    /// Renders the query as request parameters.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ids) = &self.ids {
            params.push(("sys.id[in]", ids.clone()));
        }
        params
    }
}

/// Capability surface of one space.
///
/// `update` must be seeded with the destination entity's current
/// version; the backend rejects stale versions with a conflict.
#[async_trait]
pub trait SpaceClient: Send + Sync {
    /// Lists resources of `kind` matching `query`.
    async fn list(&self, kind: ResourceKind, query: &ListQuery) -> SyncResult<Vec<Entity>>;

    /// Creates a resource, at an explicit id when one is given.
    async fn create(
        &self,
        kind: ResourceKind,
        id: Option<&str>,
        entity: &Entity,
    ) -> SyncResult<Entity>;

    /// Updates the resource at `id`, seeded with `version`.
    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        version: u64,
        entity: &Entity,
    ) -> SyncResult<Entity>;
}

/// Entry point for resolving spaces.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Resolves a space by id. Fails with `SyncError::SpaceNotFound`
    /// when the space does not exist.
    async fn space(&self, space_id: &str) -> SyncResult<Arc<dyn SpaceClient>>;
}
