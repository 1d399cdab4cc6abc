//! Destination-state fetching.
//!
//! Resolves the destination space and fetches the resources whose ids
//! the source export names, so the creation engine can decide between
//! create and update. Id lists routinely run to thousands of entries
//! while the remote bounds the query-string length, so lookups are
//! split into the fewest batches that fit the ceiling and issued
//! concurrently.

use crate::client::{ListQuery, ManagementClient, SpaceClient};
use crate::error::SyncResult;
use futures::future::try_join_all;
use spacesync_types::{Entity, ResourceKind};
use tracing::debug;

/// Default ceiling on the serialized `sys.id[in]` filter, bounded by
/// the remote's GET request length limit.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 2100;

/// Partitions `ids` into the fewest comma-joined runs that each stay
/// under `max_query_length`.
///
/// Runs never end in a comma. Ids keep their input order; a single id
/// longer than the ceiling still gets a run of its own (it cannot be
/// split, and the remote will reject it with a normal error).
#[must_use]
pub fn batch_queries(ids: &[String], max_query_length: usize) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current = String::new();

    for id in ids {
        if current.is_empty() {
            current.push_str(id);
        } else if current.len() + 1 + id.len() < max_query_length {
            current.push(',');
            current.push_str(id);
        } else {
            batches.push(std::mem::take(&mut current));
            current.push_str(id);
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

/// Fetches every entity in `ids` from one collection, one list request
/// per batch, all batches in flight concurrently.
///
/// Results are concatenated in batch submission order (not network
/// completion order); ordering across batches is otherwise undefined.
/// Any batch failure fails the whole call.
pub async fn fetch_all(
    space: &dyn SpaceClient,
    kind: ResourceKind,
    ids: &[String],
    max_query_length: usize,
) -> SyncResult<Vec<Entity>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let batches = batch_queries(ids, max_query_length);
    debug!(
        "Fetching {} {} ids in {} batches",
        ids.len(),
        kind,
        batches.len()
    );

    let calls = batches.into_iter().map(|joined| {
        let query = ListQuery::by_ids_joined(joined);
        async move { space.list(kind, &query).await }
    });

    let per_batch = try_join_all(calls).await?;
    Ok(per_batch.into_iter().flatten().collect())
}

/// Ids present in the source export, per resource kind.
#[derive(Debug, Clone, Default)]
pub struct SourceIds {
    pub content_types: Vec<String>,
    pub entries: Vec<String>,
    pub assets: Vec<String>,
}

/// Current destination state for the resources a migration touches.
#[derive(Debug, Default)]
pub struct DestinationContent {
    pub content_types: Vec<Entity>,
    pub entries: Vec<Entity>,
    pub assets: Vec<Entity>,
    pub locales: Vec<Entity>,
}

/// Resolves the destination space and fetches its current state for
/// the given source ids.
///
/// A failed space lookup rejects the whole operation before any
/// collection is queried; partial results are meaningless without a
/// space. Locales are listed without an id filter since spaces hold
/// few of them and the backend does not index them by id.
pub async fn destination_content(
    management: &dyn ManagementClient,
    space_id: &str,
    ids: &SourceIds,
    max_query_length: usize,
) -> SyncResult<DestinationContent> {
    let space = management.space(space_id).await?;

    let locale_query = ListQuery::default();
    let (content_types, entries, assets, locales) = tokio::try_join!(
        fetch_all(&*space, ResourceKind::ContentType, &ids.content_types, max_query_length),
        fetch_all(&*space, ResourceKind::Entry, &ids.entries, max_query_length),
        fetch_all(&*space, ResourceKind::Asset, &ids.assets, max_query_length),
        space.list(ResourceKind::Locale, &locale_query),
    )?;

    debug!(
        "Destination {} holds {} content types, {} entries, {} assets, {} locales of interest",
        space_id,
        content_types.len(),
        entries.len(),
        assets.len(),
        locales.len()
    );

    Ok(DestinationContent {
        content_types,
        entries,
        assets,
        locales,
    })
}
