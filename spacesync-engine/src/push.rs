//! Entity creation against the destination space.
//!
//! Takes the (original, transformed) pairs the transformation step
//! produced plus the already-fetched destination entities, and per
//! pair either creates, updates, or skips. Failures are isolated: a
//! pair that cannot be written is recorded and the rest of the batch
//! proceeds. Rate-limit responses are retried after the server's reset
//! hint; unknown-field rejections prune the payload and retry once.

use crate::client::SpaceClient;
use crate::error::SyncError;
use crate::limit::RateLimiter;
use crate::name::display_name;
use crate::report::{LogEvent, LogSink};
use futures::future::join_all;
use spacesync_types::{DestinationRef, Entity, ResourceKind, SourcePair};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Outcome of one source pair. One slot per input pair, same order.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The created or updated remote entity.
    Written(Entity),
    /// Recognized no-op; the destination was left as-is.
    Unchanged,
    /// Recorded, non-fatal failure. Detail is in the log trail.
    Failed,
}

impl Outcome {
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }

    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// The written entity, when there is one.
    #[must_use]
    pub fn written(&self) -> Option<&Entity> {
        match self {
            Self::Written(entity) => Some(entity),
            _ => None,
        }
    }
}

/// Collaborators shared by every write of one migration run.
pub struct PushContext<'a> {
    pub space: &'a dyn SpaceClient,
    /// Write-rate limiter shared across all concurrent operations.
    pub limiter: &'a RateLimiter,
    /// Migration log trail.
    pub sink: &'a dyn LogSink,
    /// When set, entries that carry nothing beyond their content-type
    /// linkage are skipped instead of written.
    pub skip_content_model: bool,
}

/// Creates or updates one destination resource per source pair.
///
/// All pairs are dispatched concurrently; the shared limiter throttles
/// the effective write rate. The returned outcomes align 1:1 with
/// `pairs` regardless of completion order. No pair is ever silently
/// dropped and no pair failure aborts its siblings.
pub async fn create_entities(
    ctx: &PushContext<'_>,
    kind: ResourceKind,
    pairs: &mut [SourcePair],
    destination: &[Entity],
) -> Vec<Outcome> {
    let index: HashMap<String, DestinationRef> = destination
        .iter()
        .filter_map(DestinationRef::from_entity)
        .map(|dest| (dest.id.clone(), dest))
        .collect();

    let total = pairs.len();
    let tasks = pairs
        .iter_mut()
        .map(|pair| process_pair(ctx, kind, pair, &index));
    let outcomes = join_all(tasks).await;

    let written = outcomes.iter().filter(|o| o.is_written()).count();
    debug!("Wrote {written}/{total} {kind} resources");

    outcomes
}

/// `create_entities` fixed to the entry kind, which carries the
/// content-model-dependent skip behavior.
pub async fn create_entries(
    ctx: &PushContext<'_>,
    pairs: &mut [SourcePair],
    destination: &[Entity],
) -> Vec<Outcome> {
    create_entities(ctx, ResourceKind::Entry, pairs, destination).await
}

/// Runs one pair through the locate, write, handle-error machine.
async fn process_pair(
    ctx: &PushContext<'_>,
    kind: ResourceKind,
    pair: &mut SourcePair,
    index: &HashMap<String, DestinationRef>,
) -> Outcome {
    if skips_write(ctx, kind, pair) {
        return Outcome::Unchanged;
    }

    let id = pair.transformed.id().map(str::to_string);
    let existing = id
        .as_deref()
        .and_then(|id| index.get(id))
        .map(|dest| dest.version);
    let mut pruned = false;

    loop {
        ctx.limiter.acquire().await;

        let attempt = match (existing, id.as_deref()) {
            (Some(version), Some(id)) => {
                ctx.space.update(kind, id, version, &pair.transformed).await
            }
            (_, id) => ctx.space.create(kind, id, &pair.transformed).await,
        };

        match attempt {
            Ok(written) => {
                let verb = if existing.is_some() { "Updated" } else { "Created" };
                ctx.sink.emit(LogEvent::info(
                    display_name(&written),
                    format!("{verb} {kind}"),
                ));
                return Outcome::Written(written);
            }
            // Not a terminal failure: wait out the server's reset hint
            // and retry the same operation. No log event.
            Err(err) if err.is_rate_limited() => {
                let wait = err.retry_after().unwrap_or(Duration::from_secs(1));
                debug!(
                    "Rate limited writing {kind} {}, retrying in {}s",
                    display_name(&pair.transformed),
                    wait.as_secs()
                );
                sleep(wait).await;
            }
            // Repair the payload and retry once; a second rejection of
            // any kind falls through to the terminal arm below.
            Err(SyncError::UnknownFields { fields }) if !pruned => {
                pruned = true;
                for field in &fields {
                    pair.transformed.remove_field(field);
                }
                ctx.sink.emit(LogEvent::warning(
                    display_name(&pair.original),
                    format!("Removed unknown fields: {}", fields.join(", ")),
                ));
            }
            Err(SyncError::AlreadyExists) => {
                return Outcome::Unchanged;
            }
            Err(err) => {
                warn!("Failed to write {kind}: {err}");
                ctx.sink
                    .emit(LogEvent::error(display_name(&pair.original), err.to_string()));
                return Outcome::Failed;
            }
        }
    }
}

/// Content-model skip: an entry that links a content type but carries
/// no fields has nothing to write when the content model is not being
/// migrated.
fn skips_write(ctx: &PushContext<'_>, kind: ResourceKind, pair: &SourcePair) -> bool {
    ctx.skip_content_model
        && kind == ResourceKind::Entry
        && pair.original.sys.content_type_id().is_some()
        && !pair.transformed.has_fields()
}
