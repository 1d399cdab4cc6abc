//! Space-to-space content migration engine.
//!
//! Two cooperating components move content types, entries, and assets
//! from a source space into a destination space:
//!
//! - **Batch query engine** (`get`): resolves the destination space
//!   and fetches its current state for a set of known ids, splitting
//!   large id lists into the fewest list requests that fit the
//!   remote's query-length limit.
//! - **Creation engine** (`push`): writes one destination resource per
//!   (original, transformed) source pair (create when absent, update
//!   when present, skip when there is nothing to write) while a shared
//!   limiter keeps the write rate under the remote's threshold.
//!
//! Per-entity failures never abort a batch: every pair produces an
//! [`push::Outcome`] slot plus a [`report::LogEvent`], so callers can
//! reconcile what succeeded, was repaired, or failed after the run.
//!
//! The engines reach the backend only through the [`client`] traits;
//! [`client::CmaClient`] is the HTTP implementation.
//!
//! # Example
//!
//! ```no_run
//! use spacesync_engine::{
//!     create_entities, destination_content, CmaClient, CmaConfig, MemorySink, PushContext,
//!     RateLimiter, SourceIds, DEFAULT_MAX_QUERY_LENGTH,
//! };
//! use spacesync_types::ResourceKind;
//!
//! # async fn run(mut pairs: Vec<spacesync_types::SourcePair>) -> spacesync_engine::SyncResult<()> {
//! let management = CmaClient::new(CmaConfig {
//!     token: "token".to_string(),
//!     ..Default::default()
//! });
//!
//! let ids = SourceIds {
//!     assets: pairs.iter().filter_map(|p| p.transformed.id().map(String::from)).collect(),
//!     ..Default::default()
//! };
//! let destination =
//!     destination_content(&management, "space-id", &ids, DEFAULT_MAX_QUERY_LENGTH).await?;
//!
//! let space = management.space("space-id").await?;
//! let limiter = RateLimiter::new(7);
//! let sink = MemorySink::new();
//! let ctx = PushContext {
//!     space: &*space,
//!     limiter: &limiter,
//!     sink: &sink,
//!     skip_content_model: false,
//! };
//! let outcomes =
//!     create_entities(&ctx, ResourceKind::Asset, &mut pairs, &destination.assets).await;
//! # let _ = outcomes;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod error;
pub mod get;
mod limit;
mod name;
pub mod push;
pub mod report;

pub use client::{CmaClient, CmaConfig, ListQuery, ManagementClient, SpaceClient};
pub use error::{SyncError, SyncResult};
pub use get::{
    batch_queries, destination_content, fetch_all, DestinationContent, SourceIds,
    DEFAULT_MAX_QUERY_LENGTH,
};
pub use limit::RateLimiter;
pub use name::display_name;
pub use push::{create_entities, create_entries, Outcome, PushContext};
pub use report::{LogEvent, LogLevel, LogSink, MemorySink, TracingSink};
