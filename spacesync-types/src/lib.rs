//! Core type definitions for SpaceSync.
//!
//! This crate defines the wire-shape types shared by the migration
//! engines:
//! - `Sys` metadata and resource links as the backend returns them
//! - The generic `Entity` payload wrapper
//! - `SourcePair` (as-fetched original + destination-shaped transform)
//! - `ResourceKind` for the migrated collections
//!
//! Transformation logic, HTTP plumbing and the engines themselves live
//! in `spacesync-engine`; nothing here performs I/O.

mod entity;
mod kind;

pub use entity::{DestinationRef, Entity, Link, LinkSys, SourcePair, Sys};
pub use kind::ResourceKind;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
