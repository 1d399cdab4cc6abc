//! The resource collections a space migration touches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of remote resource being fetched or written.
///
/// Content types are schemas; entries and assets are content instances;
/// locales are the per-space language configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ContentType,
    Entry,
    Asset,
    Locale,
}

impl ResourceKind {
    /// URL path segment of the collection on the management API.
    #[must_use]
    pub const fn collection(&self) -> &'static str {
        match self {
            Self::ContentType => "content_types",
            Self::Entry => "entries",
            Self::Asset => "assets",
            Self::Locale => "locales",
        }
    }

    /// The `sys.type` value the backend stamps on resources of this kind.
    #[must_use]
    pub const fn sys_type(&self) -> &'static str {
        match self {
            Self::ContentType => "ContentType",
            Self::Entry => "Entry",
            Self::Asset => "Asset",
            Self::Locale => "Locale",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContentType => "content type",
            Self::Entry => "entry",
            Self::Asset => "asset",
            Self::Locale => "locale",
        };
        write!(f, "{name}")
    }
}
