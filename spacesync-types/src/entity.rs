//! Remote entity wire shapes.
//!
//! Every resource the backend returns carries a `sys` metadata block
//! (id, type, optimistic-concurrency version, content-type linkage for
//! entries). The rest of the resource is kind-specific and kept as raw
//! JSON: `fields` for entries and assets, `name`/`code` for locales,
//! the schema body for content types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Link to another resource, e.g. `sys.contentType` on an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

/// The `sys` block of a link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSys {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "linkType", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

impl Link {
    /// Creates a resource link of the given link type.
    pub fn to(id: impl Into<String>, link_type: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                id: id.into(),
                kind: Some("Link".to_string()),
                link_type: Some(link_type.into()),
            },
        }
    }
}

/// Resource metadata as returned by the backend.
///
/// All fields are optional: a transformed entity that has not been
/// written yet may carry an empty `sys`, and the backend only stamps
/// `version` on persisted resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Link>,
}

impl Sys {
    /// Creates a sys block holding just an id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Id of the content type this resource links to, if any.
    #[must_use]
    pub fn content_type_id(&self) -> Option<&str> {
        self.content_type.as_ref().map(|link| link.sys.id.as_str())
    }
}

/// A generic remote resource.
///
/// The `payload` map holds everything outside `sys`; for entries and
/// assets that includes the `fields` object the unknown-field recovery
/// in the creation engine prunes in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub sys: Sys,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Entity {
    /// Creates an entity with the given sys block and no payload.
    #[must_use]
    pub fn new(sys: Sys) -> Self {
        Self {
            sys,
            payload: Map::new(),
        }
    }

    /// Deserializes an entity from a JSON value.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serializes the entity back to a JSON value.
    pub fn to_value(&self) -> crate::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// The resource id, when one has been assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.sys.id.as_deref()
    }

    /// The `fields` object, when the payload carries one.
    #[must_use]
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.payload.get("fields").and_then(Value::as_object)
    }

    /// Mutable view of the `fields` object.
    pub fn fields_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.payload.get_mut("fields").and_then(Value::as_object_mut)
    }

    /// Removes a named field from the payload. Returns whether the
    /// field was present.
    pub fn remove_field(&mut self, name: &str) -> bool {
        self.fields_mut()
            .is_some_and(|fields| fields.remove(name).is_some())
    }

    /// Whether the payload carries a non-empty `fields` object.
    #[must_use]
    pub fn has_fields(&self) -> bool {
        self.fields().is_some_and(|fields| !fields.is_empty())
    }

    /// Extracts a top-level string value from the payload.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// A source entity paired with its destination-shaped transform.
///
/// `original` is the resource as fetched from the source space (used to
/// detect content-type linkage); `transformed` is the write payload.
/// The creation engine mutates `transformed` in place when the
/// destination rejects unknown fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePair {
    pub original: Entity,
    pub transformed: Entity,
}

impl SourcePair {
    /// Pairs an original entity with its transform.
    #[must_use]
    pub fn new(original: Entity, transformed: Entity) -> Self {
        Self {
            original,
            transformed,
        }
    }
}

/// Identifies an existing destination resource and the version an
/// update call must be seeded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationRef {
    pub id: String,
    pub version: u64,
}

impl DestinationRef {
    /// Builds a ref from a fetched destination entity. `None` when the
    /// entity has no id.
    #[must_use]
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        entity.id().map(|id| Self {
            id: id.to_string(),
            version: entity.sys.version.unwrap_or(0),
        })
    }
}
