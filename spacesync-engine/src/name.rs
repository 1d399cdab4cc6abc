//! Human-readable entity names for log messages.

use serde_json::Value;
use spacesync_types::Entity;

/// Produces a display identifier for an entity: its id plus, where the
/// payload carries one, a title or name.
#[must_use]
pub fn display_name(entity: &Entity) -> String {
    let id = entity.id().unwrap_or("unknown");
    match title_of(entity) {
        Some(title) => format!("{id} ({title})"),
        None => id.to_string(),
    }
}

/// Probes the payload for something name-like: a top-level `name`
/// (content types, locales) or a `title`/`name` field, unwrapping one
/// level of locale keying when the field is localized.
fn title_of(entity: &Entity) -> Option<String> {
    if let Some(name) = entity.get_str("name") {
        return Some(name.to_string());
    }

    let fields = entity.fields()?;
    for key in ["title", "name"] {
        match fields.get(key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Object(localized)) => {
                if let Some(s) = localized.values().find_map(Value::as_str) {
                    return Some(s.to_string());
                }
            }
            _ => {}
        }
    }
    None
}
