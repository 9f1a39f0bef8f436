//! ---
//! mosaic_section: "01-embeddable-core"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Input/output records and well-known field keys."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EmbeddableError, Result};

/// Well-known field names used across input and output records.
///
/// Wire names are camelCase so a serialized container input matches the
/// dashboard shape persisted by existing hosts.
pub mod keys {
    /// Unit identity; every input record carries it.
    pub const ID: &str = "id";
    /// Free-form key/value overlay attached to a panel.
    pub const CUSTOMIZATION: &str = "customization";
    /// Declarative panel mapping held by containers.
    pub const PANELS: &str = "panels";
    /// Shared view mode (`view`/`edit`).
    pub const VIEW_MODE: &str = "viewMode";
    /// Shared filter context, opaque to the engine.
    pub const FILTERS: &str = "filters";
    /// Shared query context, opaque to the engine.
    pub const QUERY: &str = "query";
    /// Shared time range context, opaque to the engine.
    pub const TIME_RANGE: &str = "timeRange";
    /// Shared refresh configuration, opaque to the engine.
    pub const REFRESH_CONFIG: &str = "refreshConfig";
    /// Whether panel title chrome is suppressed.
    pub const HIDE_PANEL_TITLES: &str = "hidePanelTitles";
    /// Injected per-child flag: is this the expanded panel.
    pub const IS_PANEL_EXPANDED: &str = "isPanelExpanded";
    /// Dashboard-level id of the expanded panel, if any.
    pub const EXPANDED_PANEL_ID: &str = "expandedPanelId";
    /// Dashboard-level full screen flag.
    pub const IS_FULL_SCREEN_MODE: &str = "isFullScreenMode";
    /// Dashboard-level margin toggle.
    pub const USE_MARGINS: &str = "useMargins";
    /// Dashboard title.
    pub const TITLE: &str = "title";
    /// Dashboard description.
    pub const DESCRIPTION: &str = "description";
}

/// View mode shared by a container with its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Read-only consumption of the dashboard.
    #[default]
    View,
    /// Editing mode, enabling layout and panel mutation affordances.
    Edit,
}

/// An input or output record: an ordered mapping of named fields.
///
/// Records are the unit of state exchanged between containers and
/// embeddables. Payload fields (query, time range, placement metadata) pass
/// through opaquely as JSON values; the engine only interprets the
/// well-known keys in [`keys`]. Equality is deep structural equality over
/// the JSON values, which is what the propagation layer relies on to
/// short-circuit redundant notifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON value; the value must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(EmbeddableError::InvalidState(format!(
                "record must be a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Convert the record into a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True when the field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Remove a field by name.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow field-by-field merge: every field of `other` overwrites the
    /// field of the same name here. Nested objects are replaced wholesale,
    /// not merged.
    pub fn merge(&mut self, other: &Record) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// The unit identity carried by this record, if present.
    pub fn id(&self) -> Option<&str> {
        self.0.get(keys::ID).and_then(Value::as_str)
    }

    /// Force the unit identity to the supplied value.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(keys::ID.to_owned(), Value::String(id.into()));
    }

    /// The customization overlay, or an empty record when absent or not an
    /// object.
    pub fn customization(&self) -> Record {
        match self.0.get(keys::CUSTOMIZATION) {
            Some(Value::Object(map)) => Record(map.clone()),
            _ => Record::new(),
        }
    }

    /// Replace the customization overlay.
    pub fn set_customization(&mut self, customization: Record) {
        self.0
            .insert(keys::CUSTOMIZATION.to_owned(), customization.to_value());
    }

    /// Read a string field by name.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Read a boolean field by name.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// The shared view mode, defaulting to [`ViewMode::View`] when absent
    /// or malformed.
    pub fn view_mode(&self) -> ViewMode {
        self.0
            .get(keys::VIEW_MODE)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.0
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_field_by_field() {
        let mut base = Record::from_value(json!({
            "a": 1,
            "nested": {"x": 1, "y": 2},
            "kept": true,
        }))
        .expect("object");
        let overlay = Record::from_value(json!({
            "a": 2,
            "nested": {"x": 9},
        }))
        .expect("object");

        base.merge(&overlay);

        assert_eq!(base.get("a"), Some(&json!(2)));
        // Nested objects are replaced, not deep-merged.
        assert_eq!(base.get("nested"), Some(&json!({"x": 9})));
        assert_eq!(base.get("kept"), Some(&json!(true)));
    }

    #[test]
    fn customization_defaults_to_empty() {
        let record = Record::from_value(json!({"id": "p1"})).expect("object");
        assert!(record.customization().is_empty());

        let record =
            Record::from_value(json!({"customization": {"color": "red"}})).expect("object");
        assert_eq!(record.customization().get("color"), Some(&json!("red")));
    }

    #[test]
    fn view_mode_defaults_to_view() {
        let record = Record::new();
        assert_eq!(record.view_mode(), ViewMode::View);

        let record = Record::from_value(json!({"viewMode": "edit"})).expect("object");
        assert_eq!(record.view_mode(), ViewMode::Edit);

        let record = Record::from_value(json!({"viewMode": 42})).expect("object");
        assert_eq!(record.view_mode(), ViewMode::View);
    }

    #[test]
    fn equality_is_structural_not_positional() {
        let left = Record::from_value(json!({"a": 1, "b": 2})).expect("object");
        let right = Record::from_value(json!({"b": 2, "a": 1})).expect("object");
        assert_eq!(left, right);
    }

    #[test]
    fn non_object_values_are_rejected() {
        assert!(Record::from_value(json!([1, 2, 3])).is_err());
        assert!(Record::from_value(json!("scalar")).is_err());
    }
}
