//! Canonical linked-data record shared by every connector.
//!
//! An [`Entity`] is an insertion-ordered JSON object. Builders insert `@id`
//! and `@type` first, then source-specific fields. Values that carry no
//! information (null, blank strings, empty arrays and objects) are dropped by
//! [`Entity::cleaned`] before a record leaves a connector.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ID: &str = "@id";
pub const TYPE: &str = "@type";
pub const NAME: &str = "name";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Start a record with its identity fields in canonical order.
    pub fn new(id: Option<String>, entity_type: &str) -> Self {
        Entity::default().set(ID, id).set(TYPE, entity_type)
    }

    /// Insert or replace a field. `None` values are stored as null and removed
    /// on cleaning, so optional upstream fields can be passed straight through.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str(ID)
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.get_str(TYPE)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str(NAME)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the record can be told apart from others: it has an `@id`
    /// or a `name`.
    pub fn has_identity(&self) -> bool {
        self.id().is_some_and(|v| !v.trim().is_empty())
            || self.name().is_some_and(|v| !v.trim().is_empty())
    }

    /// Drop every field whose value is absent or empty, keeping order.
    pub fn cleaned(self) -> Self {
        Entity(
            self.0
                .into_iter()
                .filter(|(_, value)| is_present(value))
                .collect(),
        )
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(map: Map<String, Value>) -> Self {
        Entity(map)
    }
}

impl FromIterator<(String, Value)> for Entity {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Entity(iter.into_iter().collect())
    }
}

/// Whether a value is worth keeping on a canonical record.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Build a nested JSON object from `(key, value)` pairs, skipping empty values.
/// Returns `None` when nothing is left.
pub fn compact_object<'a, I>(pairs: I) -> Option<Value>
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    let map: Map<String, Value> = pairs
        .into_iter()
        .filter(|(_, value)| is_present(value))
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Trimmed, non-empty string or `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// String view of a JSON scalar: strings as-is, numbers rendered.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
