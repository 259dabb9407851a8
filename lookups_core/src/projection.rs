//! Field projection applied to every record before it is returned.

use crate::entity::{Entity, ID, TYPE};
use serde_json::Map;

/// Caller-selected field allow-list. `None` keeps every non-empty field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldProjection {
    fields: Option<Vec<String>>,
}

impl FieldProjection {
    pub fn new(fields: Option<Vec<String>>) -> Self {
        // An empty list behaves like no list at all.
        let fields = fields.filter(|list| !list.is_empty());
        Self { fields }
    }

    /// Use `fields` when given, else fall back to a connector default list.
    pub fn with_default(fields: Option<Vec<String>>, default: &[&str]) -> Self {
        match fields.filter(|list| !list.is_empty()) {
            Some(list) => Self::new(Some(list)),
            None if default.is_empty() => Self::new(None),
            None => Self::new(Some(default.iter().map(|f| f.to_string()).collect())),
        }
    }

    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    pub fn project(&self, entity: Entity) -> Option<Entity> {
        project(entity, self.fields())
    }
}

/// Clean `entity`, then keep only `fields` (if any). `@id` and `@type` are
/// always kept when present and placed first. Returns `None` for an empty
/// result.
pub fn project(entity: Entity, fields: Option<&[String]>) -> Option<Entity> {
    let cleaned = entity.cleaned();
    let Some(fields) = fields.filter(|list| !list.is_empty()) else {
        return (!cleaned.is_empty()).then_some(cleaned);
    };

    let mut source = cleaned.into_map();
    let mut projected = Map::new();
    for key in [ID, TYPE] {
        if let Some(value) = source.get(key) {
            projected.insert(key.to_string(), value.clone());
        }
    }
    for field in fields {
        if projected.contains_key(field.as_str()) {
            continue;
        }
        if let Some(value) = source.get_mut(field.as_str()) {
            projected.insert(field.clone(), value.take());
        }
    }

    if projected.is_empty() {
        None
    } else {
        Some(Entity::from(projected))
    }
}
