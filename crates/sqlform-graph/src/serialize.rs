//! Graph serialization.
//!
//! An entity serializes to a plain JSON object of its set scalar attributes;
//! composites become nested objects under their attribute name (the prefixed
//! backing columns never appear flat). Relationships serialize only when the
//! caller asked for them through a [`RelationSpec`], and each traversal
//! removes its spec from the include set before recursing, which is what
//! terminates cyclic graphs.

use sqlform_core::error::Result;
use sqlform_core::instance::{EntityRef, RelationValue};
use sqlform_core::mapper::EntityKey;
use sqlform_meta::cache::MetaCache;

/// One relationship to traverse during serialization: the owning class and
/// the relationship attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Class the relationship is declared on.
    pub model: EntityKey,
    /// Relationship attribute name.
    pub relation: String,
}

impl RelationSpec {
    /// Create a spec.
    pub fn new(model: impl Into<EntityKey>, relation: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            relation: relation.into(),
        }
    }

    /// Whether this spec names the given class and attribute.
    #[must_use]
    pub fn matches(&self, model: &EntityKey, relation: &str) -> bool {
        self.model == *model && self.relation == relation
    }
}

/// Serialize an entity (and the requested slice of its graph) to JSON.
///
/// Unset attributes are omitted; a null attribute serializes as JSON null.
/// To-one relationships become an object or null, to-many an array.
pub fn serialize(
    instance: &EntityRef,
    cache: &MetaCache,
    include: &[RelationSpec],
) -> Result<serde_json::Value> {
    let entity = instance.borrow();
    let info = cache.get_or_build(entity.class())?;
    let mut out = serde_json::Map::new();

    for column in info.columns() {
        if let Some(value) = entity.get(column.name()) {
            out.insert(column.name().to_string(), value.to_json());
        }
    }

    for composite in info.composites() {
        let Some(value) = entity.composite(composite.name()) else {
            continue;
        };
        let mut nested = serde_json::Map::new();
        for field in composite.fields() {
            if let Some(field_value) = value.get(field.name()) {
                nested.insert(field.name().to_string(), field_value.to_json());
            }
        }
        out.insert(
            composite.name().to_string(),
            serde_json::Value::Object(nested),
        );
    }

    for relation in info.relations() {
        if !include
            .iter()
            .any(|spec| spec.matches(entity.class(), relation.name()))
        {
            continue;
        }
        let Some(value) = entity.relation(relation.name()) else {
            continue;
        };
        // Removing the traversed spec is what stops bidirectional graphs
        // from recursing forever.
        let remaining: Vec<RelationSpec> = include
            .iter()
            .filter(|spec| !spec.matches(entity.class(), relation.name()))
            .cloned()
            .collect();
        let json = match value {
            RelationValue::One(None) => serde_json::Value::Null,
            RelationValue::One(Some(target)) => serialize(target, cache, &remaining)?,
            RelationValue::Many(targets) => serde_json::Value::Array(
                targets
                    .iter()
                    .map(|target| serialize(target, cache, &remaining))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        out.insert(relation.name().to_string(), json);
    }

    Ok(serde_json::Value::Object(out))
}
