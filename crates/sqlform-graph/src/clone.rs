//! Graph cloning.
//!
//! A clone is a new unpersisted instance: scalar attributes copy over except
//! the primary key columns and every relationship's local foreign-key
//! columns, so the clone has no identity and points at nothing until the
//! caller says otherwise. Relationships clone only when requested through a
//! [`CloneSpec`]; each traversal removes its spec before recursing, which
//! terminates cyclic graphs.

use std::collections::{HashMap, HashSet};

use sqlform_core::error::Result;
use sqlform_core::instance::{Entity, EntityRef, RelationValue};
use sqlform_core::mapper::EntityKey;
use sqlform_core::value::Value;
use sqlform_meta::cache::MetaCache;

/// One relationship to clone along with its owner, plus per-relation value
/// overrides applied to every cloned target.
#[derive(Debug, Clone)]
pub struct CloneSpec {
    /// Class the relationship is declared on.
    pub model: EntityKey,
    /// Relationship attribute name.
    pub relation: String,
    /// Attribute values forced onto each cloned target.
    pub overrides: HashMap<String, Value>,
}

impl CloneSpec {
    /// Create a spec with no overrides.
    pub fn new(model: impl Into<EntityKey>, relation: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            relation: relation.into(),
            overrides: HashMap::new(),
        }
    }

    /// Force an attribute value onto each cloned target.
    #[must_use]
    pub fn override_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(name.into(), value);
        self
    }

    /// Whether this spec names the given class and attribute.
    #[must_use]
    pub fn matches(&self, model: &EntityKey, relation: &str) -> bool {
        self.model == *model && self.relation == relation
    }
}

/// Clone an entity (and the requested slice of its graph).
///
/// `overrides` are applied to the root clone after copying; per-relation
/// overrides come from the matching [`CloneSpec`]. The clone's identity key
/// is always unset.
pub fn clone_entity(
    instance: &EntityRef,
    cache: &MetaCache,
    specs: &[CloneSpec],
    overrides: &HashMap<String, Value>,
) -> Result<EntityRef> {
    let entity = instance.borrow();
    let info = cache.get_or_build(entity.class())?;

    let skip: HashSet<String> = info
        .primary_keys()
        .into_iter()
        .chain(info.relations().iter().flat_map(|relation| {
            relation
                .local_columns()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        }))
        .collect();

    let mut clone = Entity::new(entity.class().clone());
    for column in info.columns() {
        if skip.contains(column.name()) {
            continue;
        }
        if let Some(value) = entity.get(column.name()) {
            clone.set(column.name(), value.clone());
        }
    }
    for (name, value) in entity.composites() {
        clone.set_composite(name.clone(), value.clone());
    }
    for (name, value) in overrides {
        clone.set(name.clone(), value.clone());
    }
    let clone_ref = clone.into_ref();

    for relation in info.relations() {
        let Some(spec) = specs
            .iter()
            .find(|spec| spec.matches(entity.class(), relation.name()))
        else {
            continue;
        };
        let Some(value) = entity.relation(relation.name()) else {
            continue;
        };
        let remaining: Vec<CloneSpec> = specs
            .iter()
            .filter(|s| !s.matches(entity.class(), relation.name()))
            .cloned()
            .collect();
        let cloned = match value {
            RelationValue::One(None) => RelationValue::One(None),
            RelationValue::One(Some(target)) => RelationValue::One(Some(clone_entity(
                target,
                cache,
                &remaining,
                &spec.overrides,
            )?)),
            RelationValue::Many(targets) => RelationValue::Many(
                targets
                    .iter()
                    .map(|target| clone_entity(target, cache, &remaining, &spec.overrides))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        clone_ref
            .borrow_mut()
            .set_relation(relation.name(), cloned);
    }

    Ok(clone_ref)
}
