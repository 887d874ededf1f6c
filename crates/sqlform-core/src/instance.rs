//! Runtime instances of mapped classes.
//!
//! `Entity` stores attribute values in maps keyed by attribute name, trading
//! type safety for the runtime flexibility the form and graph layers need.
//! Instances are single-threaded per request; `EntityRef` shares them by
//! reference so a deserialized graph can point at one object from many
//! places.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::mapper::EntityKey;
use crate::value::Value;

/// Shared handle to an entity instance.
pub type EntityRef = Rc<RefCell<Entity>>;

/// A runtime instance of a mapped class.
///
/// Scalar attributes distinguish *unset* (absent from the map) from *set to
/// null* (`Value::Null` present). Identity-key resolution treats both as
/// missing; form cleaning treats them differently from actual values.
#[derive(Debug, Clone)]
pub struct Entity {
    class: EntityKey,
    values: HashMap<String, Value>,
    composites: HashMap<String, CompositeValue>,
    relations: HashMap<String, RelationValue>,
}

impl Entity {
    /// Create an empty instance of `class`.
    pub fn new(class: impl Into<EntityKey>) -> Self {
        Self {
            class: class.into(),
            values: HashMap::new(),
            composites: HashMap::new(),
            relations: HashMap::new(),
        }
    }

    /// The instance's class token.
    #[must_use]
    pub fn class(&self) -> &EntityKey {
        &self.class
    }

    /// Wrap into a shared handle.
    #[must_use]
    pub fn into_ref(self) -> EntityRef {
        Rc::new(RefCell::new(self))
    }

    /// Get a scalar attribute. `None` means unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set a scalar attribute.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Set a scalar attribute to null (distinct from unsetting it).
    pub fn set_null(&mut self, name: impl Into<String>) {
        self.values.insert(name.into(), Value::Null);
    }

    /// Remove a scalar attribute, returning it.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Whether a scalar attribute is set (possibly to null).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All set scalar attributes.
    #[must_use]
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Get a composite attribute.
    #[must_use]
    pub fn composite(&self, name: &str) -> Option<&CompositeValue> {
        self.composites.get(name)
    }

    /// Get a composite attribute mutably.
    pub fn composite_mut(&mut self, name: &str) -> Option<&mut CompositeValue> {
        self.composites.get_mut(name)
    }

    /// Set a composite attribute.
    pub fn set_composite(&mut self, name: impl Into<String>, value: CompositeValue) {
        self.composites.insert(name.into(), value);
    }

    /// All set composite attributes.
    #[must_use]
    pub fn composites(&self) -> &HashMap<String, CompositeValue> {
        &self.composites
    }

    /// Get a relation attribute. `None` means not loaded.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    /// Set a relation attribute.
    pub fn set_relation(&mut self, name: impl Into<String>, value: RelationValue) {
        self.relations.insert(name.into(), value);
    }

    /// All loaded relation attributes.
    #[must_use]
    pub fn relations(&self) -> &HashMap<String, RelationValue> {
        &self.relations
    }
}

/// A composite (embedded value object) attribute value.
#[derive(Debug, Clone)]
pub struct CompositeValue {
    type_name: String,
    values: HashMap<String, Value>,
}

impl CompositeValue {
    /// Create an empty value object of the named type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: HashMap::new(),
        }
    }

    /// The value object's type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Get a field value. `None` means unset.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a field value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    /// Whether a field is set.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// All set field values.
    #[must_use]
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

/// A loaded relationship attribute.
#[derive(Debug, Clone)]
pub enum RelationValue {
    /// To-one side: a single target or null.
    One(Option<EntityRef>),
    /// To-many side: a collection of targets.
    Many(Vec<EntityRef>),
}

impl RelationValue {
    /// The single target when this is a to-one value.
    #[must_use]
    pub fn as_one(&self) -> Option<&EntityRef> {
        match self {
            RelationValue::One(target) => target.as_ref(),
            RelationValue::Many(_) => None,
        }
    }

    /// The collection when this is a to-many value.
    #[must_use]
    pub fn as_many(&self) -> Option<&[EntityRef]> {
        match self {
            RelationValue::Many(targets) => Some(targets),
            RelationValue::One(_) => None,
        }
    }

    /// Iterate every loaded target, regardless of cardinality.
    pub fn iter_loaded(&self) -> impl Iterator<Item = &EntityRef> {
        match self {
            RelationValue::One(target) => target.as_slice().iter(),
            RelationValue::Many(targets) => targets.as_slice().iter(),
        }
    }
}
