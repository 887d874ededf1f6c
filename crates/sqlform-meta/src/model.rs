//! Model descriptors.
//!
//! One [`ModelInfo`] exists per mapped class, created by the metadata cache
//! and kept current through mapper-configured events. The descriptor is the
//! uniform view over a class: primary keys, plain columns (composite backing
//! columns excluded), composites, and relationships, plus identity-key
//! resolution and the model-wide validation cascade.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Arc, RwLock};

use sqlform_core::error::{Error, Result, ValidationError, ValidationErrors};
use sqlform_core::instance::{Entity, EntityRef};
use sqlform_core::mapper::{EntityKey, InstanceCleanHook, MapperDef, RelationDef};
use sqlform_core::registry::MapperRegistry;
use sqlform_core::validators::Validator;
use sqlform_core::value::Value;

use crate::cache::MetaCache;
use crate::column::{ColumnInfo, SpecializationRegistry};
use crate::composite::CompositeInfo;
use crate::identity::{IdentityKey, PrimaryKey};
use crate::relation::RelationInfo;

/// Uniform field lookup result.
#[derive(Debug, Clone)]
pub enum FieldRef {
    /// A primary key column.
    PrimaryKey(ColumnInfo),
    /// A plain column.
    Column(ColumnInfo),
    /// A composite attribute.
    Composite(CompositeInfo),
    /// A relationship attribute.
    Relation(RelationInfo),
}

#[derive(Debug, Default)]
struct ModelState {
    def: Option<Arc<MapperDef>>,
    table_name: String,
    primary_keys: Vec<String>,
    columns: Vec<ColumnInfo>,
    composites: Vec<CompositeInfo>,
    relations: Vec<RelationInfo>,
    pending_relations: Vec<RelationDef>,
    validators: Vec<Validator<EntityRef>>,
    clean: Option<InstanceCleanHook>,
}

/// Descriptor for one mapped class.
///
/// Handle type is `Arc<ModelInfo>`; the cache guarantees one instance per
/// class, so `Arc::ptr_eq` answers "same descriptor". Interior state is
/// refreshed in place as configuration events arrive.
#[derive(Debug)]
pub struct ModelInfo {
    class: EntityKey,
    state: RwLock<ModelState>,
}

impl ModelInfo {
    pub(crate) fn new(class: EntityKey) -> Self {
        Self {
            class,
            state: RwLock::new(ModelState::default()),
        }
    }

    /// Recompute interior state from the latest mapper definition.
    ///
    /// Relations whose target class is not yet registered stay pending and
    /// resolve on a later event.
    pub(crate) fn refresh(
        &self,
        def: &Arc<MapperDef>,
        mappers: &MapperRegistry,
        rules: &SpecializationRegistry,
    ) {
        let composites: Vec<CompositeInfo> = def
            .composites
            .iter()
            .map(|c| CompositeInfo::from_def(c, rules))
            .collect();

        let backing: HashSet<String> = composites
            .iter()
            .flat_map(CompositeInfo::backing_columns)
            .collect();

        let primary_keys: Vec<String> = def
            .table
            .primary_key_columns()
            .iter()
            .map(|c| c.name.clone())
            .collect();

        let columns: Vec<ColumnInfo> = def
            .table
            .columns
            .iter()
            .filter(|c| !backing.contains(&c.name))
            .map(|c| ColumnInfo::with_registry(c.clone(), rules))
            .collect();

        let mut relations = Vec::new();
        let mut pending = Vec::new();
        for relation in &def.relations {
            match mappers.get(&relation.target) {
                Some(related) => {
                    relations.push(RelationInfo::from_def(relation.clone(), def, &related));
                }
                None => pending.push(relation.clone()),
            }
        }

        let mut state = self.state.write().unwrap();
        state.def = Some(Arc::clone(def));
        state.table_name = def.table.name.clone();
        state.primary_keys = primary_keys;
        state.columns = columns;
        state.composites = composites;
        state.relations = relations;
        state.pending_relations = pending;
        state.validators = def.validators.clone();
        state.clean = def.clean.clone();
    }

    /// Retry pending relations after some other mapper registered.
    pub(crate) fn resolve_pending(&self, mappers: &MapperRegistry) {
        let needs_retry = {
            let state = self.state.read().unwrap();
            !state.pending_relations.is_empty()
        };
        if !needs_retry {
            return;
        }
        let (def, pending) = {
            let state = self.state.read().unwrap();
            (state.def.clone(), state.pending_relations.clone())
        };
        let Some(def) = def else { return };
        let mut resolved = Vec::new();
        let mut still_pending = Vec::new();
        for relation in pending {
            match mappers.get(&relation.target) {
                Some(related) => {
                    resolved.push(RelationInfo::from_def(relation, &def, &related));
                }
                None => still_pending.push(relation),
            }
        }
        if !resolved.is_empty() {
            tracing::debug!(
                model = %self.class,
                resolved = resolved.len(),
                "Late-declared relations resolved"
            );
        }
        let mut state = self.state.write().unwrap();
        state.relations.extend(resolved);
        state.pending_relations = still_pending;
    }

    /// The class this descriptor reflects.
    #[must_use]
    pub fn class(&self) -> &EntityKey {
        &self.class
    }

    /// Mapped table name.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.state.read().unwrap().table_name.clone()
    }

    /// Primary key column names, in key order.
    #[must_use]
    pub fn primary_keys(&self) -> Vec<String> {
        self.state.read().unwrap().primary_keys.clone()
    }

    /// Plain column descriptors (composite backing columns excluded).
    #[must_use]
    pub fn columns(&self) -> Vec<ColumnInfo> {
        self.state.read().unwrap().columns.clone()
    }

    /// Plain column names, in table order.
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .columns
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Look up a plain column descriptor.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<ColumnInfo> {
        self.state
            .read()
            .unwrap()
            .columns
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Composite descriptors.
    #[must_use]
    pub fn composites(&self) -> Vec<CompositeInfo> {
        self.state.read().unwrap().composites.clone()
    }

    /// Look up a composite descriptor.
    #[must_use]
    pub fn composite(&self, name: &str) -> Option<CompositeInfo> {
        self.state
            .read()
            .unwrap()
            .composites
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Relationship descriptors.
    #[must_use]
    pub fn relations(&self) -> Vec<RelationInfo> {
        self.state.read().unwrap().relations.clone()
    }

    /// Relationship attribute names.
    #[must_use]
    pub fn relation_names(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .relations
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Look up a relationship descriptor.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<RelationInfo> {
        self.state
            .read()
            .unwrap()
            .relations
            .iter()
            .find(|r| r.name() == name)
            .cloned()
    }

    /// Uniform field lookup across primary keys, columns, composites, and
    /// relationships, in that order. Unknown names are an error, never a
    /// silent miss.
    pub fn get_field(&self, name: &str) -> Result<FieldRef> {
        let state = self.state.read().unwrap();
        if state.primary_keys.iter().any(|pk| pk == name) {
            if let Some(column) = state.columns.iter().find(|c| c.name() == name) {
                return Ok(FieldRef::PrimaryKey(column.clone()));
            }
        }
        if let Some(column) = state.columns.iter().find(|c| c.name() == name) {
            return Ok(FieldRef::Column(column.clone()));
        }
        if let Some(composite) = state.composites.iter().find(|c| c.name() == name) {
            return Ok(FieldRef::Composite(composite.clone()));
        }
        if let Some(relation) = state.relations.iter().find(|r| r.name() == name) {
            return Ok(FieldRef::Relation(relation.clone()));
        }
        Err(Error::UnknownField {
            model: self.class.to_string(),
            field: name.to_string(),
        })
    }

    /// Identity key of an instance, or `None` when any primary key
    /// attribute is unset or null.
    #[must_use]
    pub fn identity_key_from_instance(&self, instance: &Entity) -> Option<IdentityKey> {
        let values = self.pk_values(|name| instance.get(name).cloned())?;
        Some(IdentityKey::new(self.class.clone(), values))
    }

    /// Identity key from a plain attribute map, or `None` when any primary
    /// key value is absent or null.
    #[must_use]
    pub fn identity_key_from_dict(&self, values: &HashMap<String, Value>) -> Option<IdentityKey> {
        let pk = self.pk_values(|name| values.get(name).cloned())?;
        Some(IdentityKey::new(self.class.clone(), pk))
    }

    /// Primary key values of an instance, shaped by cardinality.
    #[must_use]
    pub fn primary_keys_from_instance(&self, instance: &Entity) -> Option<PrimaryKey> {
        self.pk_values(|name| instance.get(name).cloned())
            .map(PrimaryKey::from_values)
    }

    /// Primary key values from a plain attribute map, shaped by cardinality.
    #[must_use]
    pub fn primary_keys_from_dict(&self, values: &HashMap<String, Value>) -> Option<PrimaryKey> {
        self.pk_values(|name| values.get(name).cloned())
            .map(PrimaryKey::from_values)
    }

    fn pk_values<F>(&self, mut read: F) -> Option<Vec<Value>>
    where
        F: FnMut(&str) -> Option<Value>,
    {
        let state = self.state.read().unwrap();
        if state.primary_keys.is_empty() {
            return None;
        }
        let mut values = Vec::with_capacity(state.primary_keys.len());
        for pk in &state.primary_keys {
            match read(pk) {
                Some(value) if !value.is_null() => values.push(value),
                _ => return None,
            }
        }
        Some(values)
    }

    /// Clean the instance's plain column attributes in place.
    ///
    /// Same skip rule as composites: a blank attribute is skipped when the
    /// column is nullable, defaulted, or not required; a blank attribute
    /// that is none of those fails with a `required` error.
    pub fn clean_fields(
        &self,
        instance: &EntityRef,
        exclude: &[&str],
    ) -> Result<(), ValidationError> {
        let columns = self.columns();
        let mut errs = ValidationErrors::new();
        let mut entity = instance.borrow_mut();
        for column in &columns {
            if exclude.contains(&column.name()) {
                continue;
            }
            let raw = entity.get(column.name()).cloned().unwrap_or(Value::Null);
            if raw.is_blank() {
                if column.nullable() || column.has_default() || !column.required() {
                    continue;
                }
                errs.add(
                    column.name(),
                    ValidationError::coded("this field is required", "required"),
                );
                continue;
            }
            match column.clean_value(&raw) {
                Ok(cleaned) => entity.set(column.name(), cleaned),
                Err(err) => errs.add(column.name(), err),
            }
        }
        errs.result()
    }

    /// Run the whole validation cascade for an instance.
    ///
    /// Stages always run in order: plain fields, composites, loaded
    /// relations (cyclic graphs terminate through the visited set),
    /// model-level validators, then the instance clean hook. All failures
    /// aggregate into one nested error, raised once.
    pub fn full_clean(
        &self,
        instance: &EntityRef,
        cache: &MetaCache,
        exclude: &[&str],
    ) -> Result<(), ValidationError> {
        let mut visited = HashSet::new();
        self.full_clean_inner(instance, cache, exclude, &mut visited)
    }

    fn full_clean_inner(
        &self,
        instance: &EntityRef,
        cache: &MetaCache,
        exclude: &[&str],
        visited: &mut HashSet<usize>,
    ) -> Result<(), ValidationError> {
        visited.insert(Rc::as_ptr(instance) as usize);
        let mut errs = ValidationErrors::new();

        if let Err(err) = self.clean_fields(instance, exclude) {
            errs.extend(err);
        }

        for composite in self.composites() {
            if exclude.contains(&composite.name()) {
                continue;
            }
            let mut entity = instance.borrow_mut();
            if let Some(value) = entity.composite_mut(composite.name()) {
                if let Err(err) = composite.full_clean(value, &[]) {
                    drop(entity);
                    errs.add(composite.name(), err);
                }
            }
        }

        for relation in self.relations() {
            if exclude.contains(&relation.name()) {
                continue;
            }
            let targets: Vec<EntityRef> = {
                let entity = instance.borrow();
                match entity.relation(relation.name()) {
                    Some(value) => value.iter_loaded().map(Rc::clone).collect(),
                    None => continue,
                }
            };
            for target in targets {
                if !visited.insert(Rc::as_ptr(&target) as usize) {
                    continue;
                }
                let Some(related_info) = cache.get(relation.target()) else {
                    tracing::warn!(
                        model = %self.class,
                        relation = relation.name(),
                        target = %relation.target(),
                        "Related class has no descriptor; skipping cascade"
                    );
                    continue;
                };
                if let Err(err) = related_info.full_clean_inner(&target, cache, &[], visited) {
                    errs.add(relation.name(), err);
                }
            }
        }

        let validators = {
            let state = self.state.read().unwrap();
            state.validators.clone()
        };
        for validator in &validators {
            if let Err(err) = validator.check(instance) {
                errs.extend(err);
            }
        }

        let clean = {
            let state = self.state.read().unwrap();
            state.clean.clone()
        };
        if let Some(hook) = clean {
            if let Err(err) = hook.call(instance) {
                errs.extend(err);
            }
        }

        errs.result()
    }
}
