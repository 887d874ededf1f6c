//! Mapper registry and configuration events.
//!
//! The host ORM registers a [`MapperDef`] per mapped class, then amends it as
//! later declarations arrive (relationships and composites may be declared in
//! any module order). Every registration and amendment fires the configured
//! listeners, which is how the metadata cache keeps already-built descriptors
//! current without rebuilding them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::mapper::{CompositeDef, EntityKey, MapperDef, RelationDef};

type ConfiguredListener = Arc<dyn Fn(&Arc<MapperDef>) + Send + Sync>;

/// Process-wide store of mapper definitions.
///
/// Listeners run outside the registry locks, so a listener may call back
/// into the registry.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: RwLock<HashMap<EntityKey, Arc<MapperDef>>>,
    listeners: RwLock<Vec<ConfiguredListener>>,
}

impl MapperRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapper, replacing any previous definition for the class,
    /// and fire the configured listeners.
    pub fn register(&self, mapper: MapperDef) -> Arc<MapperDef> {
        let def = Arc::new(mapper);
        {
            let mut mappers = self.mappers.write().unwrap();
            mappers.insert(def.entity.clone(), Arc::clone(&def));
        }
        tracing::info!(model = %def.entity, table = %def.table.name, "Mapper registered");
        self.notify(&def);
        def
    }

    /// Amend a registered mapper with a later-declared relationship and
    /// re-fire the configured listeners.
    pub fn add_relation(&self, entity: &EntityKey, relation: RelationDef) -> Result<()> {
        self.amend(entity, |def| def.relations.push(relation))
    }

    /// Amend a registered mapper with a later-declared composite and re-fire
    /// the configured listeners.
    pub fn add_composite(&self, entity: &EntityKey, composite: CompositeDef) -> Result<()> {
        self.amend(entity, |def| def.composites.push(composite))
    }

    /// Look up the current definition for a class.
    #[must_use]
    pub fn get(&self, entity: &EntityKey) -> Option<Arc<MapperDef>> {
        self.mappers.read().unwrap().get(entity).cloned()
    }

    /// Every registered class token.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityKey> {
        self.mappers.read().unwrap().keys().cloned().collect()
    }

    /// Snapshot of every registered definition.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<MapperDef>> {
        self.mappers.read().unwrap().values().cloned().collect()
    }

    /// Subscribe to mapper-configured events (registrations and amendments).
    pub fn on_configured<F>(&self, listener: F)
    where
        F: Fn(&Arc<MapperDef>) + Send + Sync + 'static,
    {
        self.listeners.write().unwrap().push(Arc::new(listener));
    }

    fn amend<F>(&self, entity: &EntityKey, apply: F) -> Result<()>
    where
        F: FnOnce(&mut MapperDef),
    {
        let def = {
            let mut mappers = self.mappers.write().unwrap();
            let current = mappers
                .get(entity)
                .ok_or_else(|| Error::UnregisteredModel(entity.to_string()))?;
            let mut updated = MapperDef::clone(current);
            apply(&mut updated);
            let updated = Arc::new(updated);
            mappers.insert(entity.clone(), Arc::clone(&updated));
            updated
        };
        tracing::debug!(model = %def.entity, "Mapper amended");
        self.notify(&def);
        Ok(())
    }

    fn notify(&self, def: &Arc<MapperDef>) {
        // Snapshot first so listeners can re-enter the registry.
        let listeners: Vec<ConfiguredListener> =
            self.listeners.read().unwrap().iter().map(Arc::clone).collect();
        for listener in listeners {
            listener(def);
        }
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mappers = self.mappers.read().unwrap();
        f.debug_struct("MapperRegistry")
            .field("mappers", &mappers.len())
            .finish()
    }
}
