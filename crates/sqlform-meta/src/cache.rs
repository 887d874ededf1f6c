//! The metadata cache.
//!
//! One [`ModelInfo`] per mapped class, built lazily on first lookup and kept
//! current through mapper-configured events. The cache never rebuilds a
//! descriptor; configuration events refresh the existing one in place, so
//! every holder of the `Arc` observes later-declared relationships and
//! composites.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use sqlform_core::error::{Error, Result};
use sqlform_core::instance::Entity;
use sqlform_core::mapper::{EntityKey, MapperDef};
use sqlform_core::registry::MapperRegistry;

use crate::column::{SpecializationRegistry, specialization_registry};
use crate::model::ModelInfo;

/// Anything that names a mapped class for a cache lookup.
///
/// A class token, a live instance, and the mapper definition itself all
/// normalize to the owning class.
#[derive(Debug, Clone, Copy)]
pub enum MetaTarget<'a> {
    /// The class token itself.
    Class(&'a EntityKey),
    /// An instance of the class.
    Instance(&'a Entity),
    /// The class's mapper definition.
    Mapper(&'a MapperDef),
}

impl MetaTarget<'_> {
    /// The owning class token.
    #[must_use]
    pub fn class(&self) -> &EntityKey {
        match self {
            MetaTarget::Class(key) => key,
            MetaTarget::Instance(entity) => entity.class(),
            MetaTarget::Mapper(def) => &def.entity,
        }
    }
}

impl<'a> From<&'a EntityKey> for MetaTarget<'a> {
    fn from(key: &'a EntityKey) -> Self {
        MetaTarget::Class(key)
    }
}

impl<'a> From<&'a Entity> for MetaTarget<'a> {
    fn from(entity: &'a Entity) -> Self {
        MetaTarget::Instance(entity)
    }
}

impl<'a> From<&'a MapperDef> for MetaTarget<'a> {
    fn from(def: &'a MapperDef) -> Self {
        MetaTarget::Mapper(def)
    }
}

/// Registry of model descriptors, one per mapped class.
///
/// Lookups go through a read lock; the first build for a class takes the
/// write lock and re-checks before inserting, so concurrent first access
/// still yields exactly one descriptor. The first build also subscribes to
/// the mapper registry's configured events, which keep every cached
/// descriptor current as later declarations arrive.
pub struct MetaCache {
    mappers: Arc<MapperRegistry>,
    rules: Option<Arc<SpecializationRegistry>>,
    models: Arc<RwLock<HashMap<EntityKey, Arc<ModelInfo>>>>,
    subscription: OnceLock<()>,
}

impl MetaCache {
    /// Create a cache over a mapper registry, using the process-wide
    /// specialization rules.
    #[must_use]
    pub fn new(mappers: Arc<MapperRegistry>) -> Self {
        Self {
            mappers,
            rules: None,
            models: Arc::new(RwLock::new(HashMap::new())),
            subscription: OnceLock::new(),
        }
    }

    /// Create a cache with an injected specialization rule table.
    #[must_use]
    pub fn with_rules(mappers: Arc<MapperRegistry>, rules: Arc<SpecializationRegistry>) -> Self {
        Self {
            mappers,
            rules: Some(rules),
            models: Arc::new(RwLock::new(HashMap::new())),
            subscription: OnceLock::new(),
        }
    }

    /// The mapper registry this cache reflects.
    #[must_use]
    pub fn mappers(&self) -> &Arc<MapperRegistry> {
        &self.mappers
    }

    fn rules(&self) -> &SpecializationRegistry {
        self.rules
            .as_deref()
            .unwrap_or_else(|| specialization_registry())
    }

    /// Get the descriptor for a class, building it on first access.
    ///
    /// Accepts a class token, an instance, or a mapper definition; every
    /// call for the same class returns the identical `Arc`.
    pub fn get_or_build<'a>(&self, target: impl Into<MetaTarget<'a>>) -> Result<Arc<ModelInfo>> {
        let target = target.into();
        let class = target.class();

        if let Some(info) = self.models.read().unwrap().get(class) {
            return Ok(Arc::clone(info));
        }

        let def = self
            .mappers
            .get(class)
            .ok_or_else(|| Error::UnregisteredModel(class.to_string()))?;

        self.subscribe();

        let info = Arc::new(ModelInfo::new(class.clone()));
        info.refresh(&def, &self.mappers, self.rules());

        let mut models = self.models.write().unwrap();
        if let Some(existing) = models.get(class) {
            // Lost a first-build race; the winner's descriptor stands.
            return Ok(Arc::clone(existing));
        }
        models.insert(class.clone(), Arc::clone(&info));
        drop(models);

        tracing::debug!(model = %class, "Model descriptor built");
        Ok(info)
    }

    /// The descriptor for a class, if one has been built.
    #[must_use]
    pub fn get(&self, class: &EntityKey) -> Option<Arc<ModelInfo>> {
        self.models.read().unwrap().get(class).cloned()
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.read().unwrap().len()
    }

    /// Whether no descriptor has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.read().unwrap().is_empty()
    }

    fn subscribe(&self) {
        self.subscription.get_or_init(|| {
            let models = Arc::clone(&self.models);
            let mappers = Arc::clone(&self.mappers);
            let rules = self.rules.clone();
            self.mappers.on_configured(move |def| {
                let rules: &SpecializationRegistry = rules
                    .as_deref()
                    .unwrap_or_else(|| specialization_registry());
                let snapshot: Vec<(EntityKey, Arc<ModelInfo>)> = models
                    .read()
                    .unwrap()
                    .iter()
                    .map(|(k, v)| (k.clone(), Arc::clone(v)))
                    .collect();
                for (class, info) in snapshot {
                    if class == def.entity {
                        tracing::debug!(model = %class, "Descriptor refreshed from configure event");
                        info.refresh(def, &mappers, rules);
                    } else {
                        // A new mapper may satisfy another model's pending
                        // relations.
                        info.resolve_pending(&mappers);
                    }
                }
            });
        });
    }
}

impl std::fmt::Debug for MetaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaCache")
            .field("models", &self.len())
            .finish()
    }
}
