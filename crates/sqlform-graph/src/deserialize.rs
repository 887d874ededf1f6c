//! Graph deserialization.
//!
//! JSON input becomes entity instances: scalar values coerce through each
//! column's logical type, nested objects under relationship names recurse,
//! and a per-call identity map makes every reference to the same primary key
//! resolve to the same shared instance. A second pass backfills to-one
//! relationships that arrived as bare foreign-key columns, pairing local
//! columns to the related primary key through the relationship descriptor.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use sqlform_core::coerce::coerce;
use sqlform_core::error::{Error, Result};
use sqlform_core::instance::{CompositeValue, Entity, EntityRef, RelationValue};
use sqlform_core::mapper::EntityKey;
use sqlform_core::value::Value;
use sqlform_meta::cache::MetaCache;
use sqlform_meta::identity::IdentityKey;
use sqlform_meta::model::ModelInfo;

/// Deserialize one JSON object, or an array of them, into instances of
/// `class`.
///
/// Repeated references to the same primary key in one call come back as the
/// same `Rc` instance; clones are never created for rows already seen.
pub fn deserialize(
    cache: &MetaCache,
    class: &EntityKey,
    data: &serde_json::Value,
) -> Result<Vec<EntityRef>> {
    let mut identity_map: HashMap<IdentityKey, EntityRef> = HashMap::new();
    let mut constructed: Vec<(Arc<ModelInfo>, EntityRef)> = Vec::new();

    let roots = match data {
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(build_entity(
                    cache,
                    class,
                    item,
                    &mut identity_map,
                    &mut constructed,
                )?);
            }
            out
        }
        single => vec![build_entity(
            cache,
            class,
            single,
            &mut identity_map,
            &mut constructed,
        )?],
    };

    backfill_relations(cache, &constructed, &identity_map);
    Ok(roots)
}

fn build_entity(
    cache: &MetaCache,
    class: &EntityKey,
    data: &serde_json::Value,
    identity_map: &mut HashMap<IdentityKey, EntityRef>,
    constructed: &mut Vec<(Arc<ModelInfo>, EntityRef)>,
) -> Result<EntityRef> {
    let serde_json::Value::Object(fields) = data else {
        return Err(Error::malformed(format!(
            "expected an object for `{class}`, got {data}"
        )));
    };
    let info = cache.get_or_build(class)?;

    // Scalars first, so the identity key is known before any recursion.
    let mut scalars: HashMap<String, Value> = HashMap::new();
    for column in info.columns() {
        let Some(raw) = fields.get(column.name()) else {
            continue;
        };
        if raw.is_null() {
            scalars.insert(column.name().to_string(), Value::Null);
            continue;
        }
        let coerced = coerce(&Value::from_json(raw), column.logical_type())?;
        scalars.insert(column.name().to_string(), coerced);
    }

    if let Some(key) = info.identity_key_from_dict(&scalars) {
        if let Some(existing) = identity_map.get(&key) {
            // A row we already built. Share it; fill only the scalars the
            // first occurrence left unset, and ignore any nested
            // relationships on the duplicate so cyclic input terminates.
            let shared = Rc::clone(existing);
            let mut entity = shared.borrow_mut();
            for (name, value) in scalars {
                if !entity.has(&name) {
                    entity.set(name, value);
                }
            }
            drop(entity);
            return Ok(shared);
        }
    }

    let mut entity = Entity::new(class.clone());
    for (name, value) in scalars {
        entity.set(name, value);
    }

    for composite in info.composites() {
        let Some(raw) = fields.get(composite.name()) else {
            continue;
        };
        let serde_json::Value::Object(nested) = raw else {
            if raw.is_null() {
                continue;
            }
            return Err(Error::malformed(format!(
                "expected an object for composite `{}`, got {raw}",
                composite.name()
            )));
        };
        let mut value = CompositeValue::new(composite.type_name());
        for field in composite.fields() {
            let Some(raw_field) = nested.get(field.name()) else {
                continue;
            };
            if raw_field.is_null() {
                value.set(field.name(), Value::Null);
                continue;
            }
            let coerced = coerce(&Value::from_json(raw_field), field.logical_type())?;
            value.set(field.name(), coerced);
        }
        entity.set_composite(composite.name(), value);
    }

    let entity_ref = entity.into_ref();
    if let Some(key) = info.identity_key_from_instance(&entity_ref.borrow()) {
        identity_map.insert(key, Rc::clone(&entity_ref));
    }
    constructed.push((Arc::clone(&info), Rc::clone(&entity_ref)));

    // Relationships last: the identity map already holds this instance, so
    // a child pointing back at it resolves to the same Rc.
    for relation in info.relations() {
        let Some(raw) = fields.get(relation.name()) else {
            continue;
        };
        let value = match raw {
            serde_json::Value::Null => RelationValue::One(None),
            serde_json::Value::Array(items) => {
                if !relation.kind().is_to_many() {
                    return Err(Error::malformed(format!(
                        "relationship `{}` is to-one but got an array",
                        relation.name()
                    )));
                }
                let mut targets = Vec::with_capacity(items.len());
                for item in items {
                    targets.push(build_entity(
                        cache,
                        relation.target(),
                        item,
                        identity_map,
                        constructed,
                    )?);
                }
                RelationValue::Many(targets)
            }
            single => {
                if relation.kind().is_to_many() {
                    return Err(Error::malformed(format!(
                        "relationship `{}` is to-many but got a single object",
                        relation.name()
                    )));
                }
                RelationValue::One(Some(build_entity(
                    cache,
                    relation.target(),
                    single,
                    identity_map,
                    constructed,
                )?))
            }
        };
        entity_ref.borrow_mut().set_relation(relation.name(), value);
    }

    Ok(entity_ref)
}

/// Link to-one relationships that arrived as bare foreign-key columns.
///
/// For each constructed instance whose to-one relationship is not loaded,
/// the relationship's identity-key pairing maps local column values onto the
/// related primary key; when the reconstructed key is in the identity map,
/// the relationship points at that shared instance.
fn backfill_relations(
    cache: &MetaCache,
    constructed: &[(Arc<ModelInfo>, EntityRef)],
    identity_map: &HashMap<IdentityKey, EntityRef>,
) {
    for (info, entity_ref) in constructed {
        for relation in info.relations() {
            if relation.kind().is_to_many() {
                continue;
            }
            if entity_ref.borrow().relation(relation.name()).is_some() {
                continue;
            }
            let pairs = relation.pairs_for_identity_key();
            if pairs.is_empty() {
                continue;
            }
            let Some(related_info) = cache.get(relation.target()) else {
                continue;
            };
            let mut remote_values: HashMap<String, Value> = HashMap::new();
            let mut complete = true;
            {
                let entity = entity_ref.borrow();
                for (local, remote) in &pairs {
                    match entity.get(local) {
                        Some(value) if !value.is_null() => {
                            remote_values.insert(remote.clone(), value.clone());
                        }
                        _ => {
                            complete = false;
                            break;
                        }
                    }
                }
            }
            if !complete {
                continue;
            }
            let Some(key) = related_info.identity_key_from_dict(&remote_values) else {
                continue;
            };
            if let Some(target) = identity_map.get(&key) {
                tracing::debug!(
                    model = %info.class(),
                    relation = relation.name(),
                    target = %key,
                    "Backfilled relationship from foreign-key columns"
                );
                entity_ref
                    .borrow_mut()
                    .set_relation(relation.name(), RelationValue::One(Some(Rc::clone(target))));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlform_core::mapper::{
        ColumnDef, CompositeDef, MapperDef, RelationDef, RelationKind, TableDef,
    };
    use sqlform_core::registry::MapperRegistry;
    use sqlform_core::types::LogicalType;

    fn cache() -> MetaCache {
        let registry = Arc::new(MapperRegistry::new());
        registry.register(MapperDef::new(
            "Owner",
            TableDef::new("owners")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("first_name", LogicalType::Text)),
        ));
        registry.register(
            MapperDef::new(
                "Vehicle",
                TableDef::new("vehicles")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                    .column(ColumnDef::new("name", LogicalType::Text))
                    .column(ColumnDef::new("owner_id", LogicalType::Integer)),
            )
            .relation(RelationDef::new("owner", "Owner").pair("owner_id", "id")),
        );
        MetaCache::new(registry)
    }

    #[test]
    fn test_scalars_coerce_through_logical_types() {
        let cache = cache();
        let data = serde_json::json!({"id": "7", "name": "wagon"});
        let roots = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap();
        assert_eq!(roots.len(), 1);
        let entity = roots[0].borrow();
        assert_eq!(entity.get("id"), Some(&Value::Int(7)));
        assert_eq!(entity.get("name"), Some(&Value::Text("wagon".to_string())));
        assert!(!entity.has("owner_id"));
    }

    #[test]
    fn test_array_input_yields_many_roots() {
        let cache = cache();
        let data = serde_json::json!([{"id": 1}, {"id": 2}]);
        let roots = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap();
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn test_non_object_input_fails() {
        let cache = cache();
        let err = deserialize(&cache, &EntityKey::new("Vehicle"), &serde_json::json!(5))
            .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_nested_relation_constructs_target() {
        let cache = cache();
        let data = serde_json::json!({
            "id": 1,
            "owner": {"id": 9, "first_name": "Ada"},
        });
        let roots = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap();
        let entity = roots[0].borrow();
        let owner = entity.relation("owner").unwrap().as_one().unwrap();
        assert_eq!(owner.borrow().get("first_name"), Some(&Value::Text("Ada".to_string())));
    }

    #[test]
    fn test_identity_map_shares_instances() {
        let cache = cache();
        let data = serde_json::json!([
            {"id": 1, "owner": {"id": 9, "first_name": "Ada"}},
            {"id": 2, "owner": {"id": 9}},
        ]);
        let roots = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap();
        let first = roots[0].borrow();
        let second = roots[1].borrow();
        let a = first.relation("owner").unwrap().as_one().unwrap();
        let b = second.relation("owner").unwrap().as_one().unwrap();
        assert!(Rc::ptr_eq(a, b));
        // The duplicate did not erase the first occurrence's attributes.
        assert_eq!(a.borrow().get("first_name"), Some(&Value::Text("Ada".to_string())));
    }

    #[test]
    fn test_backfill_links_foreign_key_reference() {
        let cache = cache();
        let data = serde_json::json!([
            {"id": 1, "owner": {"id": 9, "first_name": "Ada"}},
            {"id": 2, "owner_id": 9},
        ]);
        let roots = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap();
        let first = roots[0].borrow();
        let second = roots[1].borrow();
        let a = first.relation("owner").unwrap().as_one().unwrap();
        let b = second.relation("owner").unwrap().as_one().unwrap();
        assert!(Rc::ptr_eq(a, b));
    }

    #[test]
    fn test_backfill_skips_unknown_key() {
        let cache = cache();
        let data = serde_json::json!({"id": 2, "owner_id": 42});
        let roots = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap();
        assert!(roots[0].borrow().relation("owner").is_none());
    }

    #[test]
    fn test_cardinality_mismatch_fails() {
        let cache = cache();
        let data = serde_json::json!({"id": 1, "owner": [{"id": 9}]});
        let err = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_to_many_relation() {
        let registry = Arc::new(MapperRegistry::new());
        registry.register(MapperDef::new(
            "Vehicle",
            TableDef::new("vehicles")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("owner_id", LogicalType::Integer)),
        ));
        registry.register(
            MapperDef::new(
                "Owner",
                TableDef::new("owners")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key()),
            )
            .relation(
                RelationDef::new("vehicles", "Vehicle")
                    .kind(RelationKind::OneToMany)
                    .pair("id", "owner_id"),
            ),
        );
        let cache = MetaCache::new(registry);
        let data = serde_json::json!({
            "id": 9,
            "vehicles": [{"id": 1}, {"id": 2}],
        });
        let roots = deserialize(&cache, &EntityKey::new("Owner"), &data).unwrap();
        let owner = roots[0].borrow();
        let vehicles = owner.relation("vehicles").unwrap().as_many().unwrap();
        assert_eq!(vehicles.len(), 2);
    }

    #[test]
    fn test_composite_object_coerces_fields() {
        let registry = Arc::new(MapperRegistry::new());
        registry.register(
            MapperDef::new(
                "Business",
                TableDef::new("businesses")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                    .column(ColumnDef::new("_location_city", LogicalType::Text))
                    .column(ColumnDef::new("_location_zip", LogicalType::Integer)),
            )
            .composite(
                CompositeDef::new("location", "Address")
                    .column(ColumnDef::new("city", LogicalType::Text))
                    .column(ColumnDef::new("zip", LogicalType::Integer)),
            ),
        );
        let cache = MetaCache::new(registry);
        let data = serde_json::json!({
            "id": 1,
            "location": {"city": "Springfield", "zip": "12345"},
        });
        let roots = deserialize(&cache, &EntityKey::new("Business"), &data).unwrap();
        let entity = roots[0].borrow();
        let location = entity.composite("location").unwrap();
        assert_eq!(location.type_name(), "Address");
        assert_eq!(location.get("zip"), Some(&Value::Int(12345)));
    }

    #[test]
    fn test_coercion_failure_surfaces() {
        let cache = cache();
        let data = serde_json::json!({"id": "not-a-number"});
        let err = deserialize(&cache, &EntityKey::new("Vehicle"), &data).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
