//! Graph engine scenarios through the facade: serialize with relation
//! specs, deserialize with instance sharing, and spec-driven cloning.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use sqlform::prelude::*;

fn registry() -> Arc<MapperRegistry> {
    let registry = Arc::new(MapperRegistry::new());
    registry.register(
        MapperDef::new(
            "Owner",
            TableDef::new("owners")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("first_name", LogicalType::Text)),
        )
        .relation(
            RelationDef::new("vehicles", "Vehicle")
                .kind(RelationKind::OneToMany)
                .pair("id", "owner_id"),
        ),
    );
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
    registry
}

fn sample_owner() -> EntityRef {
    let mut ada = Entity::new("Owner");
    ada.set("id", Value::Int(9));
    ada.set("first_name", Value::Text("Ada".to_string()));
    let ada = ada.into_ref();

    let mut wagon = Entity::new("Vehicle");
    wagon.set("id", Value::Int(1));
    wagon.set("name", Value::Text("wagon".to_string()));
    wagon.set("owner_id", Value::Int(9));
    let wagon = wagon.into_ref();
    wagon
        .borrow_mut()
        .set_relation("owner", RelationValue::One(Some(Rc::clone(&ada))));

    let mut truck = Entity::new("Vehicle");
    truck.set("id", Value::Int(2));
    truck.set("name", Value::Text("truck".to_string()));
    truck.set("owner_id", Value::Int(9));
    let truck = truck.into_ref();
    truck
        .borrow_mut()
        .set_relation("owner", RelationValue::One(Some(Rc::clone(&ada))));

    ada.borrow_mut()
        .set_relation("vehicles", RelationValue::Many(vec![wagon, truck]));
    ada
}

#[test]
fn serialize_then_deserialize_shares_instances() {
    let cache = MetaCache::new(registry());
    let ada = sample_owner();

    let include = [
        RelationSpec::new("Owner", "vehicles"),
        RelationSpec::new("Vehicle", "owner"),
    ];
    let json = serialize(&ada, &cache, &include).unwrap();
    assert_eq!(json["first_name"], serde_json::json!("Ada"));
    assert_eq!(json["vehicles"][0]["name"], serde_json::json!("wagon"));
    // The nested vehicles spent the owner spec on the way down.
    assert!(json["vehicles"][0].get("owner").is_none());

    let roots = deserialize(&cache, &EntityKey::new("Owner"), &json).unwrap();
    let rebuilt = &roots[0];
    let vehicles: Vec<EntityRef> = rebuilt
        .borrow()
        .relation("vehicles")
        .unwrap()
        .as_many()
        .unwrap()
        .to_vec();
    assert_eq!(vehicles.len(), 2);

    // Foreign-key backfill pointed both vehicles at the one rebuilt owner.
    for vehicle in &vehicles {
        let entity = vehicle.borrow();
        let back = entity.relation("owner").unwrap().as_one().unwrap();
        assert!(Rc::ptr_eq(back, rebuilt));
    }
}

#[test]
fn deserialize_shares_repeated_primary_keys() {
    let cache = MetaCache::new(registry());
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
    assert_eq!(
        a.borrow().get("first_name"),
        Some(&Value::Text("Ada".to_string()))
    );
}

#[test]
fn clone_strips_identity_and_references() {
    let cache = MetaCache::new(registry());
    let info = cache.get_or_build(&EntityKey::new("Owner")).unwrap();
    let ada = sample_owner();

    let specs = [CloneSpec::new("Owner", "vehicles")
        .override_value("name", Value::Text("copy".to_string()))];
    let clone = clone_entity(&ada, &cache, &specs, &HashMap::new()).unwrap();

    let entity = clone.borrow();
    assert!(info.identity_key_from_instance(&entity).is_none());
    assert_eq!(
        entity.get("first_name"),
        Some(&Value::Text("Ada".to_string()))
    );

    let vehicles = entity.relation("vehicles").unwrap().as_many().unwrap();
    assert_eq!(vehicles.len(), 2);
    for vehicle in vehicles {
        let v = vehicle.borrow();
        assert!(!v.has("id"));
        assert!(!v.has("owner_id"));
        assert_eq!(v.get("name"), Some(&Value::Text("copy".to_string())));
        // The vehicles' own owner relation was not in the clone-spec set.
        assert!(v.relation("owner").is_none());
    }
}

#[test]
fn serialized_validation_errors_nest_like_the_model() {
    let cache = MetaCache::new(registry());
    let info = cache.get_or_build(&EntityKey::new("Owner")).unwrap();

    let owner = Entity::new("Owner").into_ref();
    owner.borrow_mut().set_null("id");
    // id is a primary key with no default: blank fails required.
    let err = info
        .full_clean(&owner, &cache, &["first_name"])
        .unwrap_err();
    let json = err.to_json();
    assert!(json.get("id").is_some());
}
