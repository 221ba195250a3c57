mod common;

use common::{Counter, text};
use nestedtypes_model::{AttrType, Collection, ModelClass, SetOptions, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Members with ids 1..=3 whose names are their ids as strings.
fn source() -> Collection {
    let named = ModelClass::define("Named")
        .attr("name", AttrType::String)
        .build()
        .unwrap();
    named
        .collection()
        .create((1..=3).map(|id| json!({ "id": id, "name": id })))
}

// ── Model references ─────────────────────────────────────────────

fn ref_class(models: &Collection) -> ModelClass {
    ModelClass::define("M")
        .attr("ref", AttrType::reference(models))
        .build()
        .unwrap()
}

#[test]
fn ids_resolve_against_the_source() {
    let models = source();
    let m = ref_class(&models).create_with(json!({ "id": 1, "ref": 1 }), &SetOptions::parse());

    let target = m.get("ref").unwrap();
    assert_eq!(text(target.as_model().unwrap(), "name"), "1");
}

#[test]
fn models_can_be_assigned_directly() {
    let models = source();
    let m = ref_class(&models).create(json!({ "ref": 1 }));

    m.set_attr("ref", models.get(2).unwrap()).unwrap();

    let target = m.get("ref").unwrap();
    assert_eq!(text(target.as_model().unwrap(), "name"), "2");
}

#[test]
fn references_serialize_as_ids() {
    let models = source();
    let m = ref_class(&models).create(json!({ "ref": 1 }));
    assert_eq!(m.to_json()["ref"], json!(1));

    m.set_attr("ref", models.get(2).unwrap()).unwrap();
    assert_eq!(m.to_json()["ref"], json!(2));
}

#[test]
fn unresolved_ids_read_as_null_until_the_member_appears() {
    let models = source();
    let m = ref_class(&models).create(json!({ "ref": 7 }));

    assert_eq!(m.get("ref").unwrap(), Value::Null);
    assert_eq!(m.to_json()["ref"], json!(7));

    models.add([json!({ "id": 7, "name": "late" })]);
    let target = m.get("ref").unwrap();
    assert_eq!(text(target.as_model().unwrap(), "name"), "late");
}

#[test]
fn mappings_assign_by_their_id() {
    let models = source();
    let m = ref_class(&models).create(Value::Null);

    m.set_attr("ref", json!({ "id": 3, "name": "ignored" })).unwrap();

    assert_eq!(m.attribute("ref"), Some(Value::from(3)));
    assert_eq!(text(m.get("ref").unwrap().as_model().unwrap(), "name"), "3");
}

#[test]
fn referenced_model_changes_do_not_bubble() {
    let models = source();
    let m = ref_class(&models).create(Value::Null);
    m.set_attr("ref", models.get(1).unwrap()).unwrap();
    let change = Counter::new();
    change.watch(&m, "change");

    models.get(1).unwrap().set_attr("name", "renamed").unwrap();

    assert_eq!(change.count(), 0);
}

// ── Subsets ──────────────────────────────────────────────────────

fn subset_class(models: &Collection) -> ModelClass {
    ModelClass::define("M")
        .attr("refs", AttrType::subset(models))
        .build()
        .unwrap()
}

#[test]
fn subset_ids_resolve_against_the_source() {
    let models = source();
    let m = subset_class(&models).create_with(json!({ "id": 1, "refs": [1, 2] }), &SetOptions::parse());
    let refs = common::items(&m, "refs");

    assert_eq!(text(&refs.get(1).unwrap(), "name"), "1");
    assert_eq!(text(&refs.get(2).unwrap(), "name"), "2");
    assert!(refs.get(1).unwrap().ptr_eq(&models.get(1).unwrap()));
    assert!(refs.source().unwrap().ptr_eq(&models));
}

#[test]
fn subset_accepts_model_arrays_and_serializes_ids() {
    let models = source();
    let m = subset_class(&models).create(json!({ "refs": [1, 2] }));

    m.set_attr("refs", vec![Value::from(models.get(2).unwrap())])
        .unwrap();

    let refs = common::items(&m, "refs");
    assert_eq!(text(&refs.first().unwrap(), "name"), "2");
    assert_eq!(m.to_json()["refs"], json!([2]));
}

#[test]
fn subset_skips_unknown_ids() {
    let models = source();
    let m = subset_class(&models).create(json!({ "refs": [3, 99] }));
    assert_eq!(m.to_json()["refs"], json!([3]));
}

#[test]
fn subset_does_not_own_its_members() {
    let models = source();
    let m = subset_class(&models).create(json!({ "refs": [1] }));
    let source_change = Counter::new();
    source_change.watch_collection(&models, "change");
    let change = Counter::new();
    change.watch(&m, "change");

    models.get(1).unwrap().set_attr("name", "still owned").unwrap();

    assert_eq!(source_change.count(), 1);
    assert_eq!(change.count(), 0);
}

#[test]
fn subset_membership_changes_bubble_to_the_owner() {
    let models = source();
    let m = subset_class(&models).create(json!({ "refs": [1] }));

    common::assert_single_change(&m, "refs", |m| {
        common::items(m, "refs").add([Value::from(2)]);
    });
    assert_eq!(m.to_json()["refs"], json!([1, 2]));
}

#[test]
fn bulk_set_updates_subset_in_place() {
    let models = source();
    let m = subset_class(&models).create(json!({ "refs": [1] }));
    let refs = common::items(&m, "refs");

    m.set(json!({ "refs": [2, 3] })).unwrap();

    assert!(common::items(&m, "refs").ptr_eq(&refs));
    assert_eq!(m.to_json()["refs"], json!([2, 3]));
}
