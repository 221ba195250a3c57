mod common;

use common::{Counter, assert_single_change, child, increment, init_tracing, items, number};
use nestedtypes_model::{AttrOptions, Comparator, Model, ModelClass, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn compound() -> Model {
    let n = common::n_class();
    common::main_class(&n)
        .extend("Compound")
        .attr("items", n.collection())
        .build()
        .unwrap()
        .create(Value::Null)
}

// ── Model with nested model ──────────────────────────────────────

#[test]
fn nested_change_bubbles_once() {
    init_tracing();
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);

    assert_single_change(&model, "first", |model| {
        child(model, "first").set_attr("text", "bubble").unwrap();
    });
}

#[test]
fn bubbling_stops_where_disabled() {
    let n = common::n_class();
    let main = common::main_class(&n);
    let class = ModelClass::define("M")
        .attr("first", &main)
        .attr(
            "second",
            main.options(AttrOptions::new().trigger_when_changed(false)),
        )
        .build()
        .unwrap();
    let model = class.create(Value::Null);
    let second = Counter::new();
    second.watch(&model, "change:second");

    assert_single_change(&model, "first", |model| {
        child(&child(model, "first"), "first")
            .set_attr("text", "bubble")
            .unwrap();
        child(&child(model, "second"), "first")
            .set_attr("text", "not bubble")
            .unwrap();
    });
    assert_eq!(second.count(), 0);
}

#[test]
fn local_handlers_do_not_cause_extra_change_events() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);

    assert_single_change(&model, "first", |model| {
        model.on("change:first", |event| {
            increment(event.source.as_model().unwrap(), "count");
        });
        model.on("change:first", |event| {
            increment(event.source.as_model().unwrap(), "sum");
        });
        child(model, "first").set_attr("text", "bubble").unwrap();
    });

    assert_eq!(number(&model, "count"), 1.0);
    assert_eq!(number(&model, "sum"), 1.0);
}

#[test]
fn bulk_change_reports_each_attribute_once() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);
    let first = child(&model, "first");

    assert_single_change(&model, "first second count", |model| {
        model
            .set(json!({
                "count": 1,
                "first": { "time": "2012-12-12 12:12", "text": "hi" },
                "second": { "time": "2012-12-12 12:12", "text": "hi" }
            }))
            .unwrap();
    });

    // Plain data updates the nested model in place.
    assert!(child(&model, "first").ptr_eq(&first));
    assert_eq!(number(&model, "count"), 1.0);
}

#[test]
fn unchanged_write_fires_nothing() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);
    let all = Counter::new();
    all.watch(&model, "all");

    model.set_attr("count", 0).unwrap();
    model.set(json!({ "first": { "text": "" }, "sum": "0" })).unwrap();

    assert_eq!(all.count(), 0);
}

#[test]
fn change_reverted_within_a_batch_fires_nothing() {
    let class = ModelClass::define("M")
        .attr("a", 1)
        .attr("b", 1)
        .attr(
            "c",
            nestedtypes_model::AttrType::Number.options(AttrOptions::new().set(|model, v| {
                // Touches `a` and puts it back.
                model.set_attr("a", 2).unwrap();
                model.set_attr("a", 1).unwrap();
                v
            })),
        )
        .build()
        .unwrap();
    let model = class.create(Value::Null);
    let a = Counter::new();
    a.watch(&model, "change:a");

    assert_single_change(&model, "c", |model| model.set_attr("c", 5).unwrap());
    assert_eq!(a.count(), 0);
}

#[test]
fn handler_writes_start_another_round() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);
    let count_changes = Counter::new();
    count_changes.watch(&model, "change:count");
    let change = Counter::new();
    change.watch(&model, "change");

    // A `change` listener that writes once more.
    model.on("change", |event| {
        let model = event.source.as_model().unwrap();
        if number(model, "count") < 2.0 {
            increment(model, "count");
        }
    });

    model.set_attr("count", 1).unwrap();

    assert_eq!(number(&model, "count"), 2.0);
    assert_eq!(count_changes.count(), 2);
    assert_eq!(change.count(), 2);
}

#[test]
fn silent_updates_fire_and_bubble_nothing() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);
    let all = Counter::new();
    all.watch(&model, "all");
    let first = child(&model, "first");
    let local = Counter::new();
    local.watch(&first, "all");

    model
        .set_with(
            json!({ "count": 3, "first": { "text": "quiet" } }),
            &nestedtypes_model::SetOptions::silent(),
        )
        .unwrap();

    assert_eq!(all.count(), 0);
    assert_eq!(local.count(), 0);
    assert_eq!(number(&model, "count"), 3.0);
    assert_eq!(common::text(&first, "text"), "quiet");
}

#[test]
fn replaced_nested_model_stops_bubbling() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);
    let old = child(&model, "first");
    model.set_attr("first", n.create(Value::Null)).unwrap();

    let change = Counter::new();
    change.watch(&model, "change");
    old.set_attr("text", "orphan").unwrap();
    assert_eq!(change.count(), 0);

    child(&model, "first").set_attr("text", "adopted").unwrap();
    assert_eq!(change.count(), 1);
}

#[test]
fn moved_nested_model_bubbles_to_its_new_slot_only() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);
    let first = child(&model, "first");
    model.set_attr("second", &first).unwrap();

    assert_single_change(&model, "second", |_| {
        first.set_attr("text", "moved").unwrap();
    });
}

#[test]
fn previous_values_are_kept_for_the_last_change() {
    let n = common::n_class();
    let model = common::main_class(&n).create(Value::Null);

    model.set(json!({ "count": 4, "sum": 1 })).unwrap();

    assert_eq!(model.previous("count"), Some(Value::from(0)));
    assert_eq!(model.previous("sum"), Some(Value::from(0)));
    assert!(model.has_changed("count"));
    assert!(!model.has_changed("first"));
    assert_eq!(model.changed_attributes().len(), 2);

    model.set_attr("count", 5).unwrap();
    assert_eq!(model.previous("count"), Some(Value::from(4)));
    assert_eq!(model.previous("sum"), Some(Value::from(1)));
    assert!(!model.has_changed("sum"));
}

// ── Model with nested collection ─────────────────────────────────

#[test]
fn nested_collection_operations_each_fire_one_change() {
    init_tracing();
    let compd = compound();
    let coll = items(&compd, "items");

    assert_single_change(&compd, "items", |_| {
        coll.create(json!({ "time": "2012-12-12 12:12" }));
    });

    assert_single_change(&compd, "items", |_| {
        coll.add([
            json!({ "time": "2012-12-12 12:12" }),
            json!({ "time": "2012-12-12 12:12" }),
        ]);
    });
    assert_eq!(coll.len(), 3);

    assert_single_change(&compd, "items", |_| {
        coll.first().unwrap().set_attr("text", "Hi there!").unwrap();
    });

    assert_single_change(&compd, "items", |_| {
        coll.remove([coll.first().unwrap()]);
    });
    assert_single_change(&compd, "items", |_| {
        coll.remove([coll.first().unwrap(), coll.last().unwrap()]);
    });
    assert!(coll.is_empty());

    assert_single_change(&compd, "items", |_| {
        coll.reset([
            json!({ "id": 1, "time": "2012-12-12 12:12" }),
            json!({ "id": 2, "time": "2012-12-12 12:13" }),
            json!({ "id": 3, "time": "2012-12-12 12:14" }),
        ]);
        assert_eq!(coll.len(), 3);
    });

    assert_single_change(&compd, "items", |_| {
        coll.set_comparator(Some(Comparator::from("time")));
        coll.sort().unwrap();
    });

    assert_single_change(&compd, "items", |_| {
        coll.set([
            json!({ "id": 3, "time": "2012-12-12 12:12" }),
            json!({ "id": 4, "time": "2012-12-12 12:13" }),
            json!({ "id": 5, "time": "2012-12-12 12:14" }),
        ]);
        assert_eq!(coll.len(), 3);
    });
    let ids: Vec<Value> = coll.models().iter().map(Model::id).collect();
    assert_eq!(ids, vec![Value::from(3), Value::from(4), Value::from(5)]);

    assert_single_change(&compd, "items", |model| {
        model
            .set(json!({
                "items": [
                    { "id": 4, "time": "2012-12-12 12:12" },
                    { "id": 5, "time": "2012-12-12 12:13" },
                    { "id": 6, "time": "2012-12-12 12:14" }
                ],
                "first": { "text": "Hi" },
                "second": { "text": "Lo" }
            }))
            .unwrap();
    });
    assert!(items(&compd, "items").ptr_eq(&coll));
    assert_eq!(coll.len(), 3);
}

#[test]
fn member_id_change_reindexes_the_collection() {
    let compd = compound();
    let coll = items(&compd, "items");
    coll.add([json!({ "id": 1 })]);

    coll.get(1).unwrap().set_attr("id", 10).unwrap();

    assert!(coll.get(1).is_none());
    assert!(coll.get(10).is_some());
}

// ── Laws ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn one_bulk_update_fires_at_most_one_change(
        updates in prop::collection::vec((0..3i32, 0..3i32, "[ab]{0,2}"), 1..8)
    ) {
        let n = common::n_class();
        let model = common::main_class(&n).create(Value::Null);
        for (count, sum, text) in updates {
            let before = model.to_json();
            let change = Counter::new();
            let id = change.watch(&model, "change");

            model
                .set(json!({ "count": count, "sum": sum, "first": { "text": text } }))
                .unwrap();

            model.off(id);
            let expected = usize::from(before != model.to_json());
            prop_assert_eq!(change.count(), expected);
        }
    }
}
