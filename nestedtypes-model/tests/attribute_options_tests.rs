mod common;

use common::{Counter, number};
use nestedtypes_model::{AttrOptions, AttrSpec, AttrType, ModelClass, Value};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Set hook that writes twice the value itself, then returns the input.
fn doubling_setter() -> AttrOptions {
    AttrOptions::new().set(|model, value| {
        let doubled = value.as_f64().unwrap_or(f64::NAN) * 2.0;
        model.set_attr("attr", doubled).unwrap();
        value
    })
}

// ── Set and get hooks ────────────────────────────────────────────

#[test]
fn self_write_inside_set_hook_wins() {
    let class = ModelClass::define("M")
        .attr("attr", AttrType::Number.value(5).options(doubling_setter()))
        .build()
        .unwrap();
    let m = class.create(Value::Null);

    assert_eq!(number(&m, "attr"), 5.0);
    m.set_attr("attr", 4).unwrap();
    assert_eq!(number(&m, "attr"), 8.0);
}

#[test]
fn get_hook_applies_on_top_of_set_hook() {
    let class = ModelClass::define("M1")
        .attr(
            "attr",
            AttrType::Number.value(5).options(
                doubling_setter().get(|_, stored| Value::from(stored.as_f64().unwrap_or(f64::NAN) + 1.0)),
            ),
        )
        .build()
        .unwrap();
    let m1 = class.create(Value::Null);

    assert_eq!(number(&m1, "attr"), 6.0);
    m1.set_attr("attr", 4).unwrap();
    assert_eq!(number(&m1, "attr"), 9.0);
}

#[test]
fn set_hook_result_is_coerced() {
    let class = ModelClass::define("M")
        .attr(
            "n",
            AttrType::Number.options(AttrOptions::new().set(|_, v| {
                Value::from(format!("{}0", v.to_text()))
            })),
        )
        .build()
        .unwrap();
    let m = class.create(Value::Null);

    m.set_attr("n", 4).unwrap();

    assert_eq!(m.get("n").unwrap(), Value::Number(40.0));
}

#[test]
fn self_writing_hook_fires_one_change() {
    let class = ModelClass::define("M")
        .attr("attr", AttrType::Number.value(5).options(doubling_setter()))
        .build()
        .unwrap();
    let m = class.create(Value::Null);
    let change = Counter::new();
    change.watch(&m, "change");
    let attr_change = Counter::new();
    attr_change.watch(&m, "change:attr");

    m.set(json!({ "attr": 4 })).unwrap();

    assert_eq!(number(&m, "attr"), 8.0);
    assert_eq!(change.count(), 1);
    assert_eq!(attr_change.count(), 1);
}

// ── Descriptor composition ───────────────────────────────────────

#[test]
fn options_layer_without_mutating_the_base() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let base = AttrSpec::new(AttrType::Number).options(AttrOptions::new().extra("unit", "ms"));
    let hooked = base.options(AttrOptions::new().set(move |_, v| {
        sink.borrow_mut().push(v.clone());
        v
    }));
    let class = ModelClass::define("M")
        .attr("plain", base.clone())
        .attr("hooked", hooked.clone())
        .build()
        .unwrap();
    let m = class.create(Value::Null);

    m.set_attr("plain", 1).unwrap();
    m.set_attr("hooked", 2).unwrap();

    assert_eq!(*seen.borrow(), vec![Value::from(2)]);
    assert_eq!(base.option("unit"), Some(&Value::from("ms")));
    assert_eq!(hooked.option("unit"), Some(&Value::from("ms")));
}

#[test]
fn later_value_overrides_earlier_default() {
    let spec = AttrType::Number.value(1).options(AttrOptions::new().value(2));
    let class = ModelClass::define("M").attr("n", spec).build().unwrap();
    assert_eq!(number(&class.create(Value::Null), "n"), 2.0);
}

#[test]
fn trigger_when_changed_defaults_to_true() {
    let n = common::n_class();
    assert!(AttrSpec::from(&n).triggers_when_changed());
    assert!(
        !n.options(AttrOptions::new().trigger_when_changed(false))
            .triggers_when_changed()
    );
}
