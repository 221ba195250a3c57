mod common;

use common::{Counter, child};
use nestedtypes_model::{Handler, ModelClass, SchemaError, Value};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

struct Probes {
    left: Rc<Cell<usize>>,
    right: Rc<Cell<usize>>,
}

/// `left`/`right` hold N; `left` listens inline, `right` through a method.
fn listening_class() -> (ModelClass, Probes) {
    let n = common::n_class();
    let left = Rc::new(Cell::new(0));
    let right = Rc::new(Cell::new(0));
    let (l, r) = (Rc::clone(&left), Rc::clone(&right));
    let class = ModelClass::define("M")
        .attr("left", &n)
        .attr("right", &n)
        .method("onRight", move |_, _| r.set(r.get() + 1))
        .listen(
            "left",
            "change:number",
            Handler::func(move |_, _| l.set(l.get() + 1)),
        )
        .listen("right", "change:time change:text", "onRight")
        .build()
        .unwrap();
    (class, Probes { left, right })
}

// ── Wiring ───────────────────────────────────────────────────────

#[test]
fn handlers_fire_for_declared_events_only() {
    let (class, probes) = listening_class();
    let m = class.create(Value::Null);

    child(&m, "left").set_attr("number", 5).unwrap();
    child(&m, "left").set_attr("text", "ignored").unwrap();
    child(&m, "right").set_attr("text", "hello").unwrap();
    child(&m, "right").set_attr("time", 0).unwrap();

    assert_eq!(probes.left.get(), 1);
    assert_eq!(probes.right.get(), 2);
}

#[test]
fn handler_receives_the_owner_and_the_event() {
    let n = common::n_class();
    let seen = Rc::new(Cell::new(false));
    let sink = Rc::clone(&seen);
    let class = ModelClass::define("M")
        .attr("left", &n)
        .listen(
            "left",
            "change:text",
            Handler::func(move |owner, event| {
                let from_child = event
                    .source
                    .as_model()
                    .is_some_and(|m| m.ptr_eq(&child(owner, "left")));
                sink.set(from_child && event.attribute() == Some("text"));
            }),
        )
        .build()
        .unwrap();
    let m = class.create(Value::Null);

    child(&m, "left").set_attr("text", "x").unwrap();

    assert!(seen.get());
}

#[test]
fn subscriptions_follow_the_current_value() {
    let (class, probes) = listening_class();
    let n = common::n_class();
    let m = class.create(Value::Null);
    let old = child(&m, "left");

    m.set_attr("left", n.create(Value::Null)).unwrap();
    old.set_attr("number", 9).unwrap();
    assert_eq!(probes.left.get(), 0);

    child(&m, "left").set_attr("number", 9).unwrap();
    assert_eq!(probes.left.get(), 1);
}

#[test]
fn subscriptions_are_released_with_the_owner() {
    let (class, probes) = listening_class();
    let m = class.create(Value::Null);
    let left = child(&m, "left");
    let watchers = Counter::new();
    watchers.watch(&left, "change:number");

    drop(m);
    left.set_attr("number", 2).unwrap();

    assert_eq!(probes.left.get(), 0);
    assert_eq!(watchers.count(), 1);
}

#[test]
fn subclasses_inherit_listening() {
    let (class, probes) = listening_class();
    let sub = class.extend("Sub").attr("extra", 1).build().unwrap();
    let m = sub.create(Value::Null);

    child(&m, "right").set_attr("text", "inherited").unwrap();

    assert_eq!(probes.right.get(), 1);
}

// ── Schema validation ────────────────────────────────────────────

#[test]
fn listening_on_undeclared_attribute_is_rejected() {
    let err = ModelClass::define("Bad")
        .listen("ghost", "change", Handler::func(|_, _| {}))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownListeningAttribute {
            class: "Bad".into(),
            attribute: "ghost".into()
        }
    );
}

#[test]
fn listening_on_scalar_attribute_is_rejected() {
    let err = ModelClass::define("Bad")
        .attr("n", 1)
        .listen("n", "change", Handler::func(|_, _| {}))
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::ListeningOnScalar { .. }));
}

#[test]
fn listening_with_unknown_method_is_rejected() {
    let n = common::n_class();
    let err = ModelClass::define("Bad")
        .attr("left", &n)
        .listen("left", "change", "missing")
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownMethod {
            class: "Bad".into(),
            method: "missing".into()
        }
    );
}
