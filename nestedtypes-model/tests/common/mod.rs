//! Shared fixtures and event probes for model tests.

#![allow(dead_code)]

use nestedtypes_model::{AttrType, Collection, Event, ListenerId, Model, ModelClass, Value};
use std::cell::Cell;
use std::rc::Rc;

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts how many times a listener ran.
#[derive(Clone, Default)]
pub struct Counter(Rc<Cell<usize>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }

    pub fn callback(&self) -> impl Fn(&Event) + 'static {
        let hits = Rc::clone(&self.0);
        move |_| hits.set(hits.get() + 1)
    }

    /// Listens for `names` on `model`.
    pub fn watch(&self, model: &Model, names: &str) -> ListenerId {
        model.on(names, self.callback())
    }

    /// Listens for `names` on `collection`.
    pub fn watch_collection(&self, collection: &Collection, names: &str) -> ListenerId {
        collection.on(names, self.callback())
    }
}

/// Runs `todo` and asserts that `change` and every `change:<attr>` named in
/// `attrs` (space separated) fired exactly once.
pub fn assert_single_change(model: &Model, attrs: &str, todo: impl FnOnce(&Model)) {
    let change = Counter::new();
    let change_id = change.watch(model, "change");
    let per_attr: Vec<(String, Counter, ListenerId)> = attrs
        .split_whitespace()
        .map(|name| {
            let counter = Counter::new();
            let id = counter.watch(model, &format!("change:{name}"));
            (name.to_string(), counter, id)
        })
        .collect();

    todo(model);

    model.off(change_id);
    assert_eq!(change.count(), 1, "`change` fired {} times", change.count());
    for (name, counter, id) in per_attr {
        model.off(id);
        assert_eq!(
            counter.count(),
            1,
            "`change:{name}` fired {} times",
            counter.count()
        );
    }
}

/// `time: Date, text: "", number: 1`
pub fn n_class() -> ModelClass {
    ModelClass::define("N")
        .attr("time", AttrType::Date)
        .attr("text", "")
        .attr("number", 1)
        .build()
        .unwrap()
}

/// `first: N, second: N, count: 0, sum: 0`
pub fn main_class(n: &ModelClass) -> ModelClass {
    ModelClass::define("Main")
        .attr("first", n)
        .attr("second", n)
        .attr("count", 0)
        .attr("sum", 0)
        .build()
        .unwrap()
}

/// The nested model held in `attribute`.
pub fn child(model: &Model, attribute: &str) -> Model {
    model
        .get(attribute)
        .unwrap()
        .as_model()
        .cloned()
        .unwrap_or_else(|| panic!("`{attribute}` does not hold a model"))
}

/// The nested collection held in `attribute`.
pub fn items(model: &Model, attribute: &str) -> Collection {
    model
        .get(attribute)
        .unwrap()
        .as_collection()
        .cloned()
        .unwrap_or_else(|| panic!("`{attribute}` does not hold a collection"))
}

/// Numeric value of `attribute`.
pub fn number(model: &Model, attribute: &str) -> f64 {
    model.get(attribute).unwrap().as_f64().unwrap()
}

/// String value of `attribute`.
pub fn text(model: &Model, attribute: &str) -> String {
    model.get(attribute).unwrap().as_str().unwrap().to_string()
}

/// Adds one to a numeric attribute.
pub fn increment(model: &Model, attribute: &str) {
    let next = number(model, attribute) + 1.0;
    model.set_attr(attribute, Value::from(next)).unwrap();
}
