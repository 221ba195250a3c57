//! Conversion of assigned values to an attribute's declared type.
//!
//! Coercion is total. Input that cannot be converted becomes `NaN`, an
//! invalid date or `null`, and `null` itself is legal for every type.

use nestedtypes_types::Date;
use nestedtypes_types::number::parse_number;
use tracing::debug;

use crate::{AttrSpec, AttrType, Collection, CollectionClass, ModelClass, SetOptions, Value};

/// Converts `raw` to the type declared by `spec`.
pub(crate) fn coerce(spec: &AttrSpec, raw: Value, options: &SetOptions) -> Value {
    if raw.is_null() {
        return Value::Null;
    }
    match spec.ty() {
        AttrType::Any => raw,
        AttrType::String => Value::String(raw.to_text()),
        AttrType::Number => Value::Number(to_number(&raw)),
        AttrType::Boolean => Value::Bool(raw.is_truthy()),
        AttrType::Date => Value::Date(to_date(&raw)),
        AttrType::Model(class) => to_model(class, raw, options),
        AttrType::Collection(class) => to_collection(class, raw, options),
        AttrType::Reference(source) => to_reference(source, raw),
        AttrType::Subset(source) => to_subset(source, raw, options),
    }
}

/// Value a fresh instance gets when the input does not mention the attribute.
///
/// A declared default is coerced through the type as usual. Without one,
/// every type has its own zero value.
pub(crate) fn default_value(spec: &AttrSpec) -> Value {
    let options = SetOptions::default();
    if let Some(input) = spec.default_input() {
        return coerce(spec, input, &options);
    }
    match spec.ty() {
        AttrType::Any | AttrType::Reference(_) => Value::Null,
        AttrType::String => Value::String(String::new()),
        AttrType::Number => Value::Number(0.0),
        AttrType::Boolean => Value::Bool(false),
        AttrType::Date => Value::Date(Date::now()),
        AttrType::Model(class) => Value::Model(class.create(Value::Null)),
        AttrType::Collection(class) => {
            Value::Collection(class.create_with(Vec::<Value>::new(), &options))
        }
        AttrType::Subset(source) => Value::Collection(Collection::subset_of(source)),
    }
}

fn to_number(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) => *n,
        Value::String(s) => parse_number(s),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Date(d) => d.timestamp_millis(),
        _ => f64::NAN,
    }
}

fn to_date(raw: &Value) -> Date {
    match raw {
        Value::Date(d) => *d,
        Value::Number(n) => Date::from_millis(*n),
        Value::String(s) => Date::parse(s),
        _ => Date::invalid(),
    }
}

fn to_model(class: &ModelClass, raw: Value, options: &SetOptions) -> Value {
    match raw {
        Value::Model(model) if model.class().is_subclass_of(class) => Value::Model(model),
        Value::Model(model) => {
            debug!(
                expected = %class.name(),
                actual = %model.class().name(),
                "Rebuilding model of foreign class"
            );
            Value::Model(class.create_with(Value::from(model.to_json()), options))
        }
        attrs @ Value::Object(_) => Value::Model(class.create_with(attrs, options)),
        other => {
            debug!(class = %class.name(), kind = other.kind(), "Cannot convert to model");
            Value::Null
        }
    }
}

fn to_collection(class: &CollectionClass, raw: Value, options: &SetOptions) -> Value {
    match raw {
        Value::Collection(collection)
            if collection
                .class()
                .model_class()
                .is_subclass_of(class.model_class()) =>
        {
            Value::Collection(collection)
        }
        Value::Collection(collection) => Value::Collection(
            class.create_with(collection.models().into_iter().map(Value::Model), options),
        ),
        Value::Array(items) => Value::Collection(class.create_with(items, options)),
        other => {
            debug!(
                class = %class.model_class().name(),
                kind = other.kind(),
                "Cannot convert to collection"
            );
            Value::Null
        }
    }
}

fn to_reference(source: &Collection, raw: Value) -> Value {
    match raw {
        model @ Value::Model(_) => model,
        id @ (Value::Number(_) | Value::String(_)) => id,
        Value::Object(attrs) => {
            let id_attribute = source.class().model_class().id_attribute().to_string();
            attrs.get(&id_attribute).cloned().unwrap_or_default()
        }
        other => {
            debug!(kind = other.kind(), "Cannot convert to reference");
            Value::Null
        }
    }
}

fn to_subset(source: &Collection, raw: Value, options: &SetOptions) -> Value {
    match raw {
        Value::Collection(collection)
            if collection.source().is_some_and(|s| s.ptr_eq(source)) =>
        {
            Value::Collection(collection)
        }
        Value::Collection(collection) => {
            let subset = Collection::subset_of(source);
            subset.fill(collection.models().into_iter().map(Value::Model), options);
            Value::Collection(subset)
        }
        Value::Array(items) => {
            let subset = Collection::subset_of(source);
            subset.fill(items, options);
            Value::Collection(subset)
        }
        other => {
            debug!(kind = other.kind(), "Cannot convert to subset");
            Value::Null
        }
    }
}

/// What a read of a reference attribute sees: the model itself, or the
/// member of the source collection the stored id names, or `null`.
pub(crate) fn resolve_reference(source: &Collection, stored: Value) -> Value {
    match stored {
        model @ Value::Model(_) => model,
        Value::Null => Value::Null,
        id => source.get(id).map_or(Value::Null, Value::Model),
    }
}

/// Serialized form of a reference attribute: always the id.
pub(crate) fn reference_json(stored: &Value) -> serde_json::Value {
    match stored {
        Value::Model(model) => model.id().to_json(),
        other => other.to_json(),
    }
}
