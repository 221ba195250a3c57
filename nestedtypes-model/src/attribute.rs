//! Attribute descriptors: declared type, default value and options.
//!
//! A descriptor is plain configuration. `value()` and `options()` return a
//! new descriptor, so one base spec can be specialised in many places
//! without the uses affecting each other.

use indexmap::IndexMap;
use nestedtypes_types::Date;
use std::fmt;
use std::rc::Rc;

use crate::{Collection, CollectionClass, Model, ModelClass, Value};

/// Hook run on every read of an attribute: receives the stored value and
/// returns what callers see.
pub type GetHook = Rc<dyn Fn(&Model, Value) -> Value>;

/// Hook run on every write of an attribute: receives the raw assigned value
/// and returns the value to store.
pub type SetHook = Rc<dyn Fn(&Model, Value) -> Value>;

/// Declared type of an attribute.
#[derive(Clone)]
pub enum AttrType {
    /// No coercion; whatever is assigned is stored.
    Any,
    String,
    Number,
    Boolean,
    Date,
    /// Exclusively owned nested model.
    Model(ModelClass),
    /// Exclusively owned nested collection.
    Collection(CollectionClass),
    /// Id reference into an external collection (`Model.From`).
    Reference(Collection),
    /// Collection of id references into an external collection
    /// (`Collection.SubsetOf`).
    Subset(Collection),
}

impl AttrType {
    /// Reference attribute resolved against `source`.
    #[must_use]
    pub fn reference(source: &Collection) -> Self {
        AttrType::Reference(source.clone())
    }

    /// Subset attribute drawing its members from `source`.
    #[must_use]
    pub fn subset(source: &Collection) -> Self {
        AttrType::Subset(source.clone())
    }

    /// Descriptor of this type with an explicit default.
    #[must_use]
    pub fn value(self, default: impl Into<Value>) -> AttrSpec {
        AttrSpec::from(self).value(default)
    }

    /// Descriptor of this type with options applied.
    #[must_use]
    pub fn options(self, options: AttrOptions) -> AttrSpec {
        AttrSpec::from(self).options(options)
    }

    /// True for types whose values are owned model/collection nodes.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            AttrType::Model(_) | AttrType::Collection(_) | AttrType::Subset(_)
        )
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            AttrType::Any => "any",
            AttrType::String => "string",
            AttrType::Number => "number",
            AttrType::Boolean => "boolean",
            AttrType::Date => "date",
            AttrType::Model(_) => "model",
            AttrType::Collection(_) => "collection",
            AttrType::Reference(_) => "reference",
            AttrType::Subset(_) => "subset",
        }
    }
}

impl fmt::Debug for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Model(class) => write!(f, "Model({})", class.name()),
            AttrType::Collection(class) => {
                write!(f, "Collection({})", class.model_class().name())
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Default value of an attribute.
#[derive(Clone)]
pub enum DefaultValue {
    /// Coerced afresh for every instance.
    Literal(Value),
    /// Called for every instance; the result is coerced.
    Factory(Rc<dyn Fn() -> Value>),
}

impl DefaultValue {
    pub(crate) fn produce(&self) -> Value {
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(v) => write!(f, "Literal({v:?})"),
            DefaultValue::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Per-attribute options.
#[derive(Clone, Default)]
pub struct AttrOptions {
    pub(crate) value: Option<Value>,
    pub(crate) get: Option<GetHook>,
    pub(crate) set: Option<SetHook>,
    pub(crate) trigger_when_changed: Option<bool>,
    pub(crate) extra: IndexMap<String, Value>,
}

impl AttrOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the default value.
    #[must_use]
    pub fn value(mut self, v: impl Into<Value>) -> Self {
        self.value = Some(v.into());
        self
    }

    /// Read hook; replaces the stored value on every read.
    #[must_use]
    pub fn get(mut self, hook: impl Fn(&Model, Value) -> Value + 'static) -> Self {
        self.get = Some(Rc::new(hook));
        self
    }

    /// Write hook; its result is coerced and stored.
    #[must_use]
    pub fn set(mut self, hook: impl Fn(&Model, Value) -> Value + 'static) -> Self {
        self.set = Some(Rc::new(hook));
        self
    }

    /// Whether changes inside a nested value bubble to the owner.
    #[must_use]
    pub fn trigger_when_changed(mut self, enabled: bool) -> Self {
        self.trigger_when_changed = Some(enabled);
        self
    }

    /// Arbitrary named option, readable through [`AttrSpec::option`].
    #[must_use]
    pub fn extra(mut self, name: impl Into<String>, v: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), v.into());
        self
    }

    /// Layers `other` over `self`: every option `other` sets wins.
    fn merged(mut self, other: AttrOptions) -> Self {
        if other.value.is_some() {
            self.value = other.value;
        }
        if other.get.is_some() {
            self.get = other.get;
        }
        if other.set.is_some() {
            self.set = other.set;
        }
        if other.trigger_when_changed.is_some() {
            self.trigger_when_changed = other.trigger_when_changed;
        }
        self.extra.extend(other.extra);
        self
    }
}

impl fmt::Debug for AttrOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrOptions")
            .field("value", &self.value)
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .field("trigger_when_changed", &self.trigger_when_changed)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Full description of one attribute.
#[derive(Clone, Debug)]
pub struct AttrSpec {
    pub(crate) ty: AttrType,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) options: AttrOptions,
}

impl AttrSpec {
    #[must_use]
    pub fn new(ty: AttrType) -> Self {
        Self {
            ty,
            default: None,
            options: AttrOptions::default(),
        }
    }

    /// Returns a copy with `default` as the default value.
    #[must_use]
    pub fn value(&self, default: impl Into<Value>) -> Self {
        let mut spec = self.clone();
        spec.default = Some(DefaultValue::Literal(default.into()));
        spec.options.value = None;
        spec
    }

    /// Returns a copy whose default is produced by `factory` per instance.
    #[must_use]
    pub fn value_with(&self, factory: impl Fn() -> Value + 'static) -> Self {
        let mut spec = self.clone();
        spec.default = Some(DefaultValue::Factory(Rc::new(factory)));
        spec.options.value = None;
        spec
    }

    /// Returns a copy with `options` layered over the current ones.
    #[must_use]
    pub fn options(&self, options: AttrOptions) -> Self {
        let mut spec = self.clone();
        spec.options = spec.options.merged(options);
        spec
    }

    #[must_use]
    pub fn ty(&self) -> &AttrType {
        &self.ty
    }

    /// Named option set through [`AttrOptions::extra`].
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.extra.get(name)
    }

    /// Whether nested changes bubble through this attribute. Defaults to true.
    #[must_use]
    pub fn triggers_when_changed(&self) -> bool {
        self.options.trigger_when_changed.unwrap_or(true)
    }

    pub(crate) fn default_input(&self) -> Option<Value> {
        match &self.options.value {
            Some(v) => Some(v.clone()),
            None => self.default.as_ref().map(DefaultValue::produce),
        }
    }

    pub(crate) fn set_hook(&self) -> Option<SetHook> {
        self.options.set.clone()
    }

    pub(crate) fn get_hook(&self) -> Option<GetHook> {
        self.options.get.clone()
    }

    fn literal(ty: AttrType, default: Value) -> Self {
        Self {
            ty,
            default: Some(DefaultValue::Literal(default)),
            options: AttrOptions::default(),
        }
    }
}

impl From<AttrType> for AttrSpec {
    fn from(ty: AttrType) -> Self {
        AttrSpec::new(ty)
    }
}

impl From<&ModelClass> for AttrSpec {
    fn from(class: &ModelClass) -> Self {
        AttrSpec::new(AttrType::Model(class.clone()))
    }
}

impl From<ModelClass> for AttrSpec {
    fn from(class: ModelClass) -> Self {
        AttrSpec::new(AttrType::Model(class))
    }
}

impl From<&CollectionClass> for AttrSpec {
    fn from(class: &CollectionClass) -> Self {
        AttrSpec::new(AttrType::Collection(class.clone()))
    }
}

impl From<CollectionClass> for AttrSpec {
    fn from(class: CollectionClass) -> Self {
        AttrSpec::new(AttrType::Collection(class))
    }
}

impl From<&str> for AttrSpec {
    fn from(s: &str) -> Self {
        AttrSpec::literal(AttrType::String, Value::from(s))
    }
}

impl From<String> for AttrSpec {
    fn from(s: String) -> Self {
        AttrSpec::literal(AttrType::String, Value::String(s))
    }
}

impl From<bool> for AttrSpec {
    fn from(b: bool) -> Self {
        AttrSpec::literal(AttrType::Boolean, Value::Bool(b))
    }
}

impl From<i32> for AttrSpec {
    fn from(n: i32) -> Self {
        AttrSpec::literal(AttrType::Number, Value::from(n))
    }
}

impl From<f64> for AttrSpec {
    fn from(n: f64) -> Self {
        AttrSpec::literal(AttrType::Number, Value::Number(n))
    }
}

impl From<Date> for AttrSpec {
    fn from(d: Date) -> Self {
        AttrSpec::literal(AttrType::Date, Value::Date(d))
    }
}

impl From<serde_json::Value> for AttrSpec {
    fn from(json: serde_json::Value) -> Self {
        let ty = match &json {
            serde_json::Value::Bool(_) => AttrType::Boolean,
            serde_json::Value::Number(_) => AttrType::Number,
            serde_json::Value::String(_) => AttrType::String,
            _ => AttrType::Any,
        };
        AttrSpec::literal(ty, Value::from(json))
    }
}
