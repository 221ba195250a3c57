//! Model class definitions.
//!
//! A [`ModelClass`] is built once from a [`ModelClassBuilder`]. Building
//! flattens everything the class inherits (attributes, properties, members,
//! methods, listening declarations, handler, collection configuration) into
//! one definition, so instances never walk the parent chain.

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

use crate::collection::CollectionConfig;
use crate::handler::DefaultHandler;
use crate::{
    AttrOptions, AttrSpec, CollectionClass, Event, Model, ModelHandler, SchemaError, SetOptions,
    Value,
};

/// Named handler callable from `listening` declarations.
pub type Method = Rc<dyn Fn(&Model, &Event)>;

/// A computed accessor declared under `properties`.
///
/// A property shadows an attribute of the same name for `get`/`set_attr`.
#[derive(Clone)]
pub enum Property {
    /// Read-only; assigning it is an error.
    Computed(Rc<dyn Fn(&Model) -> Value>),
    /// Read-write; the setter decides where the value goes.
    ReadWrite {
        get: Rc<dyn Fn(&Model) -> Value>,
        set: Rc<dyn Fn(&Model, Value)>,
    },
}

impl Property {
    pub fn computed(get: impl Fn(&Model) -> Value + 'static) -> Self {
        Property::Computed(Rc::new(get))
    }

    pub fn read_write(
        get: impl Fn(&Model) -> Value + 'static,
        set: impl Fn(&Model, Value) + 'static,
    ) -> Self {
        Property::ReadWrite {
            get: Rc::new(get),
            set: Rc::new(set),
        }
    }

    pub(crate) fn read(&self, model: &Model) -> Value {
        match self {
            Property::Computed(get) | Property::ReadWrite { get, .. } => get(model),
        }
    }
}

/// Target of a `listening` declaration.
#[derive(Clone)]
pub enum Handler {
    /// A method registered on the class by name.
    Method(String),
    /// An inline closure.
    Func(Method),
}

impl Handler {
    pub fn func(f: impl Fn(&Model, &Event) + 'static) -> Self {
        Handler::Func(Rc::new(f))
    }

    pub fn method(name: impl Into<String>) -> Self {
        Handler::Method(name.into())
    }

    pub(crate) fn invoke(&self, owner: &Model, event: &Event) {
        match self {
            Handler::Func(f) => f(owner, event),
            Handler::Method(name) => {
                let method = owner.class().method(name).cloned();
                if let Some(method) = method {
                    method(owner, event);
                }
            }
        }
    }
}

impl From<&str> for Handler {
    fn from(name: &str) -> Self {
        Handler::Method(name.to_string())
    }
}

/// One `listening` entry: event names on a nested attribute and a handler.
#[derive(Clone)]
pub(crate) struct Listening {
    pub(crate) events: String,
    pub(crate) handler: Handler,
}

struct ClassDef {
    name: String,
    parent: Option<ModelClass>,
    attributes: IndexMap<String, AttrSpec>,
    properties: IndexMap<String, Property>,
    members: IndexMap<String, Value>,
    methods: IndexMap<String, Method>,
    listening: IndexMap<String, Vec<Listening>>,
    handler: Rc<dyn ModelHandler>,
    id_attribute: String,
    collection: Option<Rc<CollectionConfig>>,
}

/// A model class: flattened schema plus behaviour. Cloning shares the definition.
#[derive(Clone)]
pub struct ModelClass(Rc<ClassDef>);

thread_local! {
    static BASE_CLASS: ModelClass = ModelClass(Rc::new(ClassDef {
        name: "Model".to_string(),
        parent: None,
        attributes: IndexMap::new(),
        properties: IndexMap::new(),
        members: IndexMap::new(),
        methods: IndexMap::new(),
        listening: IndexMap::new(),
        handler: Rc::new(DefaultHandler),
        id_attribute: "id".to_string(),
        collection: None,
    }));
}

impl ModelClass {
    /// The root class every other class derives from.
    #[must_use]
    pub fn base() -> Self {
        BASE_CLASS.with(Clone::clone)
    }

    /// Starts a direct subclass of [`ModelClass::base`].
    #[must_use]
    pub fn define(name: impl Into<String>) -> ModelClassBuilder {
        Self::base().extend(name)
    }

    /// Starts a subclass of this class.
    #[must_use]
    pub fn extend(&self, name: impl Into<String>) -> ModelClassBuilder {
        ModelClassBuilder {
            parent: self.clone(),
            name: name.into(),
            attributes: Vec::new(),
            properties: Vec::new(),
            members: Vec::new(),
            methods: Vec::new(),
            listening: Vec::new(),
            handler: None,
            id_attribute: None,
            collection: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&ModelClass> {
        self.0.parent.as_ref()
    }

    /// Same definition (not merely an equal one).
    #[must_use]
    pub fn ptr_eq(&self, other: &ModelClass) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// True if this class is `ancestor` or derives from it.
    #[must_use]
    pub fn is_subclass_of(&self, ancestor: &ModelClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.ptr_eq(ancestor) {
                return true;
            }
            current = class.parent();
        }
        false
    }

    /// Flattened descriptor for `name`, including inherited attributes.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttrSpec> {
        self.0.attributes.get(name)
    }

    /// Declared attributes in declaration order (ancestors first).
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrSpec)> {
        self.0.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.0.properties.get(name)
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.0.methods.get(name)
    }

    #[must_use]
    pub fn id_attribute(&self) -> &str {
        &self.0.id_attribute
    }

    pub(crate) fn members(&self) -> &IndexMap<String, Value> {
        &self.0.members
    }

    pub(crate) fn listening(&self, attribute: &str) -> &[Listening] {
        self.0
            .listening
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn handler(&self) -> Rc<dyn ModelHandler> {
        Rc::clone(&self.0.handler)
    }

    pub(crate) fn collection_config(&self) -> Option<Rc<CollectionConfig>> {
        self.0.collection.clone()
    }

    /// The collection class generated for this model class.
    ///
    /// Its member class is `self`; its configuration is the nearest
    /// `collection` declaration on this class or an ancestor.
    #[must_use]
    pub fn collection(&self) -> CollectionClass {
        CollectionClass::derived(self)
    }

    /// New instance from `attrs` (a mapping, usually `json!({...})`).
    pub fn create(&self, attrs: impl Into<Value>) -> Model {
        Model::construct(self, attrs.into(), &SetOptions::default())
    }

    /// New instance with explicit options (e.g. `SetOptions::parse()`).
    pub fn create_with(&self, attrs: impl Into<Value>, options: &SetOptions) -> Model {
        Model::construct(self, attrs.into(), options)
    }

    /// Nested-model descriptor of this class with a default value.
    #[must_use]
    pub fn value(&self, default: impl Into<Value>) -> AttrSpec {
        AttrSpec::from(self).value(default)
    }

    /// Nested-model descriptor of this class with options applied.
    #[must_use]
    pub fn options(&self, options: AttrOptions) -> AttrSpec {
        AttrSpec::from(self).options(options)
    }
}

impl PartialEq for ModelClass {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.0.name)
            .field("attributes", &self.0.attributes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`ModelClass`]. Declarations are applied in order; later
/// declarations of the same name win.
#[must_use]
pub struct ModelClassBuilder {
    parent: ModelClass,
    name: String,
    attributes: Vec<(String, AttrSpec)>,
    properties: Vec<(String, Property)>,
    members: Vec<(String, Value)>,
    methods: Vec<(String, Method)>,
    listening: Vec<(String, Listening)>,
    handler: Option<Rc<dyn ModelHandler>>,
    id_attribute: Option<String>,
    collection: Option<CollectionConfig>,
}

impl ModelClassBuilder {
    /// Declares an attribute. Literals infer their type: `1` is a number,
    /// `""` a string, `json!([..])` an untyped array default.
    pub fn attr(mut self, name: impl Into<String>, spec: impl Into<AttrSpec>) -> Self {
        self.attributes.push((name.into(), spec.into()));
        self
    }

    /// Declares a computed property.
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.push((name.into(), property));
        self
    }

    /// Declares a plain instance member, copied into every instance.
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.push((name.into(), value.into()));
        self
    }

    /// Registers a method that `listening` handlers can name.
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Model, &Event) + 'static,
    ) -> Self {
        self.methods.push((name.into(), Rc::new(method)));
        self
    }

    /// Subscribes `handler` to `events` (space separated) on whatever value
    /// the nested attribute holds, for as long as it holds it.
    pub fn listen(
        mut self,
        attribute: impl Into<String>,
        events: impl Into<String>,
        handler: impl Into<Handler>,
    ) -> Self {
        self.listening.push((
            attribute.into(),
            Listening {
                events: events.into(),
                handler: handler.into(),
            },
        ));
        self
    }

    /// Installs lifecycle hooks.
    pub fn handler(mut self, handler: impl ModelHandler + 'static) -> Self {
        self.handler = Some(Rc::new(handler));
        self
    }

    /// Attribute used as the model's id. Defaults to `id`.
    pub fn id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = Some(name.into());
        self
    }

    /// Customises the generated collection class (see [`ModelClass::collection`]).
    pub fn collection(mut self, config: CollectionConfig) -> Self {
        self.collection = Some(config);
        self
    }

    /// Flattens the declarations with the parent's and validates the result.
    pub fn build(self) -> Result<ModelClass, SchemaError> {
        let parent = self.parent.0.as_ref();
        let class = self.name;

        let mut attributes = parent.attributes.clone();
        for (name, spec) in self.attributes {
            if name.is_empty() {
                return Err(SchemaError::EmptyAttributeName { class });
            }
            attributes.insert(name, spec);
        }

        let mut properties = parent.properties.clone();
        properties.extend(self.properties);

        let mut members = parent.members.clone();
        members.extend(self.members);

        let mut methods = parent.methods.clone();
        methods.extend(self.methods);

        let id_attribute = self
            .id_attribute
            .unwrap_or_else(|| parent.id_attribute.clone());
        if let Some(spec) = attributes.get(&id_attribute) {
            if spec.ty().is_nested() {
                return Err(SchemaError::NestedIdAttribute {
                    class,
                    attribute: id_attribute,
                });
            }
        }

        let mut listening = parent.listening.clone();
        for (attribute, entry) in self.listening {
            match attributes.get(&attribute) {
                None => {
                    return Err(SchemaError::UnknownListeningAttribute { class, attribute });
                }
                Some(spec) if !spec.ty().is_nested() => {
                    return Err(SchemaError::ListeningOnScalar { class, attribute });
                }
                Some(_) => {}
            }
            if let Handler::Method(method) = &entry.handler {
                if !methods.contains_key(method) {
                    return Err(SchemaError::UnknownMethod {
                        class,
                        method: method.clone(),
                    });
                }
            }
            listening.entry(attribute).or_default().push(entry);
        }

        let handler = self.handler.unwrap_or_else(|| Rc::clone(&parent.handler));
        let collection = self
            .collection
            .map(Rc::new)
            .or_else(|| parent.collection.clone());

        debug!(
            class = %class,
            parent = %parent.name,
            attributes = attributes.len(),
            "Model class defined"
        );

        Ok(ModelClass(Rc::new(ClassDef {
            name: class,
            parent: Some(self.parent),
            attributes,
            properties,
            members,
            methods,
            listening,
            handler,
            id_attribute,
            collection,
        })))
    }
}
