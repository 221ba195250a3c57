//! Collections of models.
//!
//! Every [`ModelClass`] has a generated [`CollectionClass`] whose members are
//! instances of that class. A collection keeps its members in order, indexes
//! them by id, and reports any structural change (and any change inside a
//! member) as a single `change` per operation, after the operation's own
//! `add`/`remove`/`reset`/`sort` event.
//!
//! A subset collection ([`Collection::subset_of`]) holds references to
//! members of a source collection. It never owns them: member changes do not
//! bubble through it, and it serializes as an array of ids.

use indexmap::IndexMap;
use nestedtypes_events::{Events, ListenerId};
use nestedtypes_types::{Cid, IdKey};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

use crate::bubble::{self, Batch, OwnerLink};
use crate::{
    AttrOptions, AttrSpec, Error, Event, Model, ModelClass, Result, SetOptions, Source, Value,
};

/// Ordering applied after every structural change.
#[derive(Clone)]
pub enum Comparator {
    /// Ascending by the stored value of one attribute.
    Attribute(String),
    /// Custom ordering.
    Fn(Rc<dyn Fn(&Model, &Model) -> Ordering>),
}

impl Comparator {
    pub fn by(compare: impl Fn(&Model, &Model) -> Ordering + 'static) -> Self {
        Comparator::Fn(Rc::new(compare))
    }

    fn compare(&self, a: &Model, b: &Model) -> Ordering {
        match self {
            Comparator::Attribute(name) => {
                let a = a.attribute(name).unwrap_or_default();
                let b = b.attribute(name).unwrap_or_default();
                a.compare(&b)
            }
            Comparator::Fn(compare) => compare(a, b),
        }
    }
}

impl From<&str> for Comparator {
    fn from(attribute: &str) -> Self {
        Comparator::Attribute(attribute.to_string())
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Attribute(name) => write!(f, "Attribute({name})"),
            Comparator::Fn(_) => f.write_str("Fn"),
        }
    }
}

/// Customisation of a generated collection class, declared on the model
/// class with [`ModelClassBuilder::collection`](crate::ModelClassBuilder::collection)
/// and inherited by subclasses.
#[derive(Clone, Default)]
pub struct CollectionConfig {
    members: IndexMap<String, Value>,
    initialize: Option<Rc<dyn Fn(&Collection)>>,
    comparator: Option<Comparator>,
}

impl CollectionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain member copied into every collection of the class.
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    /// Runs once for every new collection, after its initial members are in.
    #[must_use]
    pub fn initialize(mut self, init: impl Fn(&Collection) + 'static) -> Self {
        self.initialize = Some(Rc::new(init));
        self
    }

    #[must_use]
    pub fn comparator(mut self, comparator: impl Into<Comparator>) -> Self {
        self.comparator = Some(comparator.into());
        self
    }
}

/// A collection class: member model class plus configuration.
#[derive(Clone)]
pub struct CollectionClass {
    model: ModelClass,
    config: Option<Rc<CollectionConfig>>,
}

impl CollectionClass {
    /// Collection of base models.
    #[must_use]
    pub fn base() -> Self {
        Self::derived(&ModelClass::base())
    }

    /// Plain collection of `model` instances, ignoring any configuration the
    /// model class declares.
    #[must_use]
    pub fn of(model: &ModelClass) -> Self {
        Self {
            model: model.clone(),
            config: None,
        }
    }

    /// Collection of `model` instances with its own configuration.
    #[must_use]
    pub fn with_config(model: &ModelClass, config: CollectionConfig) -> Self {
        Self {
            model: model.clone(),
            config: Some(Rc::new(config)),
        }
    }

    pub(crate) fn derived(model: &ModelClass) -> Self {
        Self {
            model: model.clone(),
            config: model.collection_config(),
        }
    }

    #[must_use]
    pub fn model_class(&self) -> &ModelClass {
        &self.model
    }

    /// New collection with no initial members.
    #[must_use]
    pub fn empty(&self) -> Collection {
        self.create(Vec::<Value>::new())
    }

    /// New collection holding `items` (mappings or models). No events fire.
    pub fn create<I, V>(&self, items: I) -> Collection
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.create_with(items, &SetOptions::default())
    }

    pub fn create_with<I, V>(&self, items: I, options: &SetOptions) -> Collection
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let collection = Collection::blank(self, None);
        collection.fill(items, options);
        if let Some(init) = self.config.as_ref().and_then(|c| c.initialize.clone()) {
            init(&collection);
        }
        collection
    }

    /// Nested-collection descriptor of this class with a default value.
    #[must_use]
    pub fn value(&self, default: impl Into<Value>) -> AttrSpec {
        AttrSpec::from(self).value(default)
    }

    /// Nested-collection descriptor of this class with options applied.
    #[must_use]
    pub fn options(&self, options: AttrOptions) -> AttrSpec {
        AttrSpec::from(self).options(options)
    }
}

impl PartialEq for CollectionClass {
    fn eq(&self, other: &Self) -> bool {
        let same_config = match (&self.config, &other.config) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        self.model.ptr_eq(&other.model) && same_config
    }
}

impl fmt::Debug for CollectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionClass")
            .field("model", &self.model.name())
            .field("configured", &self.config.is_some())
            .finish()
    }
}

struct CollectionState {
    class: CollectionClass,
    cid: Cid,
    models: Vec<Model>,
    by_id: HashMap<IdKey, Model>,
    comparator: Option<Comparator>,
    members: IndexMap<String, Value>,
    events: Events<Event>,
    batch: Batch,
    owner: Option<OwnerLink>,
    /// Set for subset collections.
    source: Option<Collection>,
}

impl CollectionState {
    fn reindex(&mut self) {
        self.by_id = self
            .models
            .iter()
            .filter_map(|m| m.id_key().map(|key| (key, m.clone())))
            .collect();
    }
}

/// Shared handle to a collection. Cloning shares the collection.
#[derive(Clone)]
pub struct Collection(Rc<RefCell<CollectionState>>);

/// Non-owning handle used for back-references.
#[derive(Clone)]
pub(crate) struct WeakCollection(Weak<RefCell<CollectionState>>);

impl WeakCollection {
    pub(crate) fn upgrade(&self) -> Option<Collection> {
        self.0.upgrade().map(Collection)
    }

    pub(crate) fn points_to(&self, collection: &Collection) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&collection.0))
    }
}

impl fmt::Debug for WeakCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakCollection")
    }
}

impl Collection {
    fn blank(class: &CollectionClass, source: Option<Collection>) -> Collection {
        let config = class.config.as_deref();
        let comparator = match source {
            Some(_) => None,
            None => config.and_then(|c| c.comparator.clone()),
        };
        Collection(Rc::new(RefCell::new(CollectionState {
            class: class.clone(),
            cid: Cid::new(),
            models: Vec::new(),
            by_id: HashMap::new(),
            comparator,
            members: config.map(|c| c.members.clone()).unwrap_or_default(),
            events: Events::new(),
            batch: Batch::default(),
            owner: None,
            source,
        })))
    }

    /// Empty subset drawing its members from `source`.
    #[must_use]
    pub fn subset_of(source: &Collection) -> Collection {
        let class = source.class();
        Collection::blank(&class, Some(source.clone()))
    }

    /// Inserts initial members without firing events.
    pub(crate) fn fill<I, V>(&self, items: I, options: &SetOptions)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for item in items {
            if let Some(model) = self.prepare(item.into(), options) {
                self.insert_member(&model);
            }
        }
        self.sort_models();
    }

    // ── Identity ─────────────────────────────────────────────────

    #[must_use]
    pub fn class(&self) -> CollectionClass {
        self.0.borrow().class.clone()
    }

    #[must_use]
    pub fn cid(&self) -> Cid {
        self.0.borrow().cid
    }

    /// The collection a subset draws from.
    #[must_use]
    pub fn source(&self) -> Option<Collection> {
        self.0.borrow().source.clone()
    }

    #[must_use]
    pub fn is_subset(&self) -> bool {
        self.0.borrow().source.is_some()
    }

    /// Same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakCollection {
        WeakCollection(Rc::downgrade(&self.0))
    }

    // ── Access ───────────────────────────────────────────────────

    /// Looks a member up by id, by model, or by a mapping carrying an id.
    pub fn get(&self, id: impl Into<Value>) -> Option<Model> {
        self.lookup(&id.into())
    }

    #[must_use]
    pub fn get_by_cid(&self, cid: Cid) -> Option<Model> {
        self.0
            .borrow()
            .models
            .iter()
            .find(|m| m.cid() == cid)
            .cloned()
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<Model> {
        self.0.borrow().models.get(index).cloned()
    }

    #[must_use]
    pub fn first(&self) -> Option<Model> {
        self.0.borrow().models.first().cloned()
    }

    #[must_use]
    pub fn last(&self) -> Option<Model> {
        self.0.borrow().models.last().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().models.is_empty()
    }

    /// Members in order.
    #[must_use]
    pub fn models(&self) -> Vec<Model> {
        self.0.borrow().models.clone()
    }

    #[must_use]
    pub fn index_of(&self, model: &Model) -> Option<usize> {
        self.0.borrow().models.iter().position(|m| m.ptr_eq(model))
    }

    #[must_use]
    pub fn contains(&self, model: &Model) -> bool {
        self.index_of(model).is_some()
    }

    /// Stored value of `attribute` for every member, in order.
    #[must_use]
    pub fn pluck(&self, attribute: &str) -> Vec<Value> {
        self.models()
            .iter()
            .map(|m| m.attribute(attribute).unwrap_or_default())
            .collect()
    }

    #[must_use]
    pub fn comparator(&self) -> Option<Comparator> {
        self.0.borrow().comparator.clone()
    }

    /// Replaces the comparator. Does not re-sort; call [`Collection::sort`].
    pub fn set_comparator(&self, comparator: Option<Comparator>) {
        self.0.borrow_mut().comparator = comparator;
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<Value> {
        self.0.borrow().members.get(name).cloned()
    }

    pub fn set_member(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().members.insert(name.into(), value.into());
    }

    fn lookup(&self, key: &Value) -> Option<Model> {
        let state = self.0.borrow();
        match key {
            Value::Model(model) => {
                if state.models.iter().any(|m| m.ptr_eq(model)) {
                    return Some(model.clone());
                }
                model.id_key().and_then(|k| state.by_id.get(&k).cloned())
            }
            Value::Object(attrs) => attrs
                .get(state.class.model_class().id_attribute())
                .and_then(Value::id_key)
                .and_then(|k| state.by_id.get(&k).cloned()),
            other => other.id_key().and_then(|k| state.by_id.get(&k).cloned()),
        }
    }

    fn find_by_key(&self, key: &IdKey) -> Option<Model> {
        self.0.borrow().by_id.get(key).cloned()
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Adds members. Items already present (same instance or same id) are
    /// skipped. Returns the models actually added.
    pub fn add<I, V>(&self, items: I) -> Vec<Model>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_with(items, &SetOptions::default())
    }

    pub fn add_with<I, V>(&self, items: I, options: &SetOptions) -> Vec<Model>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let prepared: Vec<Model> = items
            .into_iter()
            .filter_map(|item| self.prepare(item.into(), options))
            .collect();
        self.begin(options);
        let added: Vec<Model> = prepared
            .into_iter()
            .filter(|model| self.insert_member(model))
            .collect();
        if !added.is_empty() {
            self.sort_models();
            self.mark_dirty();
            trace!(count = added.len(), "Members added");
            self.emit("add", added.clone());
        }
        self.end();
        added
    }

    /// Removes members given as models, ids or mappings carrying an id.
    /// Returns the models actually removed; nothing fires if none matched.
    pub fn remove<I, V>(&self, items: I) -> Vec<Model>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.remove_with(items, &SetOptions::default())
    }

    pub fn remove_with<I, V>(&self, items: I, options: &SetOptions) -> Vec<Model>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let targets: Vec<Model> = items
            .into_iter()
            .filter_map(|item| self.lookup(&item.into()))
            .collect();
        self.begin(options);
        let removed: Vec<Model> = targets
            .into_iter()
            .filter(|model| self.remove_member(model))
            .collect();
        if !removed.is_empty() {
            self.mark_dirty();
            trace!(count = removed.len(), "Members removed");
            self.emit("remove", removed.clone());
        }
        self.end();
        removed
    }

    /// Replaces all members.
    pub fn reset<I, V>(&self, items: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.reset_with(items, &SetOptions::default());
    }

    pub fn reset_with<I, V>(&self, items: I, options: &SetOptions)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let prepared: Vec<Model> = items
            .into_iter()
            .filter_map(|item| self.prepare(item.into(), options))
            .collect();
        self.begin(options);
        let old = {
            let mut state = self.0.borrow_mut();
            state.by_id.clear();
            std::mem::take(&mut state.models)
        };
        for model in &old {
            self.release_member(model);
        }
        for model in &prepared {
            self.insert_member(model);
        }
        self.sort_models();
        self.mark_dirty();
        let members = self.models();
        trace!(count = members.len(), "Members reset");
        self.emit("reset", members);
        self.end();
    }

    /// Updates the collection to exactly `items`: members matched by id
    /// (or instance) are kept and updated in place, new items are added,
    /// members not mentioned are removed.
    pub fn set<I, V>(&self, items: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.set_with(items, &SetOptions::default());
    }

    pub fn set_with<I, V>(&self, items: I, options: &SetOptions)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let (id_attribute, subset) = {
            let state = self.0.borrow();
            (
                state.class.model_class().id_attribute().to_string(),
                state.source.is_some(),
            )
        };
        self.begin(options);

        let mut kept: Vec<Model> = Vec::new();
        for item in items {
            let item = item.into();
            let key = match &item {
                Value::Model(model) => model.id_key(),
                Value::Object(attrs) => attrs.get(&id_attribute).and_then(Value::id_key),
                other => other.id_key(),
            };
            if let Value::Model(model) = &item {
                if kept.iter().any(|k| k.ptr_eq(model)) {
                    continue;
                }
            }
            let seen = key
                .as_ref()
                .and_then(|k| kept.iter().find(|m| m.id_key().as_ref() == Some(k)).cloned());
            let existing = seen.clone().or_else(|| match &item {
                Value::Model(model) if self.contains(model) => Some(model.clone()),
                _ => key.as_ref().and_then(|k| self.find_by_key(k)),
            });
            match existing {
                Some(member) => {
                    let update = match item {
                        Value::Object(_) if !subset => Some(item),
                        Value::Model(incoming) if !subset && !incoming.ptr_eq(&member) => {
                            Some(Value::from(incoming.to_json()))
                        }
                        _ => None,
                    };
                    if let Some(update) = update {
                        if let Err(error) = member.set_with(update, options) {
                            warn!(%error, "Member update failed");
                        }
                    }
                    if seen.is_none() {
                        kept.push(member);
                    }
                }
                None => {
                    if let Some(model) = self.prepare(item, options) {
                        kept.push(model);
                    }
                }
            }
        }

        let before = self.models();
        let removed: Vec<Model> = before
            .iter()
            .filter(|m| !kept.iter().any(|k| k.ptr_eq(m)))
            .cloned()
            .collect();
        for model in &removed {
            self.remove_member(model);
        }
        let added: Vec<Model> = kept
            .iter()
            .filter(|m| !self.contains(m))
            .filter(|m| self.insert_member(m))
            .cloned()
            .collect();
        {
            let mut state = self.0.borrow_mut();
            let present: Vec<Model> = kept
                .into_iter()
                .filter(|k| state.models.iter().any(|m| m.ptr_eq(k)))
                .collect();
            state.models = present;
        }
        self.sort_models();

        let after = self.models();
        let reordered = before.len() != after.len()
            || before.iter().zip(&after).any(|(a, b)| !a.ptr_eq(b));
        if !removed.is_empty() {
            self.emit("remove", removed);
        }
        if !added.is_empty() {
            self.emit("add", added);
        }
        if reordered {
            self.mark_dirty();
        }
        self.end();
    }

    /// Re-sorts with the current comparator.
    pub fn sort(&self) -> Result<()> {
        self.sort_with(&SetOptions::default())
    }

    pub fn sort_with(&self, options: &SetOptions) -> Result<()> {
        if self.0.borrow().comparator.is_none() {
            return Err(Error::NoComparator);
        }
        self.begin(options);
        self.sort_models();
        self.mark_dirty();
        self.emit("sort", Vec::new());
        self.end();
        Ok(())
    }

    /// Builds a member from `attrs`, adds it and runs the class's
    /// persistence hook. A failed save is reported as an `error` event on
    /// the new member.
    pub fn create(&self, attrs: impl Into<Value>) -> Model {
        self.create_with(attrs, &SetOptions::default())
    }

    pub fn create_with(&self, attrs: impl Into<Value>, options: &SetOptions) -> Model {
        let class = self.class();
        self.begin(options);
        let model = class.model_class().create_with(attrs, options);
        self.add_with([Value::Model(model.clone())], options);
        if let Err(error) = model.save() {
            warn!(%error, "Save failed for created member");
            model.emit("error", Vec::new(), Some(error.to_string()));
        }
        self.end();
        model
    }

    /// Turns an item into a member candidate. Subsets resolve ids against
    /// their source; owned collections build models from mappings.
    fn prepare(&self, item: Value, options: &SetOptions) -> Option<Model> {
        let (class, source) = {
            let state = self.0.borrow();
            (state.class.model_class().clone(), state.source.clone())
        };
        match (item, source) {
            (Value::Model(model), _) => Some(model),
            (Value::Null, _) => None,
            (item, Some(source)) => {
                let resolved = source.lookup(&item);
                if resolved.is_none() {
                    debug!(kind = item.kind(), "Subset item not found in source");
                }
                resolved
            }
            (attrs @ Value::Object(_), None) => Some(class.create_with(attrs, options)),
            (other, None) => {
                warn!(
                    class = %class.name(),
                    kind = other.kind(),
                    "Ignoring collection item that is neither a model nor a mapping"
                );
                None
            }
        }
    }

    fn insert_member(&self, model: &Model) -> bool {
        let owned = {
            let mut state = self.0.borrow_mut();
            if state.models.iter().any(|m| m.ptr_eq(model)) {
                return false;
            }
            if let Some(key) = model.id_key() {
                if state.by_id.contains_key(&key) {
                    debug!(id = %key, "Skipping member with duplicate id");
                    return false;
                }
                state.by_id.insert(key, model.clone());
            }
            state.models.push(model.clone());
            state.source.is_none()
        };
        if owned {
            model.join_collection(self);
        }
        true
    }

    fn remove_member(&self, model: &Model) -> bool {
        let removed = {
            let mut state = self.0.borrow_mut();
            let position = state.models.iter().position(|m| m.ptr_eq(model));
            if let Some(index) = position {
                state.models.remove(index);
                state.reindex();
            }
            position.is_some()
        };
        if removed {
            self.release_member(model);
        }
        removed
    }

    fn release_member(&self, model: &Model) {
        model.leave_collection(self);
    }

    fn sort_models(&self) {
        let (mut models, comparator) = {
            let mut state = self.0.borrow_mut();
            let Some(comparator) = state.comparator.clone() else {
                return;
            };
            (std::mem::take(&mut state.models), comparator)
        };
        models.sort_by(|a, b| comparator.compare(a, b));
        self.0.borrow_mut().models = models;
    }

    pub(crate) fn set_owner(&self, link: OwnerLink) {
        self.0.borrow_mut().owner = Some(link);
    }

    pub(crate) fn release_owner_if(&self, still_owned: impl FnOnce(&OwnerLink) -> bool) {
        let mut state = self.0.borrow_mut();
        if state.owner.as_ref().is_some_and(still_owned) {
            state.owner = None;
        }
    }

    // ── Batching ─────────────────────────────────────────────────

    fn begin(&self, options: &SetOptions) {
        self.0.borrow_mut().batch.enter(options.silent);
    }

    fn end(&self) {
        let idle = self.0.borrow_mut().batch.leave();
        if idle {
            let links = self.flush();
            bubble::propagate(links);
        }
    }

    fn mark_dirty(&self) {
        self.0.borrow_mut().batch.mark_dirty();
    }

    fn flush(&self) -> Vec<OwnerLink> {
        let silent = {
            let mut state = self.0.borrow_mut();
            state.batch.reopen();
            state.batch.is_silent()
        };
        let mut reported = false;
        while self.0.borrow_mut().batch.take_dirty() {
            reported = true;
            if !silent {
                self.emit("change", Vec::new());
            }
        }
        let mut state = self.0.borrow_mut();
        state.batch.leave();
        state.batch.reset();
        if reported && !silent {
            state.owner.iter().cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Called when a member reported a change. Ids may have moved.
    pub(crate) fn absorb_member_change(&self) -> Vec<OwnerLink> {
        let active = {
            let mut state = self.0.borrow_mut();
            state.reindex();
            state.batch.mark_dirty();
            state.batch.is_active()
        };
        if active { Vec::new() } else { self.flush() }
    }

    // ── Events ───────────────────────────────────────────────────

    pub fn on(&self, names: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        self.0.borrow_mut().events.on(names, callback)
    }

    pub fn once(&self, names: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        self.0.borrow_mut().events.once(names, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.0.borrow_mut().events.off(id)
    }

    pub fn off_event(&self, name: &str) -> usize {
        self.0.borrow_mut().events.off_event(name)
    }

    pub(crate) fn release_listener(&self, id: ListenerId) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            state.events.off(id);
        }
    }

    fn emit(&self, name: &str, members: Vec<Model>) {
        let callbacks = {
            let mut state = self.0.borrow_mut();
            if state.batch.is_silent() {
                return;
            }
            state.events.dispatch_list(name)
        };
        if callbacks.is_empty() {
            return;
        }
        let event = Event {
            name: name.to_string(),
            source: Source::Collection(self.clone()),
            members,
            message: None,
        };
        for callback in callbacks {
            callback(&event);
        }
    }

    // ── Serialization ────────────────────────────────────────────

    /// Array of member JSON; a subset serializes as an array of ids.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let (models, subset) = {
            let state = self.0.borrow();
            (state.models.clone(), state.source.is_some())
        };
        let items = models
            .iter()
            .map(|m| if subset { m.id().to_json() } else { m.to_json() })
            .collect();
        serde_json::Value::Array(items)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(state) => f
                .debug_struct("Collection")
                .field("model", &state.class.model_class().name())
                .field("len", &state.models.len())
                .field("subset", &state.source.is_some())
                .finish(),
            Err(_) => f.write_str("Collection(<borrowed>)"),
        }
    }
}
