//! Model instances.
//!
//! A [`Model`] is a shared handle to one instance's state. Attribute writes
//! go through the class's descriptors (set hook, then coercion), nested
//! values are owned through weak back-links, and every mutating call runs
//! inside a batch so observers see each effective change exactly once.
//!
//! No `RefCell` borrow is held while user code (hooks, handlers, listeners)
//! runs, so all of them may freely read and write the model they observe.

use indexmap::IndexMap;
use nestedtypes_events::{Events, ListenerId};
use nestedtypes_types::{Cid, IdKey};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

use crate::bubble::{self, Batch, OwnerLink};
use crate::coerce;
use crate::{
    AttrSpec, AttrType, Collection, Error, Event, Map, ModelClass, Property, Result, SetOptions,
    Source, Value,
};

/// Listeners a model installed on the value held in one nested attribute.
struct Wiring {
    source: Source,
    listeners: Vec<ListenerId>,
}

struct ModelState {
    class: ModelClass,
    cid: Cid,
    attributes: Map,
    members: Map,
    events: Events<Event>,
    batch: Batch,
    owner: Option<OwnerLink>,
    /// Owning collections this model is a member of. Independent of `owner`.
    collections: Vec<OwnerLink>,
    wiring: IndexMap<String, Wiring>,
    /// Attributes whose set hook is running, and whether the hook wrote the
    /// attribute itself.
    hook_frames: Vec<(String, bool)>,
    /// Values before the last reported change cycle.
    previous: Map,
    /// Attributes reported in the last change cycle, with their new values.
    changed: Map,
}

impl ModelState {
    fn new(class: &ModelClass) -> Self {
        Self {
            class: class.clone(),
            cid: Cid::new(),
            attributes: Map::new(),
            members: class.members().clone(),
            events: Events::new(),
            batch: Batch::default(),
            owner: None,
            collections: Vec::new(),
            wiring: IndexMap::new(),
            hook_frames: Vec::new(),
            previous: Map::new(),
            changed: Map::new(),
        }
    }

    fn mark_hook_write(&mut self, attribute: &str) {
        if let Some(frame) = self.hook_frames.iter_mut().rev().find(|(n, _)| n == attribute) {
            frame.1 = true;
        }
    }
}

impl Drop for ModelState {
    fn drop(&mut self) {
        for (_, wiring) in self.wiring.drain(..) {
            for id in wiring.listeners {
                wiring.source.release(id);
            }
        }
    }
}

/// Shared handle to a model instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Model(Rc<RefCell<ModelState>>);

/// Non-owning handle used for back-references.
#[derive(Clone)]
pub(crate) struct WeakModel(Weak<RefCell<ModelState>>);

impl WeakModel {
    pub(crate) fn upgrade(&self) -> Option<Model> {
        self.0.upgrade().map(Model)
    }

    pub(crate) fn points_to(&self, model: &Model) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&model.0))
    }
}

impl fmt::Debug for WeakModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakModel")
    }
}

impl Model {
    pub(crate) fn construct(class: &ModelClass, raw: Value, options: &SetOptions) -> Model {
        let model = Model(Rc::new(RefCell::new(ModelState::new(class))));
        let handler = class.handler();

        let raw = if options.parse {
            handler.parse(&model, raw)
        } else {
            raw
        };
        let mut input = match raw {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                warn!(
                    class = %class.name(),
                    kind = other.kind(),
                    "Ignoring construction input that is not a mapping"
                );
                Map::new()
            }
        };

        let mut attributes = Map::with_capacity(input.len());
        for (name, spec) in class.attributes() {
            let value = match input.shift_remove(name) {
                Some(raw) => coerce::coerce(spec, raw, options),
                None => coerce::default_value(spec),
            };
            attributes.insert(name.to_string(), value);
        }
        attributes.extend(input);

        let nested: Vec<(String, Value)> = attributes
            .iter()
            .filter(|(_, v)| matches!(v, Value::Model(_) | Value::Collection(_)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        model.0.borrow_mut().attributes = attributes;
        for (name, value) in nested {
            if let Some(spec) = class.attribute(&name) {
                model.attach(&name, spec, &value);
            }
        }

        trace!(class = %class.name(), cid = %model.cid(), "Model constructed");
        handler.initialize(&model);
        model
    }

    // ── Identity ─────────────────────────────────────────────────

    #[must_use]
    pub fn class(&self) -> ModelClass {
        self.0.borrow().class.clone()
    }

    /// Client id, unique per instance and never serialized.
    #[must_use]
    pub fn cid(&self) -> Cid {
        self.0.borrow().cid
    }

    /// Value of the class's id attribute (`null` when unset).
    #[must_use]
    pub fn id(&self) -> Value {
        let state = self.0.borrow();
        state
            .attributes
            .get(state.class.id_attribute())
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn id_key(&self) -> Option<IdKey> {
        self.id().id_key()
    }

    /// Same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakModel {
        WeakModel(Rc::downgrade(&self.0))
    }

    // ── Reading ──────────────────────────────────────────────────

    /// Reads an attribute or property, applying its get hook and resolving
    /// references.
    pub fn get(&self, name: &str) -> Result<Value> {
        let class = self.class();
        if let Some(property) = class.property(name) {
            return Ok(property.read(self));
        }
        let stored = self.0.borrow().attributes.get(name).cloned();
        let Some(spec) = class.attribute(name) else {
            return stored.ok_or_else(|| Error::UnknownAttribute {
                class: class.name().to_string(),
                name: name.to_string(),
            });
        };
        let stored = stored.unwrap_or_default();
        let value = match spec.ty() {
            AttrType::Reference(source) => coerce::resolve_reference(source, stored),
            _ => stored,
        };
        Ok(match spec.get_hook() {
            Some(hook) => hook(self, value),
            None => value,
        })
    }

    /// The stored value, bypassing hooks and reference resolution.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.0.borrow().attributes.get(name).cloned()
    }

    /// True when the attribute holds something other than `null`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.0
            .borrow()
            .attributes
            .get(name)
            .is_some_and(|v| !v.is_null())
    }

    /// Snapshot of all stored attributes.
    #[must_use]
    pub fn attributes(&self) -> Map {
        self.0.borrow().attributes.clone()
    }

    /// Plain instance member declared on the class (or set later).
    #[must_use]
    pub fn member(&self, name: &str) -> Option<Value> {
        self.0.borrow().members.get(name).cloned()
    }

    pub fn set_member(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().members.insert(name.into(), value.into());
    }

    // ── Writing ──────────────────────────────────────────────────

    /// Assigns one attribute or property.
    pub fn set_attr(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set_attr_with(name, value, &SetOptions::default())
    }

    pub fn set_attr_with(
        &self,
        name: &str,
        value: impl Into<Value>,
        options: &SetOptions,
    ) -> Result<()> {
        let class = self.class();
        if let Some(property) = class.property(name) {
            self.begin(options);
            let result = self.write_property(&class, name, property, value.into());
            self.end();
            return result;
        }
        if class.attribute(name).is_none() && !self.is_stored(name) {
            return Err(Error::UnknownAttribute {
                class: class.name().to_string(),
                name: name.to_string(),
            });
        }
        self.begin(options);
        self.write(&class, name, value.into(), options, false);
        self.end();
        Ok(())
    }

    /// Applies a mapping of attributes as one change.
    ///
    /// Plain objects assigned to nested model attributes (and arrays assigned
    /// to nested collections) update the existing nested value in place.
    /// Undeclared keys are stored untyped.
    pub fn set(&self, attrs: impl Into<Value>) -> Result<()> {
        self.set_with(attrs, &SetOptions::default())
    }

    pub fn set_with(&self, attrs: impl Into<Value>, options: &SetOptions) -> Result<()> {
        let class = self.class();
        let attrs = attrs.into();
        let attrs = if options.parse {
            class.handler().parse(self, attrs)
        } else {
            attrs
        };
        let map = match attrs {
            Value::Object(map) => map,
            Value::Null => return Ok(()),
            other => return Err(Error::ExpectedMapping(other.kind())),
        };

        if options.validate {
            if let Err(message) = class.handler().validate(self, &map) {
                debug!(class = %class.name(), %message, "Bulk update rejected");
                if !options.silent {
                    self.emit("invalid", Vec::new(), Some(message.clone()));
                }
                return Err(Error::Validation {
                    class: class.name().to_string(),
                    message,
                });
            }
        }

        self.begin(options);
        let mut result = Ok(());
        for (name, value) in map {
            if let Some(property) = class.property(&name) {
                let written = self.write_property(&class, &name, property, value);
                if result.is_ok() {
                    result = written;
                }
                continue;
            }
            self.write(&class, &name, value, options, true);
        }
        self.end();
        result
    }

    /// Resets an attribute to `null`, or removes it if undeclared.
    pub fn unset(&self, name: &str) -> Result<()> {
        let class = self.class();
        if class.attribute(name).is_none() && !self.is_stored(name) {
            return Err(Error::UnknownAttribute {
                class: class.name().to_string(),
                name: name.to_string(),
            });
        }
        self.begin(&SetOptions::default());
        self.unset_one(&class, name);
        self.end();
        Ok(())
    }

    /// Unsets every attribute as one change.
    pub fn clear(&self) {
        let class = self.class();
        let names: Vec<String> = self.0.borrow().attributes.keys().cloned().collect();
        self.begin(&SetOptions::default());
        for name in names {
            self.unset_one(&class, &name);
        }
        self.end();
    }

    fn unset_one(&self, class: &ModelClass, name: &str) {
        match class.attribute(name) {
            Some(spec) => self.store(name, Some(spec), Value::Null, &SetOptions::default()),
            None => {
                let mut state = self.0.borrow_mut();
                if let Some(previous) = state.attributes.shift_remove(name) {
                    state.batch.touch(name, &previous);
                }
            }
        }
    }

    fn is_stored(&self, name: &str) -> bool {
        self.0.borrow().attributes.contains_key(name)
    }

    fn write_property(
        &self,
        class: &ModelClass,
        name: &str,
        property: &Property,
        value: Value,
    ) -> Result<()> {
        match property {
            Property::Computed(_) => Err(Error::ReadOnlyProperty {
                class: class.name().to_string(),
                name: name.to_string(),
            }),
            Property::ReadWrite { set, .. } => {
                set(self, value);
                Ok(())
            }
        }
    }

    /// Runs the set hook (unless it is already running for `name`), then
    /// stores. A hook that writes its own attribute has the last word.
    fn write(&self, class: &ModelClass, name: &str, raw: Value, options: &SetOptions, merge: bool) {
        let spec = class.attribute(name);
        let raw = if merge {
            match spec {
                Some(spec) => match self.merge_into_nested(name, spec, raw, options) {
                    Some(raw) => raw,
                    None => return,
                },
                None => raw,
            }
        } else {
            raw
        };

        let hook = spec.and_then(AttrSpec::set_hook);
        let reentrant = self.0.borrow().hook_frames.iter().any(|(n, _)| n == name);
        match hook {
            Some(hook) if !reentrant => {
                self.0.borrow_mut().hook_frames.push((name.to_string(), false));
                let result = hook(self, raw);
                let wrote_itself = self
                    .0
                    .borrow_mut()
                    .hook_frames
                    .pop()
                    .is_some_and(|(_, wrote)| wrote);
                if !wrote_itself {
                    self.store(name, spec, result, options);
                }
            }
            _ => self.store(name, spec, raw, options),
        }
    }

    /// Hands plain data for an existing nested value to that value's own
    /// bulk update. Gives the data back when it does not apply.
    fn merge_into_nested(
        &self,
        name: &str,
        spec: &AttrSpec,
        raw: Value,
        options: &SetOptions,
    ) -> Option<Value> {
        let current = self.0.borrow().attributes.get(name).cloned();
        let outcome = match (spec.ty(), current, raw) {
            (AttrType::Model(_), Some(Value::Model(child)), attrs @ Value::Object(_)) => {
                child.set_with(attrs, options)
            }
            (
                AttrType::Collection(_) | AttrType::Subset(_),
                Some(Value::Collection(child)),
                Value::Array(items),
            ) => {
                child.set_with(items, options);
                Ok(())
            }
            (_, _, raw) => return Some(raw),
        };
        self.0.borrow_mut().mark_hook_write(name);
        if let Err(error) = outcome {
            warn!(attribute = %name, %error, "Nested update failed");
        }
        None
    }

    fn store(&self, name: &str, spec: Option<&AttrSpec>, raw: Value, options: &SetOptions) {
        let value = match spec {
            Some(spec) => coerce::coerce(spec, raw, options),
            None => raw,
        };
        let previous = {
            let mut state = self.0.borrow_mut();
            state.mark_hook_write(name);
            let previous = state
                .attributes
                .insert(name.to_string(), value.clone())
                .unwrap_or_default();
            state.batch.touch(name, &previous);
            previous
        };
        if !previous.same_node(&value) {
            self.detach(name, &previous);
            if let Some(spec) = spec {
                self.attach(name, spec, &value);
            }
        }
    }

    /// Takes ownership of a nested value and wires the class's `listening`
    /// handlers to it.
    fn attach(&self, name: &str, spec: &AttrSpec, value: &Value) {
        let link = || OwnerLink::model_slot(self, name, spec.triggers_when_changed());
        let source = match (spec.ty(), value) {
            (AttrType::Model(_), Value::Model(child)) => {
                child.set_owner(link());
                Source::Model(child.clone())
            }
            (AttrType::Collection(_) | AttrType::Subset(_), Value::Collection(child)) => {
                child.set_owner(link());
                Source::Collection(child.clone())
            }
            _ => return,
        };

        let class = self.class();
        let listening = class.listening(name);
        if listening.is_empty() {
            return;
        }
        let listeners = listening
            .iter()
            .map(|entry| {
                let owner = self.downgrade();
                let handler = entry.handler.clone();
                source.on(&entry.events, move |event| {
                    if let Some(owner) = owner.upgrade() {
                        handler.invoke(&owner, event);
                    }
                })
            })
            .collect();
        trace!(attribute = %name, count = listening.len(), "Listening handlers wired");
        self.0
            .borrow_mut()
            .wiring
            .insert(name.to_string(), Wiring { source, listeners });
    }

    fn detach(&self, name: &str, previous: &Value) {
        let wiring = self.0.borrow_mut().wiring.shift_remove(name);
        if let Some(wiring) = wiring {
            for id in wiring.listeners {
                wiring.source.release(id);
            }
        }
        match previous {
            Value::Model(child) => child.release_owner_if(|link| link.is_model_slot(self, name)),
            Value::Collection(child) => {
                child.release_owner_if(|link| link.is_model_slot(self, name));
            }
            _ => {}
        }
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

    pub(crate) fn join_collection(&self, collection: &Collection) {
        let mut state = self.0.borrow_mut();
        state.collections.retain(OwnerLink::is_live);
        if !state.collections.iter().any(|l| l.is_collection(collection)) {
            state.collections.push(OwnerLink::collection(collection));
        }
    }

    pub(crate) fn leave_collection(&self, collection: &Collection) {
        self.0
            .borrow_mut()
            .collections
            .retain(|l| l.is_live() && !l.is_collection(collection));
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

    /// Reports everything the batch changed: `change:<attr>` per attribute,
    /// then one `change`. Writes made by those handlers are reported in
    /// further rounds of the same flush. Returns the owner links to bubble
    /// through when something was reported.
    fn flush(&self) -> Vec<OwnerLink> {
        let silent = {
            let mut state = self.0.borrow_mut();
            state.batch.reopen();
            state.batch.is_silent()
        };
        let mut reported = false;
        let mut change_fired = false;
        loop {
            let changes = {
                let mut guard = self.0.borrow_mut();
                let state = &mut *guard;
                state.batch.drain_changes(&state.attributes)
            };
            if !changes.is_empty() {
                if !reported {
                    let mut state = self.0.borrow_mut();
                    state.previous = state.attributes.clone();
                    state.changed.clear();
                }
                reported = true;
                change_fired = false;
                {
                    let mut guard = self.0.borrow_mut();
                    let state = &mut *guard;
                    for (name, before) in &changes {
                        if !state.changed.contains_key(name) {
                            state.previous.insert(name.clone(), before.clone());
                        }
                        let now = state.attributes.get(name).cloned().unwrap_or_default();
                        state.changed.insert(name.clone(), now);
                    }
                }
                if !silent {
                    for (name, _) in &changes {
                        self.emit(&format!("change:{name}"), Vec::new(), None);
                    }
                }
                continue;
            }
            if reported && !change_fired && !silent {
                change_fired = true;
                self.emit("change", Vec::new(), None);
                continue;
            }
            break;
        }

        let mut state = self.0.borrow_mut();
        state.batch.leave();
        state.batch.reset();
        if reported && !silent {
            trace!(class = %state.class.name(), changed = state.changed.len(), "Change reported");
            state.owner.iter().chain(&state.collections).cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Called when the nested value in `attribute` changed in place.
    pub(crate) fn absorb_nested_change(&self, attribute: &str) -> Vec<OwnerLink> {
        let active = {
            let mut state = self.0.borrow_mut();
            state.batch.mark_nested(attribute);
            state.batch.is_active()
        };
        if active { Vec::new() } else { self.flush() }
    }

    // ── Change tracking ──────────────────────────────────────────

    /// Value `name` had before the last reported change.
    #[must_use]
    pub fn previous(&self, name: &str) -> Option<Value> {
        let state = self.0.borrow();
        state
            .previous
            .get(name)
            .filter(|_| state.changed.contains_key(name))
            .or_else(|| state.attributes.get(name))
            .cloned()
    }

    /// Attributes reported by the last change, with their new values.
    #[must_use]
    pub fn changed_attributes(&self) -> Map {
        self.0.borrow().changed.clone()
    }

    #[must_use]
    pub fn has_changed(&self, name: &str) -> bool {
        self.0.borrow().changed.contains_key(name)
    }

    // ── Events ───────────────────────────────────────────────────

    /// Subscribes to space-separated event names (`all` matches every event).
    pub fn on(&self, names: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        self.0.borrow_mut().events.on(names, callback)
    }

    pub fn once(&self, names: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        self.0.borrow_mut().events.once(names, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.0.borrow_mut().events.off(id)
    }

    /// Removes every listener for `name`. Returns how many were removed.
    pub fn off_event(&self, name: &str) -> usize {
        self.0.borrow_mut().events.off_event(name)
    }

    /// Fires a custom event on this model.
    pub fn trigger(&self, name: &str) {
        self.emit(name, Vec::new(), None);
    }

    pub(crate) fn release_listener(&self, id: ListenerId) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            state.events.off(id);
        }
    }

    pub(crate) fn emit(&self, name: &str, members: Vec<Model>, message: Option<String>) {
        let callbacks = self.0.borrow_mut().events.dispatch_list(name);
        if callbacks.is_empty() {
            return;
        }
        let event = Event {
            name: name.to_string(),
            source: Source::Model(self.clone()),
            members,
            message,
        };
        for callback in callbacks {
            callback(&event);
        }
    }

    // ── Serialization and persistence ────────────────────────────

    /// Plain JSON form: nested values serialize recursively, references as
    /// their ids.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let state = self.0.borrow();
        let object = state
            .attributes
            .iter()
            .map(|(name, value)| {
                let json = match state.class.attribute(name).map(AttrSpec::ty) {
                    Some(AttrType::Reference(_)) => coerce::reference_json(value),
                    _ => value.to_json(),
                };
                (name.clone(), json)
            })
            .collect();
        serde_json::Value::Object(object)
    }

    /// Independent copy built from this model's JSON.
    #[must_use]
    pub fn deep_clone(&self) -> Model {
        let class = self.class();
        class.create(Value::from(self.to_json()))
    }

    /// Runs the class's persistence hook.
    pub fn save(&self) -> Result<()> {
        let class = self.class();
        class.handler().save(self).map_err(|message| Error::Persistence {
            class: class.name().to_string(),
            message,
        })
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(state) => f
                .debug_struct("Model")
                .field("class", &state.class.name())
                .field("cid", &state.cid.to_string())
                .field("attributes", &state.attributes.keys().collect::<Vec<_>>())
                .finish(),
            Err(_) => f.write_str("Model(<borrowed>)"),
        }
    }
}
