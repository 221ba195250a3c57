//! Event payload delivered to listeners.

use nestedtypes_events::ListenerId;

use crate::{Collection, Model};

/// The node an event was fired on.
#[derive(Clone, Debug)]
pub enum Source {
    Model(Model),
    Collection(Collection),
}

impl Source {
    #[must_use]
    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Source::Model(m) => Some(m),
            Source::Collection(_) => None,
        }
    }

    #[must_use]
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Source::Collection(c) => Some(c),
            Source::Model(_) => None,
        }
    }

    pub(crate) fn on(&self, names: &str, callback: impl Fn(&Event) + 'static) -> ListenerId {
        match self {
            Source::Model(m) => m.on(names, callback),
            Source::Collection(c) => c.on(names, callback),
        }
    }

    /// Unsubscribes without panicking if the node is mid-dispatch elsewhere.
    pub(crate) fn release(&self, id: ListenerId) {
        match self {
            Source::Model(m) => m.release_listener(id),
            Source::Collection(c) => c.release_listener(id),
        }
    }
}

/// A fired event.
#[derive(Clone, Debug)]
pub struct Event {
    /// `change`, `change:<attr>`, `add`, `remove`, `reset`, `sort`,
    /// `invalid` or `error`.
    pub name: String,
    /// The node that fired it.
    pub source: Source,
    /// Members affected by `add`/`remove`/`reset`; empty otherwise.
    pub members: Vec<Model>,
    /// Message for `invalid`/`error`.
    pub message: Option<String>,
}

impl Event {
    /// Attribute name for `change:<attr>` events.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.name.strip_prefix("change:")
    }
}
