#![forbid(unsafe_code)]

//! Named-event listener registry.
//!
//! [`Events<E>`] stores callbacks keyed by event name. It does not call
//! anything itself: [`Events::dispatch_list`] hands back a snapshot of the
//! callbacks for a name so the owner can release its borrow before invoking
//! them. Listeners added or removed by a callback take effect from the next
//! dispatch.
//!
//! Names passed to [`Events::on`] may list several events separated by
//! whitespace (`"change:time change:text"`); they share one [`ListenerId`].
//! Listeners registered under [`ALL`] receive every dispatch.

use std::rc::Rc;
use tracing::trace;

/// Wildcard event name.
pub const ALL: &str = "all";

/// A callback stored by the registry.
pub type Callback<E> = Rc<dyn Fn(&E)>;

/// Handle returned by [`Events::on`] / [`Events::once`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric value, unique per registry.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

struct Listener<E> {
    id: ListenerId,
    name: String,
    once: bool,
    callback: Callback<E>,
}

/// Listener registry for one event source.
pub struct Events<E> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

impl<E> Default for Events<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Events<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl<E> Events<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Subscribes `callback` to every whitespace-separated name in `names`.
    pub fn on(&mut self, names: &str, callback: impl Fn(&E) + 'static) -> ListenerId {
        self.register(names, Rc::new(callback), false)
    }

    /// Like [`Events::on`], but each name fires at most once.
    pub fn once(&mut self, names: &str, callback: impl Fn(&E) + 'static) -> ListenerId {
        self.register(names, Rc::new(callback), true)
    }

    fn register(&mut self, names: &str, callback: Callback<E>, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        for name in names.split_whitespace() {
            self.listeners.push(Listener {
                id,
                name: name.to_string(),
                once,
                callback: Rc::clone(&callback),
            });
        }
        id
    }

    /// Removes every registration made under `id`. Returns true if any existed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Removes all listeners for `name`. Returns how many were removed.
    pub fn off_event(&mut self, name: &str) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.name != name);
        before - self.listeners.len()
    }

    /// Callbacks to invoke for `name`, in registration order, followed by the
    /// [`ALL`] listeners. One-shot listeners are removed by this call.
    pub fn dispatch_list(&mut self, name: &str) -> Vec<Callback<E>> {
        let mut callbacks = Vec::new();
        for l in &self.listeners {
            if l.name == name {
                callbacks.push(Rc::clone(&l.callback));
            }
        }
        if name != ALL {
            for l in &self.listeners {
                if l.name == ALL {
                    callbacks.push(Rc::clone(&l.callback));
                }
            }
        }
        self.listeners
            .retain(|l| !(l.once && (l.name == name || l.name == ALL)));
        trace!(event = name, listeners = callbacks.len(), "dispatch");
        callbacks
    }

    /// Number of listeners registered for `name` (not counting [`ALL`]).
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.iter().filter(|l| l.name == name).count()
    }

    /// Total registrations across all names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
