//! Change aggregation and bubbling.
//!
//! Every mutating operation runs inside a batch. Batches nest: only leaving
//! the outermost one flushes, so writes made by hooks and by change handlers
//! while a flush is running land in the same batch instead of starting new
//! ones.
//!
//! A nested node keeps a weak link to the slot that owns it. When its flush
//! reports a change, [`propagate`] walks those links upwards: an ancestor
//! that is itself mid-batch just records the dirty slot (its own flush will
//! report it), an idle ancestor runs a one-entry batch and hands back its
//! own links. A link with bubbling disabled ends that branch of the walk.
//!
//! The attribute slot owning a model is exclusive; the owning collections
//! it is a member of are tracked separately, and each one hears about its
//! changes.

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

use crate::collection::WeakCollection;
use crate::model::WeakModel;
use crate::{Collection, Model, Value};

/// The slot a nested node lives in.
#[derive(Clone, Debug)]
pub(crate) enum Parent {
    Model { model: WeakModel, attribute: String },
    Collection(WeakCollection),
}

/// Back-reference from a nested node to its owner.
#[derive(Clone, Debug)]
pub(crate) struct OwnerLink {
    pub(crate) parent: Parent,
    pub(crate) bubble: bool,
}

impl OwnerLink {
    pub(crate) fn model_slot(owner: &Model, attribute: &str, bubble: bool) -> Self {
        Self {
            parent: Parent::Model {
                model: owner.downgrade(),
                attribute: attribute.to_string(),
            },
            bubble,
        }
    }

    pub(crate) fn collection(owner: &Collection) -> Self {
        Self {
            parent: Parent::Collection(owner.downgrade()),
            bubble: true,
        }
    }

    pub(crate) fn is_model_slot(&self, owner: &Model, attr: &str) -> bool {
        match &self.parent {
            Parent::Model { model, attribute } => model.points_to(owner) && attribute == attr,
            Parent::Collection(_) => false,
        }
    }

    /// False once the owner has been dropped.
    pub(crate) fn is_live(&self) -> bool {
        match &self.parent {
            Parent::Model { model, .. } => model.upgrade().is_some(),
            Parent::Collection(c) => c.upgrade().is_some(),
        }
    }

    pub(crate) fn is_collection(&self, owner: &Collection) -> bool {
        match &self.parent {
            Parent::Collection(c) => c.points_to(owner),
            Parent::Model { .. } => false,
        }
    }
}

/// Bookkeeping for one node's current batch.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    depth: u32,
    silent: bool,
    /// Value each touched attribute had when it was last reported (or when
    /// the batch began).
    baseline: IndexMap<String, Value>,
    /// Attributes whose nested value changed in place.
    nested: IndexSet<String>,
    /// Collection membership, order or a member changed.
    dirty: bool,
}

impl Batch {
    /// Enters a (possibly nested) batch.
    pub(crate) fn enter(&mut self, silent: bool) {
        if self.depth == 0 {
            self.silent = silent;
        }
        self.depth += 1;
    }

    /// Re-enters for the duration of a flush, keeping the batch's silence.
    pub(crate) fn reopen(&mut self) {
        self.depth += 1;
    }

    /// Leaves a batch. Returns true when the outermost batch was left and
    /// the node should flush.
    pub(crate) fn leave(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        self.depth == 0
    }

    pub(crate) fn is_active(&self) -> bool {
        self.depth > 0
    }

    pub(crate) fn is_silent(&self) -> bool {
        self.silent
    }

    /// Records the value an attribute held before being written.
    pub(crate) fn touch(&mut self, attribute: &str, before: &Value) {
        if !self.baseline.contains_key(attribute) {
            self.baseline.insert(attribute.to_string(), before.clone());
        }
    }

    pub(crate) fn mark_nested(&mut self, attribute: &str) {
        self.nested.insert(attribute.to_string());
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Attributes that changed since they were last reported, by value,
    /// each with the value it had before. Baselines move to the current
    /// values.
    pub(crate) fn drain_changes(
        &mut self,
        current: &IndexMap<String, Value>,
    ) -> Vec<(String, Value)> {
        let mut changed: Vec<(String, Value)> = Vec::new();
        for (name, baseline) in self.baseline.iter_mut() {
            let now = current.get(name).cloned().unwrap_or_default();
            if *baseline != now {
                let before = std::mem::replace(baseline, now);
                changed.push((name.clone(), before));
            }
        }
        for name in self.nested.drain(..) {
            if !changed.iter().any(|(n, _)| *n == name) {
                let now = current.get(&name).cloned().unwrap_or_default();
                changed.push((name, now));
            }
        }
        changed
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Forgets everything recorded; called once a flush completes.
    pub(crate) fn reset(&mut self) {
        self.baseline.clear();
        self.nested.clear();
        self.dirty = false;
        self.silent = false;
    }
}

/// Walks owner links upwards from a node that just reported a change.
/// A model may sit in one attribute slot and several collections, so the
/// walk fans out breadth first.
pub(crate) fn propagate(links: Vec<OwnerLink>) {
    let mut pending: VecDeque<OwnerLink> = links.into();
    while let Some(next) = pending.pop_front() {
        if !next.bubble {
            continue;
        }
        let above = match &next.parent {
            Parent::Model { model, attribute } => model
                .upgrade()
                .map(|owner| owner.absorb_nested_change(attribute)),
            Parent::Collection(collection) => collection
                .upgrade()
                .map(|owner| owner.absorb_member_change()),
        };
        pending.extend(above.into_iter().flatten());
    }
}
