use crate::{Map, Model, Value};

/// Optional lifecycle hooks for a model class.
///
/// Most classes do NOT need one: attribute descriptors cover typing,
/// defaults and custom accessors. Implement this if you need:
/// - Input normalisation on `parse` (e.g., unwrapping a server envelope)
/// - Post-construction setup (`initialize`)
/// - Validation of bulk updates
/// - Persistence (`save`), which the core calls but does not implement
///
/// A subclass inherits its parent's handler unless it installs its own.
pub trait ModelHandler {
    /// Called with raw input when `SetOptions::parse` is set. Returns the
    /// attribute mapping to apply; anything but an object applies nothing.
    fn parse(&self, model: &Model, raw: Value) -> Value {
        let _ = model;
        raw
    }

    /// Called once after construction, before the model is returned.
    fn initialize(&self, model: &Model) {
        let _ = model;
    }

    /// Validate a bulk update before it is applied.
    /// Return `Err(message)` to reject it.
    fn validate(&self, model: &Model, attrs: &Map) -> Result<(), String> {
        let _ = (model, attrs);
        Ok(())
    }

    /// Persist the model. The default does nothing.
    fn save(&self, model: &Model) -> Result<(), String> {
        let _ = model;
        Ok(())
    }
}

/// Handler used by classes that do not install one.
pub(crate) struct DefaultHandler;

impl ModelHandler for DefaultHandler {}
