//! Error types for the model layer.
//!
//! Coercion never fails: bad input becomes `NaN`, an invalid date or `null`.
//! What does fail is misuse of a schema (naming an attribute that does not
//! exist, assigning a read-only property) and the hooks a class plugs in
//! (validation, persistence).

use thiserror::Error;

/// Result type for model and collection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by model and collection operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `get`/`set_attr` named something the class does not declare.
    #[error("{class} has no attribute or property `{name}`")]
    UnknownAttribute { class: String, name: String },

    /// Assignment to a computed, read-only property.
    #[error("property `{name}` of {class} is read-only")]
    ReadOnlyProperty { class: String, name: String },

    /// A bulk operation was given something other than a mapping.
    #[error("expected a mapping of attributes, got {0}")]
    ExpectedMapping(&'static str),

    /// `sort` on a collection without a comparator.
    #[error("cannot sort a collection without a comparator")]
    NoComparator,

    /// The class's validation hook rejected a bulk `set`.
    #[error("validation failed for {class}: {message}")]
    Validation { class: String, message: String },

    /// The persistence hook reported a failure.
    #[error("save failed for {class}: {message}")]
    Persistence { class: String, message: String },

    /// A class definition was rejected.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors raised while building a class definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{class}: attribute names must not be empty")]
    EmptyAttributeName { class: String },

    #[error("{class}: `listening` refers to undeclared attribute `{attribute}`")]
    UnknownListeningAttribute { class: String, attribute: String },

    #[error("{class}: `listening` on `{attribute}` needs a nested model or collection attribute")]
    ListeningOnScalar { class: String, attribute: String },

    #[error("{class}: listening handler refers to unknown method `{method}`")]
    UnknownMethod { class: String, method: String },

    #[error("{class}: id attribute `{attribute}` cannot hold a nested model or collection")]
    NestedIdAttribute { class: String, attribute: String },
}
