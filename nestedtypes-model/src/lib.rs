//! Typed, nested, observable models and collections.
//!
//! - [`ModelClass`]: a declared schema (attributes, properties, listening
//!   handlers, lifecycle hooks) built with [`ModelClassBuilder`]
//! - [`Model`]: an instance whose writes are coerced to the declared types
//! - [`Collection`]: ordered, id-indexed members of one model class, with a
//!   [`CollectionClass`] generated for every model class
//! - [`Value`]: the dynamic value held in attribute slots
//!
//! Changes are consolidated: one operation, however many attributes or
//! nested levels it touches, fires each `change:<attr>` at most once and a
//! single `change` per affected node, and nested changes bubble to owners.

mod attribute;
mod bubble;
mod class;
mod coerce;
mod collection;
mod error;
mod event;
mod handler;
mod model;
mod options;
mod value;

pub use attribute::{AttrOptions, AttrSpec, AttrType, DefaultValue, GetHook, SetHook};
pub use class::{Handler, Method, ModelClass, ModelClassBuilder, Property};
pub use collection::{Collection, CollectionClass, CollectionConfig, Comparator};
pub use error::{Error, Result, SchemaError};
pub use event::{Event, Source};
pub use handler::ModelHandler;
pub use model::Model;
pub use options::SetOptions;
pub use value::{Map, Value};

pub use nestedtypes_events::ListenerId;
pub use nestedtypes_types::{Cid, Date, IdKey};
