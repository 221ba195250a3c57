//! Scalar building blocks for NestedTypes.
//!
//! This crate holds the model-agnostic pieces the coercion engine is built on:
//! - [`Date`]: a UTC instant that may also be the invalid-date marker
//! - [`number`]: number parsing and formatting with browser semantics
//! - [`IdKey`] and [`Cid`]: collection index keys and client ids
//!
//! Nothing in here knows about models, collections or events.

mod date;
mod ids;
pub mod number;

pub use date::Date;
pub use ids::{Cid, IdKey};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the strict (`FromStr`) parsers.
///
/// Lenient coercion never fails; it degrades to `NaN` or an invalid date.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("invalid client id: {0}")]
    InvalidCid(#[from] uuid::Error),
}
