//! Identifier types for models and collections.
//!
//! Client ids use UUID v7 so they are unique without a server round trip
//! and sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::number::format_number;

/// Client-side identifier, assigned to every model and collection on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(Uuid);

impl Cid {
    /// Creates a new client id with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a client id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a client id from a string.
    pub fn parse(s: &str) -> Result<Self, crate::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for Cid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cid {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Key under which a collection indexes a member's `id`.
///
/// Numeric and string ids share one key space, so `1` and `"1"` address
/// the same member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdKey(String);

impl IdKey {
    /// Key for a numeric id. `NaN` is never a usable id.
    #[must_use]
    pub fn from_number(n: f64) -> Option<Self> {
        if n.is_nan() {
            None
        } else {
            Some(Self(format_number(n)))
        }
    }

    /// Key for a string id.
    #[must_use]
    pub fn from_text(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The key as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
