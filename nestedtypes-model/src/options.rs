use serde::{Deserialize, Serialize};

/// Options accepted by construction and every mutating operation.
///
/// The same options travel into nested construction and nested bulk
/// updates triggered by the operation, so `parse` reaches every model built
/// from the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// Run the class's `parse` hook on raw input first.
    pub parse: bool,
    /// Apply changes without firing events or bubbling.
    pub silent: bool,
    /// Run the class's `validate` hook before a bulk `set`.
    pub validate: bool,
}

impl SetOptions {
    /// Options with only `parse` set.
    #[must_use]
    pub const fn parse() -> Self {
        Self {
            parse: true,
            silent: false,
            validate: false,
        }
    }

    /// Options with only `silent` set.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            parse: false,
            silent: true,
            validate: false,
        }
    }

    /// Options with only `validate` set.
    #[must_use]
    pub const fn validate() -> Self {
        Self {
            parse: false,
            silent: false,
            validate: true,
        }
    }
}
