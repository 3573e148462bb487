//! Strongly-typed identifiers used across the workspace.
//!
//! Record stores key documents by free-form strings (a formulation id, a raw
//! ingredient name such as `"Biochar"`), so these wrap `String` rather than a
//! UUID. Construction through `FromStr` validates; `new` is for trusted
//! values (tests, constants).

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a production site (top-level partition of the record store).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

/// Identifier of an inventory item (a formulation id or a raw ingredient name).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

/// Identifier of a formulation (recipe of a finished good).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulationId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                if trimmed.contains('/') {
                    return Err(DomainError::invalid_id(format!(
                        "{}: '{}' contains a path separator",
                        $name, trimmed
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_newtype!(SiteId, "SiteId");
impl_string_newtype!(ItemId, "ItemId");
impl_string_newtype!(FormulationId, "FormulationId");

impl From<FormulationId> for ItemId {
    /// Finished goods are tracked in inventory under their formulation id.
    fn from(value: FormulationId) -> Self {
        ItemId(value.0)
    }
}

impl From<&FormulationId> for ItemId {
    fn from(value: &FormulationId) -> Self {
        ItemId(value.0.clone())
    }
}
