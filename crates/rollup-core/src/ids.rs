//! Strongly-typed record identifiers.
//!
//! Keeps a line item id from being passed where a product or use-group id is
//! expected.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque, non-empty string ids. Sample exports hold ids that are not valid
/// UUIDs, so nothing beyond non-emptiness is checked.
macro_rules! define_ids {
    ($($(#[$meta:meta])* $Name:ident => $label:literal;)+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $Name(String);

        impl $Name {
            /// Entity name used in error messages
            pub const LABEL: &'static str = $label;

            /// Build an id from trusted input. Panics when empty.
            pub fn new(id: impl Into<String>) -> Self {
                let id = id.into();
                assert!(!id.is_empty(), concat!($label, " id must not be empty"));
                Self(id)
            }

            pub fn try_new(id: impl Into<String>) -> Option<Self> {
                let id = id.into();
                (!id.is_empty()).then_some(Self(id))
            }

            /// Like `try_new`, with an error naming the entity
            pub fn parse(id: impl Into<String>) -> CoreResult<Self> {
                Self::try_new(id).ok_or_else(|| CoreError::EmptyId {
                    context: concat!($label, " id").to_string(),
                })
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $Name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let id = String::deserialize(deserializer)?;
                Self::try_new(id).ok_or_else(|| {
                    serde::de::Error::custom(concat!($label, " id must not be empty"))
                })
            }
        }

        impl fmt::Display for $Name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    )+};
}

define_ids! {
    /// Line item within an estimate
    LineItemId => "line item";
    EstimateId => "estimate";
    ProjectId => "project";
    /// Catalog (UPC) product
    ProductId => "product";
    MarkupId => "markup";
    /// Estimate-scoped use group
    EstimateUseGroupId => "estimate use group";
    /// Application-level use group
    UseGroupId => "use group";
    SortFieldId => "sort field";
    SortCodeId => "sort code";
    /// Optional pricing branch
    AlternateId => "alternate";
}
