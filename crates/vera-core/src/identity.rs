//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the identifiers that flow through the
//! governance core. Each identifier is a distinct type: a [`RuleId`] cannot
//! be passed where a [`ScopeId`] is expected.
//!
//! All identifiers here are opaque strings minted by external collaborators
//! (policy administration, event ingestion). The only local invariant is
//! non-emptiness, checked on construction and on deserialization.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create the identifier, rejecting empty or all-whitespace input.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::EmptyIdentifier`] for blank input.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if s.trim().is_empty() {
                    return Err(ValidationError::EmptyIdentifier { kind: $kind });
                }
                Ok(Self(s))
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_identifier!(
    /// Identifier of a node in the enterprise → region → country → brand tree.
    ScopeId,
    "scope id"
);

string_identifier!(
    /// Identifier of a scoped policy record.
    PolicyId,
    "policy id"
);

string_identifier!(
    /// Identifier of a decision rule. Also the priority tie-breaker.
    RuleId,
    "rule id"
);

string_identifier!(
    /// Identifier of the partner tenant that issued a usage event.
    TenantId,
    "tenant id"
);

string_identifier!(
    /// Identifier of the enterprise whose policy governs an event.
    EnterpriseId,
    "enterprise id"
);

string_identifier!(
    /// Identifier of the effective policy snapshot an event was evaluated
    /// against. Binds a verdict to the policy version in force.
    PolicySnapshotId,
    "policy snapshot id"
);
