//! Errors raised by the effective-policy computer.

use thiserror::Error;

use vera_core::{CanonicalizationError, PolicyId, ScopeId, ValidationError};

use crate::conflict::PolicyConflict;

/// Failure to compute an effective policy.
#[derive(Error, Debug)]
pub enum InheritanceError {
    /// A scope, chain, or policy is malformed. Blocks the write.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// At least one incompatible conflict. Blocks activation; no partial
    /// result is produced.
    #[error(
        "policy {policy_id} at scope {scope_id} is incompatible with its ancestors ({} conflict(s))",
        .conflicts.len()
    )]
    Conflict {
        /// Scope of the first incompatible policy.
        scope_id: ScopeId,
        /// The first incompatible policy.
        policy_id: PolicyId,
        /// Every conflict found during the computation.
        conflicts: Vec<PolicyConflict>,
    },

    /// The merged values could not be hashed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
