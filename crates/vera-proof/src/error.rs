//! # Proof Bundle Error Types

use thiserror::Error;

use vera_core::{CanonicalizationError, PolicySnapshotId};

/// Errors from compiling or checking a proof bundle.
#[derive(Error, Debug)]
pub enum ProofError {
    /// A caller extra reuses a key owned by the extraction schema.
    #[error("extra key {0:?} is reserved by the evidence schema")]
    ReservedKey(String),

    /// The verdict was resolved under a different policy snapshot than
    /// the event carries.
    #[error("verdict snapshot {verdict} does not match event snapshot {event}")]
    SnapshotMismatch {
        /// Snapshot named by the event.
        event: PolicySnapshotId,
        /// Snapshot named by the verdict.
        verdict: PolicySnapshotId,
    },

    /// Stored hash does not match the recomputed one.
    #[error("proof bundle {bundle_id} integrity violation: expected {expected}, got {actual}")]
    IntegrityViolation {
        /// The bundle identifier.
        bundle_id: String,
        /// The stored digest.
        expected: String,
        /// The recomputed digest.
        actual: String,
    },

    /// Evidence items could not be canonicalized (e.g. a float extra).
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
