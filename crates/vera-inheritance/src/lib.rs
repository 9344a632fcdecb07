//! # vera-inheritance: Scope-Hierarchy Policy Inheritance
//!
//! Computes the policy in force at a scope by merging every policy on its
//! ancestor chain, root to leaf.
//!
//! ## Guarantees
//!
//! - **Provenance.** Every final field records the scope, policy, and mode
//!   that produced it.
//! - **No partial merges.** An incompatible conflict fails the computation
//!   with [`InheritanceError::Conflict`]; nothing is returned to activate.
//! - **Stable hashes.** The content hash is computed over the canonical
//!   form from `vera-core`, so audit stores can recompute it.
//!
//! The computer holds no state. Persistence, caching, and cascade
//! scheduling belong to callers; [`ScopeTree::invalidation_order`] tells
//! them which scopes a change affects.

pub mod conflict;
pub mod effective;
pub mod error;
pub mod policy;
pub mod scope;

// Re-export primary types.
pub use conflict::{
    classify, ConflictClassification, ConflictPolicy, ConflictSeverity, LooserSeverity,
    PolicyConflict, ResolutionRecord, ResolutionStatus,
};
pub use effective::{
    compute, recompute, EffectiveOutcome, EffectivePolicy, EffectivePolicyComputer,
    FieldProvenance,
};
pub use error::InheritanceError;
pub use policy::{InheritanceMode, ScopedPolicy};
pub use scope::{Scope, ScopeTree, ScopeType};
