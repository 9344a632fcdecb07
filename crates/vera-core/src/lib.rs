//! # vera-core: Foundational Types for the Governance Core
//!
//! This crate is the leaf of the workspace DAG. It defines the primitives
//! every other crate relies on to produce independently verifiable output.
//!
//! ## Key Design Principles
//!
//! 1. **One field semantics registry.** [`FieldRegistry::standard()`] is the
//!    only table declaring which policy fields are orderless sets, which are
//!    ordered sequences, and how they merge. The canonicalizer and the
//!    effective-policy computer both read it.
//!
//! 2. **`CanonicalBytes` newtype.** All digest computation flows through the
//!    [`Canonicalizer`]. No raw `serde_json::to_vec()` for digests.
//!
//! 3. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that all hash commitments are over canonical bytes.
//!
//! 4. **Paths parsed once.** [`FieldPath`] is a segment sequence built at
//!    construction time; recursion never re-parses dotted strings.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vera-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod path;
pub mod registry;

// Re-export primary types for ergonomic imports.
pub use canonical::{CanonicalBytes, Canonicalizer};
pub use digest::{content_hash, sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, StateTransitionError, ValidationError, VeraError};
pub use identity::{EnterpriseId, PolicyId, PolicySnapshotId, RuleId, ScopeId, TenantId};
pub use path::{FieldPath, PathSegment};
pub use registry::{
    describe_kind, ArrayOrder, FieldDirective, FieldRegistry, MergeRule, Strictness, ValueKind,
};
