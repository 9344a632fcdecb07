//! # vera-proof: Decision Proof Bundles
//!
//! Compiles a usage event and its verdict into a minimal-disclosure,
//! tamper-evident evidence record that can be shared with the enterprise
//! without exposing the partner's prompts or generated content.
//!
//! ```text
//! UsageEvent + Verdict ──▶ compile() ──▶ ProofBundle { items, integrity_hash }
//!                                              │
//!                                              └──▶ verify() ──▶ IntegrityCheck
//! ```

pub mod bundle;
pub mod error;

pub use bundle::{
    compile, compile_with_id, hash_items, BundleId, EvidenceItem, IntegrityCheck, ProofBundle,
    SCHEMA_KEYS,
};
pub use error::ProofError;
