//! # Error Hierarchy
//!
//! Structured error types for the governance core, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Errors are raised synchronously at the point of detection and carry
//! enough context (rule id, policy id, field path) for an administrator to
//! locate the offending record without reading logs. No operation in the
//! core retries.

use thiserror::Error;

/// Top-level error type for the governance core.
#[derive(Error, Debug)]
pub enum VeraError {
    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Conflict resolution lifecycle violation.
    #[error("state transition error: {0}")]
    StateTransition(#[from] StateTransitionError),

    /// Malformed rule, policy, scope, or identifier.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Recomputed content does not match a stored digest.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Thresholds and counts must be integers.
    #[error("float values are not permitted in canonical representations; use an integer or string: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors during conflict resolution transitions.
#[derive(Error, Debug)]
pub enum StateTransitionError {
    /// The attempted transition is not valid from the current state.
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// The current state name.
        from: String,
        /// The attempted target state name.
        to: String,
        /// Human-readable reason for the rejection.
        reason: String,
    },
}

/// Authoring-time validation failures.
///
/// A `ValidationError` blocks the offending write. It is never silently
/// defaulted: the caller must fix the record and resubmit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier newtype was constructed from an empty string.
    #[error("invalid {kind}: must be non-empty")]
    EmptyIdentifier {
        /// Which identifier kind was empty.
        kind: &'static str,
    },

    /// A dotted field path could not be parsed.
    #[error("invalid field path \"{path}\": {reason}")]
    InvalidFieldPath {
        /// The raw path string.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A rule uses an operator outside the supported set.
    #[error("rule {rule_id} uses an unsupported operator on field {field}")]
    UnsupportedOperator {
        /// The offending rule.
        rule_id: String,
        /// The clause's field path.
        field: String,
    },

    /// A clause's comparison value cannot be used with its operator.
    #[error("rule {rule_id}: invalid comparison value for {operator} on {field}: {reason}")]
    InvalidComparisonValue {
        /// The offending rule.
        rule_id: String,
        /// The clause's field path.
        field: String,
        /// The operator name.
        operator: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An OR combinator with no children can never match.
    #[error("rule {rule_id} contains an empty OR condition")]
    EmptyDisjunction {
        /// The offending rule.
        rule_id: String,
    },

    /// A condition tree exceeds the nesting limit.
    #[error("rule {rule_id} condition nesting exceeds {max_depth} levels")]
    ConditionTooDeep {
        /// The offending rule.
        rule_id: String,
        /// The configured maximum depth.
        max_depth: usize,
    },

    /// Two rules in one rule set share an id.
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),

    /// A decision rule stored inside an effective policy is malformed.
    #[error("malformed decision rule at index {index}: {reason}")]
    MalformedDecisionRule {
        /// Position in the `decision_rules` array.
        index: usize,
        /// Deserialization failure detail.
        reason: String,
    },

    /// A scoped policy's rule set is not a JSON object.
    #[error("policy {policy_id}: {section} must be a JSON object")]
    RuleSetNotObject {
        /// The offending policy.
        policy_id: String,
        /// `rules` or `override_rules`.
        section: &'static str,
    },

    /// A registered field carries a value of the wrong kind.
    #[error("policy {policy_id}: field {field} expects {expected}, found {actual}")]
    FieldKindMismatch {
        /// The offending policy.
        policy_id: String,
        /// The registered field path.
        field: String,
        /// The kind declared by the registry.
        expected: String,
        /// The kind found in the policy.
        actual: String,
    },

    /// The ancestor chain is empty.
    #[error("ancestor chain is empty")]
    EmptyChain,

    /// The last chain entry is not the target scope.
    #[error("ancestor chain ends at scope {actual}, expected target {expected}")]
    ChainTargetMismatch {
        /// The requested target scope.
        expected: String,
        /// The scope the chain actually ends at.
        actual: String,
    },

    /// Consecutive chain entries are not parent and child.
    #[error("scope {scope_id} has parent {actual_parent:?}, expected {expected_parent}")]
    BrokenChain {
        /// The child scope.
        scope_id: String,
        /// The preceding chain entry.
        expected_parent: String,
        /// The parent the scope actually declares.
        actual_parent: Option<String>,
    },

    /// Scope types do not descend enterprise → region → country → brand.
    #[error("scope {scope_id} of type {child_type} cannot sit below a {parent_type} scope")]
    ScopeDepthOrder {
        /// The child scope.
        scope_id: String,
        /// The parent scope type.
        parent_type: String,
        /// The child scope type.
        child_type: String,
    },

    /// A scope appears twice.
    #[error("duplicate scope: {0}")]
    DuplicateScope(String),

    /// A scope references a parent that does not exist.
    #[error("unknown scope: {0}")]
    UnknownScope(String),

    /// Following parent links from a scope revisits it.
    #[error("scope hierarchy contains a cycle through {0}")]
    ScopeCycle(String),

    /// A policy is attached to a scope outside the chain.
    #[error("policy {policy_id} is attached to scope {scope_id}, which is not in the chain")]
    PolicyScopeNotInChain {
        /// The offending policy.
        policy_id: String,
        /// The scope it names.
        scope_id: String,
    },
}
