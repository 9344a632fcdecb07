//! Scoped policies: a rule set attached to one scope, with the inheritance
//! mode that decides how it combines with what the ancestors contributed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vera_core::{PolicyId, ScopeId};

/// How a policy's fields combine with inherited values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceMode {
    /// Supersede inherited values under every top-level key this policy sets.
    Replace,
    /// Combine via the field's registered merge rule.
    #[default]
    Merge,
    /// Concatenate arrays onto the inherited sequence.
    Append,
}

impl InheritanceMode {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Merge => "merge",
            Self::Append => "append",
        }
    }
}

impl std::fmt::Display for InheritanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule set attached to a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedPolicy {
    /// Policy identifier.
    pub policy_id: PolicyId,
    /// Scope the policy is attached to.
    pub scope_id: ScopeId,
    /// Combination mode.
    #[serde(default)]
    pub inheritance_mode: InheritanceMode,
    /// Field values; must be a JSON object.
    pub rules: Value,
    /// Point overrides applied after `rules`; must be a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_rules: Option<Value>,
    /// The policy this one was derived from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_policy_id: Option<PolicyId>,
}

impl ScopedPolicy {
    /// A policy with no overrides and no parent reference.
    pub fn new(
        policy_id: PolicyId,
        scope_id: ScopeId,
        inheritance_mode: InheritanceMode,
        rules: Value,
    ) -> Self {
        Self {
            policy_id,
            scope_id,
            inheritance_mode,
            rules,
            override_rules: None,
            parent_policy_id: None,
        }
    }

    /// Attach point overrides.
    pub fn with_overrides(mut self, override_rules: Value) -> Self {
        self.override_rules = Some(override_rules);
        self
    }
}
