//! # Policy Rules and Verdicts
//!
//! A [`PolicyRule`] pairs a condition tree with a decision. Rules are
//! read-only to the resolver; a [`Verdict`] is created fresh for every
//! resolution and never mutated afterwards.

use serde::{Deserialize, Serialize};

use vera_core::{PolicySnapshotId, RuleId};

use crate::condition::ConditionNode;

/// Outcome of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The usage is permitted.
    Allow,
    /// The usage is denied.
    Block,
    /// A human reviewer must decide.
    RequiresReview,
}

impl DecisionStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Block => "block",
            Self::RequiresReview => "requires_review",
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a rule decides when it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Verdict status.
    pub status: DecisionStatus,
    /// Human-readable reason shown to the partner.
    pub reason: String,
}

fn default_active() -> bool {
    true
}

/// A prioritized decision rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Unique rule identifier within its rule set.
    pub id: RuleId,
    /// Lower values take precedence.
    pub priority: i64,
    /// Inactive rules are skipped by the resolver.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Match condition.
    pub condition: ConditionNode,
    /// Decision applied on match.
    pub decision: Decision,
}

impl PolicyRule {
    /// Build an active rule.
    pub fn new(id: RuleId, priority: i64, condition: ConditionNode, decision: Decision) -> Self {
        Self {
            id,
            priority,
            active: true,
            condition,
            decision,
        }
    }
}

/// The resolver's answer for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Decision outcome.
    pub status: DecisionStatus,
    /// Reason from the matching rule, or the fixed no-match reason.
    pub reason: String,
    /// The matching rule, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
    /// Policy snapshot the verdict is bound to.
    pub policy_snapshot_id: PolicySnapshotId,
}
