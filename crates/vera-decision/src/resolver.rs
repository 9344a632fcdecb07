//! # Policy Decision Resolver
//!
//! Turns a usage event plus a rule set into a [`Verdict`].
//!
//! 1. Drop inactive rules.
//! 2. Order by ascending priority (lower value wins), ties broken by
//!    ascending rule id in lexical byte order.
//! 3. Evaluate in that order; the first matching rule decides.
//! 4. No match, including an empty rule set, yields `RequiresReview` with
//!    the reason [`NO_MATCH_REASON`].
//!
//! ## Determinism
//!
//! Resolution is referentially transparent: no clock, randomness, or
//! external state. The total order in step 2 makes the result independent
//! of the order rules were supplied in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vera_core::{RuleId, ValidationError};
use vera_inheritance::EffectivePolicy;

use crate::condition::evaluate_document;
use crate::event::UsageEvent;
use crate::rule::{DecisionStatus, PolicyRule, Verdict};

/// Reason attached to the fail-safe verdict.
pub const NO_MATCH_REASON: &str = "no matching rule";

/// Field of an effective policy that carries decision rules.
pub const DECISION_RULES_FIELD: &str = "decision_rules";

/// One line of a resolution trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// The evaluated rule.
    pub rule_id: RuleId,
    /// Its priority.
    pub priority: i64,
    /// Whether its condition matched.
    pub matched: bool,
}

/// Active rules in evaluation order.
fn ordered<'a, I>(rules: I) -> Vec<&'a PolicyRule>
where
    I: IntoIterator<Item = &'a PolicyRule>,
{
    let mut active: Vec<&PolicyRule> = rules.into_iter().filter(|r| r.active).collect();
    active.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.id.as_str().as_bytes().cmp(b.id.as_str().as_bytes()))
    });
    active
}

/// `resolve(event, rules)`: first match in priority order, or review.
pub fn resolve(event: &UsageEvent, rules: &[PolicyRule]) -> Verdict {
    resolve_ordered(event, ordered(rules))
}

fn resolve_ordered(event: &UsageEvent, rules: Vec<&PolicyRule>) -> Verdict {
    let doc = event.to_document();
    let snapshot = event.policy_snapshot_id().clone();

    for rule in rules {
        let matched = evaluate_document(&doc, &rule.condition);
        tracing::debug!(rule_id = %rule.id, priority = rule.priority, matched, "rule evaluated");
        if matched {
            tracing::info!(
                rule_id = %rule.id,
                status = %rule.decision.status,
                snapshot = %snapshot,
                "verdict resolved"
            );
            return Verdict {
                status: rule.decision.status,
                reason: rule.decision.reason.clone(),
                rule_id: Some(rule.id.clone()),
                policy_snapshot_id: snapshot,
            };
        }
    }

    tracing::info!(snapshot = %snapshot, "no rule matched; requiring review");
    Verdict {
        status: DecisionStatus::RequiresReview,
        reason: NO_MATCH_REASON.to_string(),
        rule_id: None,
        policy_snapshot_id: snapshot,
    }
}

/// Evaluate every active rule in resolution order and report each outcome.
///
/// The first entry with `matched == true` is the rule [`resolve`] picks.
pub fn explain(event: &UsageEvent, rules: &[PolicyRule]) -> Vec<RuleEvaluation> {
    let doc = event.to_document();
    ordered(rules)
        .into_iter()
        .map(|rule| RuleEvaluation {
            rule_id: rule.id.clone(),
            priority: rule.priority,
            matched: evaluate_document(&doc, &rule.condition),
        })
        .collect()
}

/// Parse the decision rules carried by an effective policy.
///
/// A policy without a `decision_rules` field has no rules.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedDecisionRule`] if the field is not
/// an array or any element is not a valid [`PolicyRule`], and
/// [`ValidationError::DuplicateRuleId`] if two rules share an id. The
/// stored array is a set whose order never reaches the content hash, so
/// same-id rules would otherwise be ordered by accident.
pub fn decision_rules(policy: &EffectivePolicy) -> Result<Vec<PolicyRule>, ValidationError> {
    let items = match policy.values.get(DECISION_RULES_FIELD) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ValidationError::MalformedDecisionRule {
                index: 0,
                reason: format!(
                    "{DECISION_RULES_FIELD} must be an array, found {}",
                    vera_core::describe_kind(other)
                ),
            })
        }
    };
    let rules: Vec<PolicyRule> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone()).map_err(|e| {
                ValidationError::MalformedDecisionRule {
                    index,
                    reason: e.to_string(),
                }
            })
        })
        .collect::<Result<_, _>>()?;

    let mut seen = BTreeSet::new();
    for rule in &rules {
        if !seen.insert(&rule.id) {
            tracing::warn!(scope = %policy.scope_id, rule_id = %rule.id, "effective policy carries two rules with one id");
            return Err(ValidationError::DuplicateRuleId(rule.id.to_string()));
        }
    }
    Ok(rules)
}

/// Resolve an event against the decision rules of its effective policy.
///
/// # Errors
///
/// See [`decision_rules`].
pub fn resolve_effective(
    event: &UsageEvent,
    policy: &EffectivePolicy,
) -> Result<Verdict, ValidationError> {
    let rules = decision_rules(policy)?;
    tracing::debug!(scope = %policy.scope_id, rules = rules.len(), "resolving against effective policy");
    Ok(resolve(event, &rules))
}

// ---------------------------------------------------------------------------
// RuleBook
// ---------------------------------------------------------------------------

/// A registry of rules keyed by id.
///
/// `BTreeMap` storage keeps listing deterministic; resolution order is
/// still priority-first, independent of storage order.
#[derive(Clone, Default)]
pub struct RuleBook {
    rules: std::collections::BTreeMap<RuleId, PolicyRule>,
}

impl RuleBook {
    /// Create an empty rule book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, replacing and returning any rule with the same id.
    pub fn register(&mut self, rule: PolicyRule) -> Option<PolicyRule> {
        self.rules.insert(rule.id.clone(), rule)
    }

    /// Remove a rule by id.
    pub fn unregister(&mut self, id: &RuleId) -> Option<PolicyRule> {
        self.rules.remove(id)
    }

    /// Look up a rule by id.
    pub fn get(&self, id: &RuleId) -> Option<&PolicyRule> {
        self.rules.get(id)
    }

    /// All rules sorted by id.
    pub fn list(&self) -> Vec<&PolicyRule> {
        self.rules.values().collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if no rule is registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve an event against the registered rules.
    pub fn resolve(&self, event: &UsageEvent) -> Verdict {
        resolve_ordered(event, ordered(self.rules.values()))
    }
}

impl FromIterator<PolicyRule> for RuleBook {
    fn from_iter<T: IntoIterator<Item = PolicyRule>>(iter: T) -> Self {
        let mut book = Self::new();
        for rule in iter {
            book.register(rule);
        }
        book
    }
}

impl std::fmt::Debug for RuleBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleBook")
            .field("rule_count", &self.rules.len())
            .finish()
    }
}
