//! # vera-decision: Usage Decision Resolution
//!
//! Decides whether a partner's AI-tool usage is permitted under the
//! enterprise's rules.
//!
//! - [`condition`]: condition trees and the fail-closed evaluator.
//! - [`resolver`]: priority ordering and first-match resolution, with a
//!   `RequiresReview` default when nothing matches.
//! - [`validation`]: authoring-time checks for rule sets.
//!
//! Everything here is a pure function of its inputs. Given the same event
//! and rule set, [`resolve`] returns the same [`Verdict`] on every node.

pub mod condition;
pub mod event;
pub mod resolver;
pub mod rule;
pub mod validation;
mod version;

// Re-export primary types.
pub use condition::{evaluate, evaluate_document, ConditionNode, Operator, Resolved};
pub use event::{Action, ActionKind, Actor, Tool, UsageContent, UsageContext, UsageEvent};
pub use resolver::{
    decision_rules, explain, resolve, resolve_effective, RuleBook, RuleEvaluation,
    DECISION_RULES_FIELD, NO_MATCH_REASON,
};
pub use rule::{Decision, DecisionStatus, PolicyRule, Verdict};
pub use validation::{collect_violations, validate_rule, validate_rule_set, MAX_CONDITION_DEPTH};
pub use version::{parse_requirement, parse_version};
