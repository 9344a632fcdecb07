//! # Rule Authoring Validation
//!
//! Checks run on the policy-administration write path. Evaluation never
//! calls into this module: a rule that slipped past validation still
//! evaluates fail-closed.

use std::collections::BTreeSet;

use serde_json::Value;

use vera_core::ValidationError;

use crate::condition::{ConditionNode, Operator};
use crate::rule::PolicyRule;
use crate::version::{parse_requirement, parse_version};

/// Maximum nesting depth of a condition tree.
pub const MAX_CONDITION_DEPTH: usize = 32;

/// Validate a single rule.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, in tree order.
pub fn validate_rule(rule: &PolicyRule) -> Result<(), ValidationError> {
    validate_node(rule.id.as_str(), &rule.condition, 1)
}

/// Validate a rule set: every rule, plus rule-id uniqueness.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, in input order.
pub fn validate_rule_set(rules: &[PolicyRule]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for rule in rules {
        if !seen.insert(rule.id.as_str()) {
            return Err(ValidationError::DuplicateRuleId(rule.id.to_string()));
        }
        validate_rule(rule)?;
    }
    Ok(())
}

/// Validate a rule set and collect every problem instead of stopping at
/// the first. Used for authoring reports.
pub fn collect_violations(rules: &[PolicyRule]) -> Vec<ValidationError> {
    let mut seen = BTreeSet::new();
    let mut errors = Vec::new();
    for rule in rules {
        if !seen.insert(rule.id.as_str()) {
            errors.push(ValidationError::DuplicateRuleId(rule.id.to_string()));
        }
        if let Err(e) = validate_rule(rule) {
            errors.push(e);
        }
    }
    errors
}

fn validate_node(rule_id: &str, node: &ConditionNode, depth: usize) -> Result<(), ValidationError> {
    if depth > MAX_CONDITION_DEPTH {
        return Err(ValidationError::ConditionTooDeep {
            rule_id: rule_id.to_string(),
            max_depth: MAX_CONDITION_DEPTH,
        });
    }
    match node {
        ConditionNode::Leaf {
            field,
            operator,
            value,
        } => validate_clause(rule_id, &field.to_string(), *operator, value),
        ConditionNode::And { children } => children
            .iter()
            .try_for_each(|c| validate_node(rule_id, c, depth + 1)),
        ConditionNode::Or { children } => {
            if children.is_empty() {
                return Err(ValidationError::EmptyDisjunction {
                    rule_id: rule_id.to_string(),
                });
            }
            children
                .iter()
                .try_for_each(|c| validate_node(rule_id, c, depth + 1))
        }
    }
}

fn validate_clause(
    rule_id: &str,
    field: &str,
    operator: Operator,
    value: &Value,
) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidComparisonValue {
        rule_id: rule_id.to_string(),
        field: field.to_string(),
        operator: operator.to_string(),
        reason: reason.to_string(),
    };

    match operator {
        Operator::Unsupported => Err(ValidationError::UnsupportedOperator {
            rule_id: rule_id.to_string(),
            field: field.to_string(),
        }),
        Operator::In | Operator::NotIn => {
            if value.is_array() {
                Ok(())
            } else {
                Err(invalid("expected an array"))
            }
        }
        Operator::VersionLessThan | Operator::VersionGreaterThan => {
            match value.as_str().and_then(parse_version) {
                Some(_) => Ok(()),
                None => Err(invalid("expected a version string")),
            }
        }
        Operator::VersionSatisfiesRange => match value.as_str().and_then(parse_requirement) {
            Some(_) => Ok(()),
            None => Err(invalid("expected a version requirement")),
        },
        Operator::Equals | Operator::NotEquals => Ok(()),
    }
}
