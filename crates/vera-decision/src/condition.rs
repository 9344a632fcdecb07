//! # Rule Condition Evaluator
//!
//! Condition trees are an explicit tagged variant: a [`ConditionNode`] is a
//! `Leaf` clause, an `And` over children, or an `Or` over children. Trees
//! are plain owned data, so they cannot be cyclic.
//!
//! ## Fail-closed semantics
//!
//! Every operator evaluated against an absent field (missing path or JSON
//! `null`) is false, including `not_equals` and `not_in`. Malformed version
//! strings and unsupported operators are false as well. Evaluation never
//! returns an error: an ill-formed rule can only fail to match.
//!
//! ## Wire form
//!
//! ```json
//! {"type": "and", "children": [
//!   {"type": "leaf", "field": "tool.version", "operator": "version_less_than", "value": "6.0.0"},
//!   {"type": "leaf", "field": "action.kind", "operator": "in", "value": ["generate", "edit"]}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vera_core::FieldPath;

use crate::event::UsageEvent;
use crate::version::{parse_requirement, parse_version};

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Comparison operator of a leaf clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Field equals the comparison value.
    Equals,
    /// Field differs from the comparison value.
    NotEquals,
    /// Field is a member of the comparison array.
    In,
    /// Field is not a member of the comparison array.
    NotIn,
    /// Field version is strictly lower than the comparison version.
    VersionLessThan,
    /// Field version is strictly higher than the comparison version.
    VersionGreaterThan,
    /// Field version satisfies the comparison requirement.
    VersionSatisfiesRange,
    /// Any operator name outside the supported set.
    #[serde(other)]
    Unsupported,
}

impl Operator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::VersionLessThan => "version_less_than",
            Self::VersionGreaterThan => "version_greater_than",
            Self::VersionSatisfiesRange => "version_satisfies_range",
            Self::Unsupported => "unsupported",
        }
    }

    /// True for the three version operators.
    pub fn is_version(&self) -> bool {
        matches!(
            self,
            Self::VersionLessThan | Self::VersionGreaterThan | Self::VersionSatisfiesRange
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConditionNode
// ---------------------------------------------------------------------------

/// A node of a rule's condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
    /// A single comparison.
    Leaf {
        /// Event field to resolve.
        field: FieldPath,
        /// Comparison operator.
        operator: Operator,
        /// Comparison value.
        #[serde(default)]
        value: Value,
    },
    /// True iff every child is true. An empty `And` is always true.
    And {
        /// Conjuncts.
        #[serde(default)]
        children: Vec<ConditionNode>,
    },
    /// True iff any child is true. An empty `Or` is never true.
    Or {
        /// Disjuncts.
        #[serde(default)]
        children: Vec<ConditionNode>,
    },
}

impl ConditionNode {
    /// The catch-all condition: an empty conjunction.
    pub fn always() -> Self {
        Self::And {
            children: Vec::new(),
        }
    }

    /// Shorthand for a leaf clause.
    pub fn leaf(field: FieldPath, operator: Operator, value: Value) -> Self {
        Self::Leaf {
            field,
            operator,
            value,
        }
    }

    /// Nesting depth; a leaf or an empty combinator has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::And { children } | Self::Or { children } => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Result of resolving a field path inside an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    /// The path exists and is not `null`.
    Present(&'a Value),
    /// The path is missing or `null`.
    Absent,
}

impl<'a> Resolved<'a> {
    /// Resolve `path` inside a JSON document.
    pub fn lookup(doc: &'a Value, path: &FieldPath) -> Self {
        match path.lookup(doc) {
            None | Some(Value::Null) => Self::Absent,
            Some(v) => Self::Present(v),
        }
    }
}

/// `evaluate(event, node)`: pure, total, never errors.
pub fn evaluate(event: &UsageEvent, node: &ConditionNode) -> bool {
    evaluate_document(&event.to_document(), node)
}

/// Evaluate a condition against an event already rendered as JSON.
///
/// The resolver renders the event once and evaluates every rule against
/// the same document.
pub fn evaluate_document(doc: &Value, node: &ConditionNode) -> bool {
    match node {
        ConditionNode::Leaf {
            field,
            operator,
            value,
        } => evaluate_clause(Resolved::lookup(doc, field), *operator, value, field),
        ConditionNode::And { children } => children.iter().all(|c| evaluate_document(doc, c)),
        ConditionNode::Or { children } => children.iter().any(|c| evaluate_document(doc, c)),
    }
}

fn evaluate_clause(
    resolved: Resolved<'_>,
    operator: Operator,
    expected: &Value,
    field: &FieldPath,
) -> bool {
    let actual = match resolved {
        Resolved::Present(v) => v,
        Resolved::Absent => {
            tracing::debug!(field = %field, operator = %operator, "field absent; clause is false");
            return false;
        }
    };

    match operator {
        Operator::Equals => actual == expected,
        Operator::NotEquals => actual != expected,
        Operator::In => match expected {
            Value::Array(items) => items.contains(actual),
            _ => false,
        },
        Operator::NotIn => match expected {
            Value::Array(items) => !items.contains(actual),
            _ => false,
        },
        Operator::VersionLessThan => {
            compare_versions(actual, expected, field).is_some_and(|o| o.is_lt())
        }
        Operator::VersionGreaterThan => {
            compare_versions(actual, expected, field).is_some_and(|o| o.is_gt())
        }
        Operator::VersionSatisfiesRange => {
            let version = actual.as_str().and_then(parse_version);
            let requirement = expected.as_str().and_then(parse_requirement);
            match (version, requirement) {
                (Some(v), Some(req)) => req.matches(&v),
                _ => {
                    tracing::warn!(field = %field, "malformed version or range; clause is false");
                    false
                }
            }
        }
        Operator::Unsupported => {
            tracing::warn!(field = %field, "unsupported operator; clause is false");
            false
        }
    }
}

fn compare_versions(
    actual: &Value,
    expected: &Value,
    field: &FieldPath,
) -> Option<std::cmp::Ordering> {
    let lhs = actual.as_str().and_then(parse_version);
    let rhs = expected.as_str().and_then(parse_version);
    match (lhs, rhs) {
        // Build metadata carries no precedence.
        (Some(a), Some(b)) => Some(a.cmp_precedence(&b)),
        _ => {
            tracing::warn!(field = %field, "malformed version string; clause is false");
            None
        }
    }
}
