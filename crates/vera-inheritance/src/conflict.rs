//! # Policy Conflicts
//!
//! A conflict is recorded whenever a descendant policy's value for a field
//! differs from what it inherited.
//!
//! | Classification | Severity | Effect |
//! |---|---|---|
//! | stricter | info | recorded only |
//! | looser | warning or error ([`ConflictPolicy`]) | surfaces in the audit trail |
//! | incompatible | error | computation fails, nothing is activated |
//!
//! ## Resolution lifecycle
//!
//! ```text
//! unresolved ──► acknowledged ──► resolved
//!      └─────────────────────────────▲
//! ```
//!
//! Any other transition is a [`StateTransitionError`]. Timestamps are
//! supplied by the caller; nothing here reads a clock.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vera_core::{FieldDirective, FieldPath, PolicyId, ScopeId, StateTransitionError, Strictness};

/// Direction of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictClassification {
    /// The child tightens the inherited value.
    Stricter,
    /// The child relaxes the inherited value.
    Looser,
    /// The values cannot be compared (kind or structure mismatch).
    Incompatible,
}

impl std::fmt::Display for ConflictClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Stricter => "stricter",
            Self::Looser => "looser",
            Self::Incompatible => "incompatible",
        })
    }
}

/// How serious a conflict is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Blocks activation.
    Error,
}

impl std::fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Severity assigned to looser conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LooserSeverity {
    /// Looser conflicts warn.
    #[default]
    Warning,
    /// Looser conflicts block activation.
    Error,
}

impl From<LooserSeverity> for ConflictSeverity {
    fn from(s: LooserSeverity) -> Self {
        match s {
            LooserSeverity::Warning => Self::Warning,
            LooserSeverity::Error => Self::Error,
        }
    }
}

impl std::str::FromStr for LooserSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!("looser severity must be warning or error, got {other:?}")),
        }
    }
}

/// Conflict classification configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConflictPolicy {
    /// Severity of looser conflicts.
    #[serde(default)]
    pub looser_severity: LooserSeverity,
}

impl ConflictPolicy {
    /// Severity for a classification under this configuration.
    pub fn severity(&self, classification: ConflictClassification) -> ConflictSeverity {
        match classification {
            ConflictClassification::Stricter => ConflictSeverity::Info,
            ConflictClassification::Looser => self.looser_severity.into(),
            ConflictClassification::Incompatible => ConflictSeverity::Error,
        }
    }
}

/// Resolution state of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Nobody has looked at it.
    #[default]
    Unresolved,
    /// Seen, not yet settled.
    Acknowledged,
    /// Settled. Terminal.
    Resolved,
}

impl ResolutionStatus {
    /// Whether this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unresolved => "unresolved",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        })
    }
}

/// Who moved a conflict to its current status, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// Status reached.
    pub status: ResolutionStatus,
    /// Acting administrator.
    pub actor: String,
    /// Free-form note.
    #[serde(default)]
    pub note: String,
    /// Caller-supplied time of the transition.
    pub at: DateTime<Utc>,
}

/// A structured field-level conflict between a policy and its ancestors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConflict {
    /// Conflicting field.
    pub field: FieldPath,
    /// Direction.
    pub classification: ConflictClassification,
    /// Severity under the active [`ConflictPolicy`].
    pub severity: ConflictSeverity,
    /// Inherited value.
    pub parent_value: Value,
    /// The child's value used for comparison.
    pub child_value: Value,
    /// Scope that contributed the inherited value.
    pub parent_scope_id: ScopeId,
    /// Policy that contributed the inherited value.
    pub parent_policy_id: PolicyId,
    /// Scope of the conflicting policy.
    pub child_scope_id: ScopeId,
    /// The conflicting policy.
    pub child_policy_id: PolicyId,
    /// One-line summary for reports.
    pub description: String,
    /// Resolution state.
    #[serde(default)]
    pub status: ResolutionStatus,
    /// Transition history, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolution: Vec<ResolutionRecord>,
}

impl PolicyConflict {
    /// True if this conflict prevents the effective policy from activating.
    pub fn is_blocking(&self) -> bool {
        self.severity == ConflictSeverity::Error && self.status != ResolutionStatus::Resolved
    }

    /// `unresolved → acknowledged`.
    ///
    /// # Errors
    ///
    /// Returns [`StateTransitionError::InvalidTransition`] from any other
    /// status.
    pub fn acknowledge(
        &mut self,
        actor: impl Into<String>,
        note: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StateTransitionError> {
        self.transition(ResolutionStatus::Acknowledged, actor.into(), note.into(), at)
    }

    /// `unresolved | acknowledged → resolved`.
    ///
    /// # Errors
    ///
    /// Returns [`StateTransitionError::InvalidTransition`] if already
    /// resolved.
    pub fn resolve(
        &mut self,
        actor: impl Into<String>,
        note: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StateTransitionError> {
        self.transition(ResolutionStatus::Resolved, actor.into(), note.into(), at)
    }

    fn transition(
        &mut self,
        to: ResolutionStatus,
        actor: String,
        note: String,
        at: DateTime<Utc>,
    ) -> Result<(), StateTransitionError> {
        use ResolutionStatus::*;
        let allowed = matches!(
            (self.status, to),
            (Unresolved, Acknowledged) | (Unresolved, Resolved) | (Acknowledged, Resolved)
        );
        if !allowed {
            let reason = if self.status.is_terminal() {
                "conflict is already resolved".to_string()
            } else {
                format!("{to} is not reachable from {}", self.status)
            };
            return Err(StateTransitionError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
                reason,
            });
        }
        tracing::info!(field = %self.field, from = %self.status, to = %to, actor = %actor, "conflict transition");
        self.status = to;
        self.resolution.push(ResolutionRecord {
            status: to,
            actor,
            note,
            at,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a difference between an inherited value and a child value.
///
/// Returns `None` when the two are semantically equal under the field's
/// directive (e.g. `1` and `1.0`).
pub fn classify(
    directive: Option<&FieldDirective>,
    parent: &Value,
    child: &Value,
) -> Option<ConflictClassification> {
    use ConflictClassification::*;

    let Some(directive) = directive else {
        if std::mem::discriminant(parent) != std::mem::discriminant(child) {
            return Some(Incompatible);
        }
        return (parent != child).then_some(Looser);
    };
    if !directive.kind.matches(parent) || !directive.kind.matches(child) {
        return Some(Incompatible);
    }

    match directive.strictness {
        Strictness::TrueIsStricter => match (parent.as_bool(), child.as_bool()) {
            (Some(false), Some(true)) => Some(Stricter),
            (Some(true), Some(false)) => Some(Looser),
            _ => None,
        },
        Strictness::LowerIsStricter => match compare_numbers(child, parent)? {
            Ordering::Less => Some(Stricter),
            Ordering::Greater => Some(Looser),
            Ordering::Equal => None,
        },
        Strictness::HigherIsStricter => match compare_numbers(child, parent)? {
            Ordering::Greater => Some(Stricter),
            Ordering::Less => Some(Looser),
            Ordering::Equal => None,
        },
        Strictness::MoreIsStricter | Strictness::FewerIsStricter => {
            let p = parent.as_array()?;
            let c = child.as_array()?;
            if directive.is_orderless() {
                let p_in_c = p.iter().all(|v| c.contains(v));
                let c_in_p = c.iter().all(|v| p.contains(v));
                if p_in_c && c_in_p {
                    return None;
                }
                let more_is_stricter = directive.strictness == Strictness::MoreIsStricter;
                // Adding to a block list tightens; any removal loosens.
                match (p_in_c, more_is_stricter) {
                    (true, true) => Some(Stricter),
                    (false, true) => Some(Looser),
                    (_, false) if c_in_p => Some(Stricter),
                    (_, false) => Some(Looser),
                }
            } else {
                if p == c {
                    return None;
                }
                // An ordered sequence is only tightened by extending it.
                if c.len() > p.len() && c.starts_with(p) {
                    Some(Stricter)
                } else {
                    Some(Looser)
                }
            }
        }
        Strictness::AnyChangeIsLooser => {
            let p = parent.as_array()?;
            let c = child.as_array()?;
            let same = if directive.is_orderless() {
                p.iter().all(|v| c.contains(v)) && c.iter().all(|v| p.contains(v))
            } else {
                p == c
            };
            (!same).then_some(Looser)
        }
    }
}

/// Compare two JSON numbers; integers exactly, otherwise as `f64`.
pub(crate) fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    fn as_int(v: &Value) -> Option<i128> {
        v.as_i64()
            .map(i128::from)
            .or_else(|| v.as_u64().map(i128::from))
    }
    match (as_int(a), as_int(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}
