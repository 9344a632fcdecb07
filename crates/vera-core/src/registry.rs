//! # Field Semantics Registry
//!
//! The single table that declares, per logical policy field, what kind of
//! value it holds, whether its arrays are semantic sets or meaningful
//! sequences, how contributions from several scopes merge, and which
//! direction counts as "stricter".
//!
//! ## Security Invariant
//!
//! The canonicalizer and the effective-policy computer both consult
//! [`FieldRegistry::standard()`]. There is no second table. If the two
//! consumers disagreed on which arrays are orderless, the same logical
//! policy could hash differently depending on which component computed it.
//!
//! Lookups always strip array indices: see [`FieldPath::registry_key`].

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::FieldPath;

/// The JSON shape a registered field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `true` / `false`.
    Boolean,
    /// An integer threshold or count.
    Number,
    /// An array of strings.
    StringArray,
    /// An array of objects.
    ObjectArray,
}

impl ValueKind {
    /// Return the string value for serialization and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::StringArray => "string_array",
            Self::ObjectArray => "object_array",
        }
    }

    /// True if `value` has this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::StringArray, Value::Array(items)) => items.iter().all(Value::is_string),
            (Self::ObjectArray, Value::Array(items)) => items.iter().all(Value::is_object),
            _ => false,
        }
    }

    /// True for the two array kinds.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::StringArray | Self::ObjectArray)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describe the JSON shape of an arbitrary value, for error messages.
pub fn describe_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(items) if items.iter().all(Value::is_string) => "string_array",
        Value::Array(items) if items.iter().all(Value::is_object) => "object_array",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether an array field may be reordered for canonical comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayOrder {
    /// A semantic set: element order carries no meaning.
    Orderless,
    /// A meaningful sequence: element order must never change.
    Ordered,
}

/// How values from successive scopes combine in merge mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRule {
    /// Logical OR: once any ancestor requires a control, it stays required.
    LogicalOr,
    /// Keep the smaller threshold (an upper bound tightens downward).
    Minimum,
    /// Keep the larger threshold (a lower bound tightens upward).
    Maximum,
    /// Set union with duplicate removal.
    Union,
    /// Concatenate, preserving each contributor's internal order.
    Append,
}

/// Which direction of change counts as more restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// `true` is stricter than `false`.
    TrueIsStricter,
    /// A lower number is stricter.
    LowerIsStricter,
    /// A higher number is stricter.
    HigherIsStricter,
    /// More elements are stricter (block lists, reviewer sets).
    MoreIsStricter,
    /// Fewer elements are stricter (allow lists).
    FewerIsStricter,
    /// Any change loosens. Used for rule sets, where an added rule can
    /// override the ones above it.
    AnyChangeIsLooser,
}

/// The registered semantics of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDirective {
    /// Required value shape.
    pub kind: ValueKind,
    /// Ordering for array kinds; `Ordered` for scalars.
    pub ordering: ArrayOrder,
    /// Merge rule applied in merge mode.
    pub merge: MergeRule,
    /// Direction used by conflict classification.
    pub strictness: Strictness,
}

impl FieldDirective {
    /// A boolean control merged with logical OR.
    pub const fn required_flag() -> Self {
        Self {
            kind: ValueKind::Boolean,
            ordering: ArrayOrder::Ordered,
            merge: MergeRule::LogicalOr,
            strictness: Strictness::TrueIsStricter,
        }
    }

    /// A numeric upper bound: the minimum wins.
    pub const fn upper_bound() -> Self {
        Self {
            kind: ValueKind::Number,
            ordering: ArrayOrder::Ordered,
            merge: MergeRule::Minimum,
            strictness: Strictness::LowerIsStricter,
        }
    }

    /// A numeric lower bound: the maximum wins.
    pub const fn lower_bound() -> Self {
        Self {
            kind: ValueKind::Number,
            ordering: ArrayOrder::Ordered,
            merge: MergeRule::Maximum,
            strictness: Strictness::HigherIsStricter,
        }
    }

    /// An orderless array merged by union.
    pub const fn set(kind: ValueKind, strictness: Strictness) -> Self {
        Self {
            kind,
            ordering: ArrayOrder::Orderless,
            merge: MergeRule::Union,
            strictness,
        }
    }

    /// An ordered array merged by append.
    pub const fn sequence(kind: ValueKind) -> Self {
        Self {
            kind,
            ordering: ArrayOrder::Ordered,
            merge: MergeRule::Append,
            strictness: Strictness::MoreIsStricter,
        }
    }

    /// True if arrays at this path are semantic sets.
    pub fn is_orderless(&self) -> bool {
        self.ordering == ArrayOrder::Orderless
    }
}

/// A path-keyed table of [`FieldDirective`]s.
///
/// Keys are index-free key-segment sequences. Use
/// [`FieldRegistry::standard()`] for the shared production table; build
/// custom registries only in tests or for the empty, registry-free
/// canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    directives: BTreeMap<Vec<String>, FieldDirective>,
}

impl FieldRegistry {
    /// A registry with no entries: nothing is orderless, nothing merges.
    pub const fn empty() -> Self {
        Self {
            directives: BTreeMap::new(),
        }
    }

    /// The shared standard registry.
    pub fn standard() -> &'static FieldRegistry {
        static STANDARD: OnceLock<FieldRegistry> = OnceLock::new();
        STANDARD.get_or_init(build_standard)
    }

    /// Add or replace a directive. Any indices in `path` are stripped.
    pub fn register(&mut self, path: &FieldPath, directive: FieldDirective) {
        self.directives.insert(path.registry_key(), directive);
    }

    /// Directive for `path`, ignoring array indices.
    pub fn directive(&self, path: &FieldPath) -> Option<&FieldDirective> {
        self.directives.get(&path.registry_key())
    }

    /// Directive for an already index-free key sequence.
    pub fn directive_for_keys(&self, keys: &[String]) -> Option<&FieldDirective> {
        self.directives.get(keys)
    }

    /// True if `keys` is a proper prefix of some registered path, meaning
    /// the object at `keys` contains registered fields further down.
    pub fn has_descendants(&self, keys: &[String]) -> bool {
        self.directives
            .range(keys.to_vec()..)
            .take_while(|(k, _)| k.starts_with(keys))
            .any(|(k, _)| k.len() > keys.len())
    }

    /// Iterate over registered paths and directives in key order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldPath, &FieldDirective)> {
        self.directives
            .iter()
            .map(|(k, d)| (FieldPath::from_keys(k.iter().cloned()), d))
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// True if no path is registered.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

fn build_standard() -> FieldRegistry {
    use Strictness::{AnyChangeIsLooser, FewerIsStricter, MoreIsStricter};
    use ValueKind::{ObjectArray, StringArray};

    let entries: [(&[&str], FieldDirective); 16] = [
        (&["controls", "hitl", "required"], FieldDirective::required_flag()),
        (&["controls", "audit_trail_required"], FieldDirective::required_flag()),
        (&["require_impact_assessment"], FieldDirective::required_flag()),
        (&["data_residency_required"], FieldDirective::required_flag()),
        (&["usage_restrictions", "max_daily_requests"], FieldDirective::upper_bound()),
        (&["risk", "max_risk_score"], FieldDirective::upper_bound()),
        (&["min_approvals"], FieldDirective::lower_bound()),
        (&["data_handling", "retention_days"], FieldDirective::lower_bound()),
        (&["blocked_actions"], FieldDirective::set(StringArray, MoreIsStricter)),
        (&["controls", "hitl", "reviewers"], FieldDirective::set(StringArray, MoreIsStricter)),
        (
            &["data_handling", "prohibited_data_types"],
            FieldDirective::set(StringArray, MoreIsStricter),
        ),
        (&["allowed_tools"], FieldDirective::set(StringArray, FewerIsStricter)),
        (&["allowed_channels"], FieldDirective::set(StringArray, FewerIsStricter)),
        (&["approval_chain"], FieldDirective::sequence(StringArray)),
        (&["controls", "hitl", "review_stages"], FieldDirective::sequence(ObjectArray)),
        (&["decision_rules"], FieldDirective::set(ObjectArray, AnyChangeIsLooser)),
    ];

    let mut registry = FieldRegistry::empty();
    for (keys, directive) in entries {
        registry.register(&FieldPath::from_keys(keys.iter().copied()), directive);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn standard_registry_has_all_entries() {
        assert_eq!(FieldRegistry::standard().len(), 16);
    }

    #[test]
    fn standard_registry_is_shared() {
        let a = FieldRegistry::standard() as *const FieldRegistry;
        let b = FieldRegistry::standard() as *const FieldRegistry;
        assert_eq!(a, b);
    }

    #[test]
    fn blocked_actions_is_orderless_union() {
        let d = FieldRegistry::standard().directive(&path("blocked_actions")).unwrap();
        assert!(d.is_orderless());
        assert_eq!(d.merge, MergeRule::Union);
        assert_eq!(d.kind, ValueKind::StringArray);
    }

    #[test]
    fn approval_chain_is_ordered_append() {
        let d = FieldRegistry::standard().directive(&path("approval_chain")).unwrap();
        assert!(!d.is_orderless());
        assert_eq!(d.merge, MergeRule::Append);
    }

    #[test]
    fn decision_rules_loosen_on_any_change() {
        let d = FieldRegistry::standard().directive(&path("decision_rules")).unwrap();
        assert!(d.is_orderless());
        assert_eq!(d.kind, ValueKind::ObjectArray);
        assert_eq!(d.strictness, Strictness::AnyChangeIsLooser);
    }

    #[test]
    fn lookup_strips_indices() {
        let reg = FieldRegistry::standard();
        let with_index = reg.directive(&path("controls.hitl.review_stages[2]"));
        let without = reg.directive(&path("controls.hitl.review_stages"));
        assert!(with_index.is_some());
        assert_eq!(with_index, without);
    }

    #[test]
    fn unregistered_path_has_no_directive() {
        assert!(FieldRegistry::standard()
            .directive(&path("pii_handling"))
            .is_none());
    }

    #[test]
    fn has_descendants_detects_registered_subtrees() {
        let reg = FieldRegistry::standard();
        assert!(reg.has_descendants(&["controls".to_string()]));
        assert!(reg.has_descendants(&["controls".to_string(), "hitl".to_string()]));
        assert!(!reg.has_descendants(&["blocked_actions".to_string()]));
        assert!(!reg.has_descendants(&["pii_handling".to_string()]));
    }

    #[test]
    fn value_kind_matches() {
        assert!(ValueKind::Boolean.matches(&json!(true)));
        assert!(ValueKind::Number.matches(&json!(3)));
        assert!(ValueKind::StringArray.matches(&json!(["a", "b"])));
        assert!(ValueKind::StringArray.matches(&json!([])));
        assert!(!ValueKind::StringArray.matches(&json!(["a", 1])));
        assert!(ValueKind::ObjectArray.matches(&json!([{"a": 1}])));
        assert!(!ValueKind::Boolean.matches(&json!("true")));
    }

    #[test]
    fn describe_kind_names_shapes() {
        assert_eq!(describe_kind(&json!("x")), "string");
        assert_eq!(describe_kind(&json!(["x"])), "string_array");
        assert_eq!(describe_kind(&json!({"a": 1})), "object");
        assert_eq!(describe_kind(&json!(["x", 1])), "array");
    }
}
