//! # Effective-Policy Computer
//!
//! Merges the policies attached along a scope's ancestor chain, strictly
//! root-to-leaf, into one [`EffectivePolicy`] with per-field provenance.
//!
//! ## Algorithm
//!
//! Each policy's rule set is flattened into leaf fields (registered paths
//! are leaves; other objects are descended; empty objects declare nothing
//! except under `replace`). Keys must be plain field names so that every
//! leaf path prints and parses back unchanged. Policies are applied in chain
//! order, ties within one scope broken by policy id. Per leaf, the policy's
//! [`InheritanceMode`] decides the new value:
//!
//! - `replace`: inherited fields under every top-level key the policy sets
//!   are dropped first, then the declared value is written. Dropped fields
//!   that are not redeclared are reported as looser conflicts.
//! - `merge`: the registry merge rule combines inherited and declared
//!   values; unregistered fields are superseded.
//! - `append`: arrays are concatenated onto the inherited sequence; other
//!   values fall back to `merge`.
//!
//! Override rules are applied last, leaf by leaf, as point replacements.
//!
//! Whenever a leaf already had a value, the difference is classified (see
//! [`crate::conflict::classify`]). Any incompatible conflict fails the
//! whole computation.
//!
//! The computer is stateless: the same chain and policies always yield the
//! same values, provenance, and content hash.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use vera_core::{
    describe_kind, sha256_digest, CanonicalizationError, Canonicalizer, ContentDigest,
    FieldDirective, FieldPath, FieldRegistry, MergeRule, PathSegment, PolicyId, ScopeId,
    Strictness, ValidationError,
};

use crate::conflict::{
    classify, compare_numbers, ConflictClassification, ConflictPolicy, PolicyConflict,
    ResolutionStatus,
};
use crate::error::InheritanceError;
use crate::policy::{InheritanceMode, ScopedPolicy};
use crate::scope::{check_depth, Scope, ScopeTree};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Where a field's final value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProvenance {
    /// Scope of the contributing policy.
    pub scope_id: ScopeId,
    /// The contributing policy.
    pub policy_id: PolicyId,
    /// Mode the policy applied.
    pub mode: InheritanceMode,
    /// True if the value came from the policy's override rules.
    #[serde(rename = "override", default)]
    pub is_override: bool,
}

/// The merged policy in force at one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivePolicy {
    /// Scope this policy is effective at.
    pub scope_id: ScopeId,
    /// Merged field values.
    pub values: Value,
    /// Provenance per leaf field.
    pub provenance: BTreeMap<FieldPath, FieldProvenance>,
    /// Digest of the canonicalized `values`.
    pub content_hash: ContentDigest,
    /// Bumped each time a recomputation changes the content hash.
    pub version: u64,
}

impl EffectivePolicy {
    /// The merged value at `path`.
    pub fn value(&self, path: &FieldPath) -> Option<&Value> {
        path.lookup(&self.values)
    }

    /// Provenance for `path`, or for the nearest enclosing leaf when `path`
    /// points inside one (e.g. `approval_chain[1]`).
    pub fn explain(&self, path: &FieldPath) -> Option<&FieldProvenance> {
        let mut prefixes = Vec::with_capacity(path.segments().len());
        let mut current = FieldPath::root();
        for segment in path.segments() {
            current = match segment {
                PathSegment::Key(k) => current.child(k.clone()),
                PathSegment::Index(i) => current.index(*i),
            };
            prefixes.push(current.clone());
        }
        prefixes
            .iter()
            .rev()
            .find_map(|prefix| self.provenance.get(prefix))
    }

    /// Recompute the content hash with the standard registry and compare.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures.
    pub fn verify(&self) -> Result<bool, CanonicalizationError> {
        self.verify_with(FieldRegistry::standard())
    }

    /// Recompute the content hash with a specific registry and compare.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures.
    pub fn verify_with(&self, registry: &FieldRegistry) -> Result<bool, CanonicalizationError> {
        let bytes = Canonicalizer::with_registry(registry).canonical_bytes(&self.values)?;
        Ok(sha256_digest(&bytes) == self.content_hash)
    }
}

/// A computed effective policy plus every conflict found on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveOutcome {
    /// The merged policy.
    pub policy: EffectivePolicy,
    /// Stricter and looser conflicts, in application order.
    pub conflicts: Vec<PolicyConflict>,
}

impl EffectiveOutcome {
    /// True if any conflict blocks activation.
    pub fn blocks_activation(&self) -> bool {
        self.conflicts.iter().any(PolicyConflict::is_blocking)
    }
}

// ---------------------------------------------------------------------------
// Computer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    provenance: FieldProvenance,
}

/// Computes effective policies against a field registry.
#[derive(Debug, Clone, Copy)]
pub struct EffectivePolicyComputer<'r> {
    registry: &'r FieldRegistry,
    conflicts: ConflictPolicy,
}

impl Default for EffectivePolicyComputer<'static> {
    fn default() -> Self {
        Self::new(ConflictPolicy::default())
    }
}

impl EffectivePolicyComputer<'static> {
    /// A computer over the standard registry.
    pub fn new(conflicts: ConflictPolicy) -> Self {
        Self {
            registry: FieldRegistry::standard(),
            conflicts,
        }
    }
}

impl<'r> EffectivePolicyComputer<'r> {
    /// A computer over a custom registry.
    pub fn with_registry(registry: &'r FieldRegistry, conflicts: ConflictPolicy) -> Self {
        Self {
            registry,
            conflicts,
        }
    }

    /// The conflict configuration in use.
    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflicts
    }

    /// `compute(target, chain)`.
    ///
    /// `chain` lists scopes root-to-leaf ending at `target`; `policies` are
    /// the policies attached to those scopes.
    ///
    /// # Errors
    ///
    /// - [`InheritanceError::Validation`] for a malformed chain or policy.
    /// - [`InheritanceError::Conflict`] if any incompatible conflict occurs.
    /// - [`InheritanceError::Canonicalization`] if the merged values cannot
    ///   be hashed (e.g. they contain floats).
    pub fn compute(
        &self,
        target: &ScopeId,
        chain: &[Scope],
        policies: &[ScopedPolicy],
    ) -> Result<EffectiveOutcome, InheritanceError> {
        validate_chain(target, chain)?;

        let position: BTreeMap<&ScopeId, usize> =
            chain.iter().enumerate().map(|(i, s)| (&s.id, i)).collect();
        let mut ordered: Vec<(usize, &ScopedPolicy)> = Vec::with_capacity(policies.len());
        for policy in policies {
            let pos = position.get(&policy.scope_id).copied().ok_or_else(|| {
                ValidationError::PolicyScopeNotInChain {
                    policy_id: policy.policy_id.to_string(),
                    scope_id: policy.scope_id.to_string(),
                }
            })?;
            ordered.push((pos, policy));
        }
        ordered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.policy_id.cmp(&b.1.policy_id)));

        let mut state: BTreeMap<FieldPath, Entry> = BTreeMap::new();
        let mut conflicts = Vec::new();
        for (_, policy) in ordered {
            self.apply_policy(&mut state, policy, &mut conflicts)?;
        }

        if let Some(first) = conflicts
            .iter()
            .find(|c| c.classification == ConflictClassification::Incompatible)
        {
            tracing::warn!(
                scope = %target,
                policy = %first.child_policy_id,
                field = %first.field,
                "incompatible policy; effective policy not produced"
            );
            return Err(InheritanceError::Conflict {
                scope_id: first.child_scope_id.clone(),
                policy_id: first.child_policy_id.clone(),
                conflicts,
            });
        }

        let mut values = Value::Object(Map::new());
        let mut provenance = BTreeMap::new();
        for (path, entry) in state {
            if !path.insert(&mut values, entry.value) {
                tracing::warn!(field = %path, "field could not be placed in the merged document");
            }
            provenance.insert(path, entry.provenance);
        }

        let bytes = Canonicalizer::with_registry(self.registry).canonical_bytes(&values)?;
        let content_hash = sha256_digest(&bytes);
        tracing::info!(
            scope = %target,
            fields = provenance.len(),
            conflicts = conflicts.len(),
            hash = %content_hash,
            "effective policy computed"
        );

        Ok(EffectiveOutcome {
            policy: EffectivePolicy {
                scope_id: target.clone(),
                values,
                provenance,
                content_hash,
                version: 1,
            },
            conflicts,
        })
    }

    /// Recompute an effective policy, carrying its version counter forward.
    ///
    /// The version stays the same if the content hash is unchanged and is
    /// incremented otherwise.
    ///
    /// # Errors
    ///
    /// As [`compute`](Self::compute), plus
    /// [`ValidationError::ChainTargetMismatch`] if `previous` belongs to a
    /// different scope.
    pub fn recompute(
        &self,
        previous: &EffectivePolicy,
        target: &ScopeId,
        chain: &[Scope],
        policies: &[ScopedPolicy],
    ) -> Result<EffectiveOutcome, InheritanceError> {
        if &previous.scope_id != target {
            return Err(ValidationError::ChainTargetMismatch {
                expected: previous.scope_id.to_string(),
                actual: target.to_string(),
            }
            .into());
        }
        let mut outcome = self.compute(target, chain, policies)?;
        outcome.policy.version = if outcome.policy.content_hash == previous.content_hash {
            previous.version
        } else {
            previous.version.saturating_add(1)
        };
        Ok(outcome)
    }

    /// Compute for `target` inside a validated tree, using the policies
    /// attached anywhere on its ancestor chain. Policies on other scopes are
    /// ignored.
    ///
    /// # Errors
    ///
    /// As [`compute`](Self::compute), plus
    /// [`ValidationError::UnknownScope`] if `target` is not in the tree.
    pub fn compute_in_tree(
        &self,
        tree: &ScopeTree,
        target: &ScopeId,
        policies: &[ScopedPolicy],
    ) -> Result<EffectiveOutcome, InheritanceError> {
        let chain = tree.ancestor_chain(target)?;
        let in_chain: BTreeSet<&ScopeId> = chain.iter().map(|s| &s.id).collect();
        let relevant: Vec<ScopedPolicy> = policies
            .iter()
            .filter(|p| in_chain.contains(&p.scope_id))
            .cloned()
            .collect();
        self.compute(target, &chain, &relevant)
    }

    fn apply_policy(
        &self,
        state: &mut BTreeMap<FieldPath, Entry>,
        policy: &ScopedPolicy,
        conflicts: &mut Vec<PolicyConflict>,
    ) -> Result<(), ValidationError> {
        let leaves = self.leaves(policy, &policy.rules, "rules")?;
        let overrides = match &policy.override_rules {
            Some(doc) => self.leaves(policy, doc, "override_rules")?,
            None => Vec::new(),
        };
        let mode = policy.inheritance_mode;
        tracing::debug!(
            policy = %policy.policy_id,
            scope = %policy.scope_id,
            mode = %mode,
            fields = leaves.len(),
            overrides = overrides.len(),
            "applying policy"
        );

        let mut displaced: BTreeMap<FieldPath, Entry> = BTreeMap::new();
        if mode == InheritanceMode::Replace {
            let keys: BTreeSet<&str> = leaves.iter().filter_map(|(p, _)| p.top_level_key()).collect();
            let doomed: Vec<FieldPath> = state
                .keys()
                .filter(|p| p.top_level_key().is_some_and(|k| keys.contains(k)))
                .cloned()
                .collect();
            for path in doomed {
                if let Some(entry) = state.remove(&path) {
                    displaced.insert(path, entry);
                }
            }
        }

        for (path, declared) in leaves {
            let inherited = state.remove(&path).or_else(|| displaced.remove(&path));
            self.apply_leaf(state, policy, path, declared, inherited, false, conflicts);
        }
        // Inherited fields the replacement does not redeclare are dropped.
        for (path, entry) in displaced {
            if dropping_loosens(self.registry.directive(&path), &entry.value) {
                conflicts.push(self.conflict(
                    path,
                    ConflictClassification::Looser,
                    &entry,
                    &Value::Null,
                    policy,
                ));
            }
        }
        for (path, declared) in overrides {
            let inherited = state.remove(&path);
            self.apply_leaf(state, policy, path, declared, inherited, true, conflicts);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_leaf(
        &self,
        state: &mut BTreeMap<FieldPath, Entry>,
        policy: &ScopedPolicy,
        path: FieldPath,
        declared: Value,
        inherited: Option<Entry>,
        is_override: bool,
        conflicts: &mut Vec<PolicyConflict>,
    ) {
        let directive = self.registry.directive(&path);
        let mode = policy.inheritance_mode;

        // A leaf here and a leaf above or below it cannot coexist.
        let overlapping: Vec<FieldPath> = state
            .keys()
            .filter(|p| p.starts_with(&path) || path.starts_with(p))
            .cloned()
            .collect();
        for other in overlapping {
            if let Some(entry) = state.remove(&other) {
                conflicts.push(self.conflict(
                    other,
                    ConflictClassification::Incompatible,
                    &entry,
                    &declared,
                    policy,
                ));
            }
        }

        let result = match &inherited {
            None => declared.clone(),
            Some(_) if is_override || mode == InheritanceMode::Replace => declared.clone(),
            Some(prev) => match (mode, &prev.value, &declared) {
                (InheritanceMode::Append, Value::Array(a), Value::Array(b)) => {
                    Value::Array(a.iter().chain(b.iter()).cloned().collect())
                }
                _ => merge(directive, &prev.value, &declared),
            },
        };

        if let Some(prev) = &inherited {
            let additive = declared.is_array() && !is_override && mode != InheritanceMode::Replace;
            let compared = if additive { &result } else { &declared };
            if let Some(class) = self.difference(directive, &path, &prev.value, compared) {
                conflicts.push(self.conflict(path.clone(), class, prev, compared, policy));
            }
        }

        state.insert(
            path,
            Entry {
                value: result,
                provenance: FieldProvenance {
                    scope_id: policy.scope_id.clone(),
                    policy_id: policy.policy_id.clone(),
                    mode,
                    is_override,
                },
            },
        );
    }

    fn difference(
        &self,
        directive: Option<&FieldDirective>,
        path: &FieldPath,
        parent: &Value,
        child: &Value,
    ) -> Option<ConflictClassification> {
        let canonicalizer = Canonicalizer::with_registry(self.registry);
        let same = match (
            canonicalizer.canonicalize(parent.clone(), path),
            canonicalizer.canonicalize(child.clone(), path),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => parent == child,
        };
        if same {
            return None;
        }
        classify(directive, parent, child)
    }

    fn conflict(
        &self,
        field: FieldPath,
        classification: ConflictClassification,
        parent: &Entry,
        child_value: &Value,
        policy: &ScopedPolicy,
    ) -> PolicyConflict {
        let severity = self.conflicts.severity(classification);
        let description = if child_value.is_null() {
            format!(
                "{} drops {field}; inherited {} from {}",
                policy.policy_id, parent.value, parent.provenance.policy_id
            )
        } else {
            format!(
                "{} sets {field} to {child_value}; inherited {} from {}",
                policy.policy_id, parent.value, parent.provenance.policy_id
            )
        };
        match classification {
            ConflictClassification::Stricter => {
                tracing::debug!(field = %field, policy = %policy.policy_id, "stricter override")
            }
            _ => tracing::warn!(
                field = %field,
                policy = %policy.policy_id,
                classification = %classification,
                severity = %severity,
                "policy conflict"
            ),
        }
        PolicyConflict {
            field,
            classification,
            severity,
            parent_value: parent.value.clone(),
            child_value: child_value.clone(),
            parent_scope_id: parent.provenance.scope_id.clone(),
            parent_policy_id: parent.provenance.policy_id.clone(),
            child_scope_id: policy.scope_id.clone(),
            child_policy_id: policy.policy_id.clone(),
            description,
            status: ResolutionStatus::Unresolved,
            resolution: Vec::new(),
        }
    }

    /// Flatten a rule-set document and check registered kinds.
    fn leaves(
        &self,
        policy: &ScopedPolicy,
        doc: &Value,
        section: &'static str,
    ) -> Result<Vec<(FieldPath, Value)>, ValidationError> {
        let Value::Object(map) = doc else {
            return Err(ValidationError::RuleSetNotObject {
                policy_id: policy.policy_id.to_string(),
                section,
            });
        };
        // Outside a replacement an empty object declares nothing.
        let keep_empty = section == "rules" && policy.inheritance_mode == InheritanceMode::Replace;
        let mut out = Vec::new();
        self.flatten(&FieldPath::root(), map, keep_empty, &mut out)?;
        for (path, value) in &out {
            if let Some(directive) = self.registry.directive(path) {
                if !directive.kind.matches(value) {
                    return Err(ValidationError::FieldKindMismatch {
                        policy_id: policy.policy_id.to_string(),
                        field: path.to_string(),
                        expected: directive.kind.as_str().to_string(),
                        actual: describe_kind(value).to_string(),
                    });
                }
            }
        }
        Ok(out)
    }

    fn flatten(
        &self,
        prefix: &FieldPath,
        map: &Map<String, Value>,
        keep_empty: bool,
        out: &mut Vec<(FieldPath, Value)>,
    ) -> Result<(), ValidationError> {
        for (key, value) in map {
            let path = prefix.child(key.clone());
            if !FieldPath::is_plain_key(key) {
                return Err(ValidationError::InvalidFieldPath {
                    path: path.to_string(),
                    reason: format!("key {key:?} is not a plain field name"),
                });
            }
            match value {
                Value::Object(inner) if self.registry.directive(&path).is_none() => {
                    if !inner.is_empty() {
                        self.flatten(&path, inner, keep_empty, out)?;
                    } else if keep_empty {
                        out.push((path, value.clone()));
                    }
                }
                _ => out.push((path, value.clone())),
            }
        }
        Ok(())
    }
}

/// Combine an inherited value with a declared one under merge mode.
fn merge(directive: Option<&FieldDirective>, inherited: &Value, declared: &Value) -> Value {
    let Some(directive) = directive else {
        return declared.clone();
    };
    match (directive.merge, inherited, declared) {
        (MergeRule::LogicalOr, Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
        (MergeRule::Minimum, a, b) => match compare_numbers(b, a) {
            Some(std::cmp::Ordering::Less) => b.clone(),
            Some(_) => a.clone(),
            None => declared.clone(),
        },
        (MergeRule::Maximum, a, b) => match compare_numbers(b, a) {
            Some(std::cmp::Ordering::Greater) => b.clone(),
            Some(_) => a.clone(),
            None => declared.clone(),
        },
        (MergeRule::Union, Value::Array(a), Value::Array(b)) => {
            let mut out: Vec<Value> = Vec::with_capacity(a.len() + b.len());
            for item in a.iter().chain(b.iter()) {
                if !out.contains(item) {
                    out.push(item.clone());
                }
            }
            Value::Array(out)
        }
        (MergeRule::Append, Value::Array(a), Value::Array(b)) => {
            Value::Array(a.iter().chain(b.iter()).cloned().collect())
        }
        _ => declared.clone(),
    }
}

/// True if removing an inherited value relaxes the policy. A `false` flag
/// and an empty block list already impose nothing.
fn dropping_loosens(directive: Option<&FieldDirective>, inherited: &Value) -> bool {
    let Some(directive) = directive else {
        return true;
    };
    match (directive.strictness, inherited) {
        (Strictness::TrueIsStricter, Value::Bool(b)) => *b,
        (Strictness::MoreIsStricter, Value::Array(items)) => !items.is_empty(),
        _ => true,
    }
}

/// Structural checks on a root-to-leaf chain.
fn validate_chain(target: &ScopeId, chain: &[Scope]) -> Result<(), ValidationError> {
    let last = chain.last().ok_or(ValidationError::EmptyChain)?;
    if &last.id != target {
        return Err(ValidationError::ChainTargetMismatch {
            expected: target.to_string(),
            actual: last.id.to_string(),
        });
    }
    let mut seen = BTreeSet::new();
    for scope in chain {
        if !seen.insert(&scope.id) {
            return Err(ValidationError::DuplicateScope(scope.id.to_string()));
        }
    }
    for pair in chain.windows(2) {
        let (parent, child) = (&pair[0], &pair[1]);
        if child.parent_id.as_ref() != Some(&parent.id) {
            return Err(ValidationError::BrokenChain {
                scope_id: child.id.to_string(),
                expected_parent: parent.id.to_string(),
                actual_parent: child.parent_id.as_ref().map(ToString::to_string),
            });
        }
        check_depth(parent, child)?;
    }
    Ok(())
}

/// Compute with the standard registry and default conflict policy.
///
/// # Errors
///
/// See [`EffectivePolicyComputer::compute`].
pub fn compute(
    target: &ScopeId,
    chain: &[Scope],
    policies: &[ScopedPolicy],
) -> Result<EffectiveOutcome, InheritanceError> {
    EffectivePolicyComputer::default().compute(target, chain, policies)
}

/// Recompute with the standard registry and default conflict policy.
///
/// # Errors
///
/// See [`EffectivePolicyComputer::recompute`].
pub fn recompute(
    previous: &EffectivePolicy,
    target: &ScopeId,
    chain: &[Scope],
    policies: &[ScopedPolicy],
) -> Result<EffectiveOutcome, InheritanceError> {
    EffectivePolicyComputer::default().recompute(previous, target, chain, policies)
}
