//! # Governance Pipeline
//!
//! End-to-end flow across crate boundaries: scope tree and policies →
//! effective policy → decision rules → verdict → proof bundle → verify.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use vera_core::{FieldPath, PolicyId, ScopeId};
use vera_decision::{resolve_effective, ActionKind, DecisionStatus, UsageEvent};
use vera_inheritance::{
    ConflictClassification, ConflictSeverity, EffectivePolicyComputer, InheritanceMode, Scope,
    ScopeTree, ScopedPolicy,
};
use vera_proof::{compile, IntegrityCheck};

fn scopes() -> Vec<Scope> {
    serde_json::from_value(json!([
        {"id": "acme", "scope_type": "enterprise", "path": "acme"},
        {"id": "acme.na", "scope_type": "region", "parent_id": "acme", "path": "acme/na"},
        {"id": "acme.na.us", "scope_type": "country", "parent_id": "acme.na", "path": "acme/na/us"},
        {"id": "acme.na.us.brand-x", "scope_type": "brand", "parent_id": "acme.na.us", "path": "acme/na/us/brand-x"}
    ]))
    .unwrap()
}

fn rule(id: &str, priority: i64, field: &str, operator: &str, value: Value, status: &str) -> Value {
    json!({
        "id": id,
        "priority": priority,
        "condition": {"type": "leaf", "field": field, "operator": operator, "value": value},
        "decision": {"status": status, "reason": format!("{id} matched")}
    })
}

fn policies() -> Vec<ScopedPolicy> {
    vec![
        ScopedPolicy::new(
            PolicyId::new("pol-acme").unwrap(),
            ScopeId::new("acme").unwrap(),
            InheritanceMode::Merge,
            json!({
                "decision_rules": [
                    rule("block-old", 1, "tool.version", "version_less_than", json!("5.0.0"), "block"),
                    rule("allow-approved", 10, "tool.id", "in", json!(["gen-x", "gen-y"]), "allow"),
                ],
                "blocked_actions": ["publish"],
                "controls": {"hitl": {"required": true}}
            }),
        ),
        ScopedPolicy::new(
            PolicyId::new("pol-brand-x").unwrap(),
            ScopeId::new("acme.na.us.brand-x").unwrap(),
            InheritanceMode::Merge,
            json!({
                "decision_rules": [
                    rule("review-publish", 5, "action.kind", "equals", json!("publish"), "requires_review"),
                ],
                "blocked_actions": ["publish", "export"]
            }),
        ),
    ]
}

fn event(version: &str, kind: &str) -> UsageEvent {
    serde_json::from_value(json!({
        "actor": {"role": "agency_designer"},
        "tool": {"id": "gen-x", "name": "GenX Studio", "version": version},
        "action": {"kind": kind},
        "context": {
            "tenant_id": "tenant-ogilvy",
            "enterprise_id": "ent-acme",
            "brand": "brand-x",
            "region": "na",
            "policy_snapshot_id": "snap-2024-07"
        },
        "content": {"prompt": "write the tagline for the new launch"}
    }))
    .unwrap()
}

fn brand_policy() -> vera_inheritance::EffectiveOutcome {
    let tree = ScopeTree::new(scopes()).unwrap();
    EffectivePolicyComputer::default()
        .compute_in_tree(&tree, &ScopeId::new("acme.na.us.brand-x").unwrap(), &policies())
        .unwrap()
}

#[test]
fn effective_policy_accumulates_rules_from_the_chain() {
    let outcome = brand_policy();
    assert!(!outcome.blocks_activation());
    assert!(outcome.policy.verify().unwrap());

    let rules = outcome.policy.values["decision_rules"].as_array().unwrap();
    assert_eq!(rules.len(), 3);

    let path = FieldPath::parse("controls.hitl.required").unwrap();
    assert_eq!(outcome.policy.value(&path), Some(&json!(true)));
    assert_eq!(outcome.policy.explain(&path).unwrap().scope_id.as_str(), "acme");

    // Block-list growth tightens; an added rule may shadow inherited ones,
    // so it is surfaced as looser at the default warning severity.
    for conflict in &outcome.conflicts {
        let expected = if conflict.field.to_string() == "decision_rules" {
            ConflictClassification::Looser
        } else {
            ConflictClassification::Stricter
        };
        assert_eq!(conflict.classification, expected, "{}", conflict.field);
    }
    assert!(outcome
        .conflicts
        .iter()
        .any(|c| c.field.to_string() == "decision_rules"
            && c.severity == ConflictSeverity::Warning));
}

#[test]
fn verdicts_follow_inherited_rules() {
    let policy = brand_policy().policy;

    let allowed = resolve_effective(&event("6.1.0", "generate"), &policy).unwrap();
    assert_eq!(allowed.status, DecisionStatus::Allow);
    assert_eq!(allowed.rule_id.unwrap().as_str(), "allow-approved");

    let outdated = resolve_effective(&event("4.9.9", "generate"), &policy).unwrap();
    assert_eq!(outdated.status, DecisionStatus::Block);
    assert_eq!(outdated.rule_id.unwrap().as_str(), "block-old");

    let publish = resolve_effective(&event("6.1.0", "publish"), &policy).unwrap();
    assert_eq!(publish.status, DecisionStatus::RequiresReview);
    assert_eq!(publish.rule_id.unwrap().as_str(), "review-publish");
    assert_eq!(publish.policy_snapshot_id.as_str(), "snap-2024-07");
}

#[test]
fn parent_scope_does_not_see_child_rules() {
    let tree = ScopeTree::new(scopes()).unwrap();
    let outcome = EffectivePolicyComputer::default()
        .compute_in_tree(&tree, &ScopeId::new("acme.na.us").unwrap(), &policies())
        .unwrap();
    let verdict = resolve_effective(&event("6.1.0", "publish"), &outcome.policy).unwrap();
    assert_eq!(verdict.status, DecisionStatus::Allow);
}

#[test]
fn verdict_becomes_verifiable_bundle() {
    let policy = brand_policy().policy;
    let usage = event("4.0.0", "generate");
    let verdict = resolve_effective(&usage, &policy).unwrap();

    let mut extra = BTreeMap::new();
    extra.insert("effective_policy.version".to_string(), json!(policy.version));
    extra.insert(
        "effective_policy.hash".to_string(),
        json!(policy.content_hash.to_string()),
    );
    let bundle = compile(&usage, &verdict, &extra).unwrap();

    assert_eq!(bundle.verify(), IntegrityCheck::Intact);
    assert_eq!(bundle.get("verdict.status"), Some(&json!("block")));
    assert_eq!(bundle.get("verdict.rule_id"), Some(&json!("block-old")));
    assert_eq!(bundle.get("action.kind"), Some(&json!(ActionKind::Generate.as_str())));
    assert_eq!(bundle.get("context.region"), Some(&json!("na")));

    let stored = serde_json::to_string(&bundle).unwrap();
    assert!(!stored.contains("tagline"));
}

#[test]
fn policy_change_bumps_version_and_changes_outcome() {
    let tree = ScopeTree::new(scopes()).unwrap();
    let target = ScopeId::new("acme.na.us.brand-x").unwrap();
    let computer = EffectivePolicyComputer::default();
    let first = computer.compute_in_tree(&tree, &target, &policies()).unwrap().policy;

    let chain = tree.ancestor_chain(&target).unwrap();
    let same = computer.recompute(&first, &target, &chain, &policies()).unwrap().policy;
    assert_eq!(same.version, first.version);
    assert_eq!(same.content_hash, first.content_hash);

    let mut changed = policies();
    changed.push(ScopedPolicy::new(
        PolicyId::new("pol-us").unwrap(),
        ScopeId::new("acme.na.us").unwrap(),
        InheritanceMode::Merge,
        json!({
            "decision_rules": [
                rule("block-gen-x", 0, "tool.id", "equals", json!("gen-x"), "block"),
            ]
        }),
    ));
    let next = computer.recompute(&first, &target, &chain, &changed).unwrap().policy;
    assert_eq!(next.version, first.version + 1);
    assert_ne!(next.content_hash, first.content_hash);

    let verdict = resolve_effective(&event("6.1.0", "generate"), &next).unwrap();
    assert_eq!(verdict.status, DecisionStatus::Block);
    assert_eq!(verdict.rule_id.unwrap().as_str(), "block-gen-x");
}

#[test]
fn public_records_cross_threads() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<vera_core::FieldRegistry>();
    assert_send_sync::<vera_core::Canonicalizer<'static>>();
    assert_send_sync::<vera_core::ContentDigest>();
    assert_send_sync::<vera_core::VeraError>();
    assert_send_sync::<UsageEvent>();
    assert_send_sync::<vera_decision::PolicyRule>();
    assert_send_sync::<vera_decision::Verdict>();
    assert_send_sync::<vera_decision::RuleBook>();
    assert_send_sync::<ScopeTree>();
    assert_send_sync::<ScopedPolicy>();
    assert_send_sync::<EffectivePolicyComputer<'static>>();
    assert_send_sync::<vera_inheritance::EffectiveOutcome>();
    assert_send_sync::<vera_inheritance::PolicyConflict>();
    assert_send_sync::<vera_inheritance::InheritanceError>();
    assert_send_sync::<vera_proof::ProofBundle>();
    assert_send_sync::<vera_proof::ProofError>();
}
