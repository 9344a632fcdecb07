//! # Decision Scenarios
//!
//! A realistic rule book authored in YAML, resolved against a matrix of
//! usage events. Covers priority ordering, fail-closed evaluation, and the
//! review default.

use serde_json::json;

use vera_core::RuleId;
use vera_decision::{
    collect_violations, explain, resolve, DecisionStatus, PolicyRule, RuleBook, UsageEvent,
    NO_MATCH_REASON,
};

const RULES: &str = r#"
- id: block-unapproved-publish
  priority: 1
  condition:
    type: and
    children:
      - type: leaf
        field: action.kind
        operator: in
        value: [publish, share]
      - type: leaf
        field: actor.role
        operator: not_in
        value: [brand_manager, legal_reviewer]
  decision:
    status: block
    reason: only brand managers may publish
- id: review-legacy-tool
  priority: 5
  condition:
    type: leaf
    field: tool.version
    operator: version_satisfies_range
    value: "<3.0.0"
  decision:
    status: requires_review
    reason: legacy tool version
- id: allow-emea-channels
  priority: 10
  condition:
    type: or
    children:
      - type: leaf
        field: context.channel
        operator: equals
        value: web
      - type: leaf
        field: context.channel
        operator: equals
        value: email
  decision:
    status: allow
    reason: approved channel
- id: disabled-allow-all
  priority: 0
  active: false
  condition:
    type: and
    children: []
  decision:
    status: allow
    reason: never applies
"#;

fn rules() -> Vec<PolicyRule> {
    serde_yaml::from_str(RULES).unwrap()
}

fn event(role: &str, kind: &str, version: &str, channel: Option<&str>) -> UsageEvent {
    let mut context = json!({
        "tenant_id": "tenant-wpp",
        "enterprise_id": "ent-unilever",
        "policy_snapshot_id": "snap-42"
    });
    if let Some(c) = channel {
        context["channel"] = json!(c);
    }
    serde_json::from_value(json!({
        "actor": {"role": role},
        "tool": {"id": "copy-ai", "name": "CopyAI", "version": version},
        "action": {"kind": kind},
        "context": context
    }))
    .unwrap()
}

#[test]
fn authored_rules_are_valid() {
    assert!(collect_violations(&rules()).is_empty());
}

#[test]
fn decision_matrix() {
    let rules = rules();
    let cases = [
        ("designer", "publish", "4.0.0", Some("web"), DecisionStatus::Block, Some("block-unapproved-publish")),
        ("brand_manager", "publish", "4.0.0", Some("web"), DecisionStatus::Allow, Some("allow-emea-channels")),
        ("designer", "generate", "2.9.1", Some("web"), DecisionStatus::RequiresReview, Some("review-legacy-tool")),
        ("designer", "generate", "v4", Some("email"), DecisionStatus::Allow, Some("allow-emea-channels")),
        ("designer", "generate", "4.0.0", Some("print"), DecisionStatus::RequiresReview, None),
        ("designer", "generate", "4.0.0", None, DecisionStatus::RequiresReview, None),
    ];
    for (role, kind, version, channel, status, rule_id) in cases {
        let verdict = resolve(&event(role, kind, version, channel), &rules);
        assert_eq!(verdict.status, status, "{role} {kind} {version} {channel:?}");
        assert_eq!(verdict.rule_id.as_ref().map(RuleId::as_str), rule_id);
        assert_eq!(verdict.policy_snapshot_id.as_str(), "snap-42");
        if rule_id.is_none() {
            assert_eq!(verdict.reason, NO_MATCH_REASON);
        }
    }
}

#[test]
fn malformed_version_never_matches() {
    let verdict = resolve(&event("designer", "generate", "latest", Some("print")), &rules());
    assert_eq!(verdict.status, DecisionStatus::RequiresReview);
    assert!(verdict.rule_id.is_none());
}

#[test]
fn rule_book_matches_slice_resolution() {
    let book: RuleBook = rules().into_iter().collect();
    assert_eq!(book.len(), 4);
    for e in [
        event("designer", "share", "4.0.0", None),
        event("legal_reviewer", "share", "1.0.0", Some("web")),
    ] {
        assert_eq!(book.resolve(&e), resolve(&e, &rules()));
    }
}

#[test]
fn explain_skips_inactive_rules() {
    let trace = explain(&event("designer", "generate", "4.0.0", Some("web")), &rules());
    let ids: Vec<&str> = trace.iter().map(|t| t.rule_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["block-unapproved-publish", "review-legacy-tool", "allow-emea-channels"]
    );
    assert_eq!(
        trace.iter().map(|t| t.matched).collect::<Vec<_>>(),
        vec![false, false, true]
    );
}
