//! # CLI Flows
//!
//! Drives the `vera` subcommand handlers through files on disk, feeding
//! each command's JSON output into the next.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use vera_cli::bundle::{bundle, BundleArgs};
use vera_cli::config::Config;
use vera_cli::effective::{effective, EffectiveArgs, EffectiveReport};
use vera_cli::evaluate::{evaluate, EvaluateArgs};
use vera_cli::hash::{hash, HashArgs};
use vera_cli::render;
use vera_cli::verify::{verify, VerifyArgs};
use vera_decision::DecisionStatus;
use vera_proof::IntegrityCheck;

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

const SCOPES: &str = r#"
- id: acme
  scope_type: enterprise
- id: acme.brand-x
  scope_type: brand
  parent_id: acme
"#;

const POLICIES: &str = r#"
- policy_id: pol-acme
  scope_id: acme
  rules:
    decision_rules:
      - id: allow-gen-x
        priority: 10
        condition: {type: leaf, field: tool.id, operator: equals, value: gen-x}
        decision: {status: allow, reason: approved tool}
- policy_id: pol-brand-x
  scope_id: acme.brand-x
  rules:
    decision_rules:
      - id: block-export
        priority: 1
        condition: {type: leaf, field: action.kind, operator: equals, value: export}
        decision: {status: block, reason: exports are not permitted}
"#;

const EVENT: &str = r#"{
    "actor": {"role": "agency_designer"},
    "tool": {"id": "gen-x", "name": "GenX", "version": "6.0.0"},
    "action": {"kind": "export"},
    "context": {
        "tenant_id": "tenant-ogilvy",
        "enterprise_id": "ent-acme",
        "brand": "brand-x",
        "policy_snapshot_id": "snap-9"
    }
}"#;

#[test]
fn effective_then_evaluate_then_bundle_then_verify() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();

    // 1. Effective policy for the brand.
    let report = effective(
        &EffectiveArgs {
            scopes: write(dir.path(), "scopes.yaml", SCOPES),
            policies: write(dir.path(), "policies.yaml", POLICIES),
            target: "acme.brand-x".to_string(),
            previous: None,
        },
        &config,
    )
    .unwrap();
    assert!(matches!(report, EffectiveReport::Computed(_)));
    let effective_path = write(dir.path(), "effective.json", &render(&report, &config).unwrap());

    // 2. Evaluate the event against it.
    let evaluation = evaluate(&EvaluateArgs {
        event: write(dir.path(), "event.json", EVENT),
        rules: None,
        effective: Some(effective_path),
        explain: false,
    })
    .unwrap();
    assert_eq!(evaluation.verdict.status, DecisionStatus::Block);
    assert_eq!(evaluation.verdict.rule_id.as_ref().unwrap().as_str(), "block-export");
    let verdict_path = write(dir.path(), "verdict.json", &render(&evaluation, &config).unwrap());

    // 3. Compile the bundle.
    let compiled = bundle(&BundleArgs {
        event: dir.path().join("event.json"),
        verdict: verdict_path,
        extras: vec!["ticket=CHG-1042".to_string()],
    })
    .unwrap();
    let bundle_path = write(dir.path(), "bundle.json", &render(&compiled, &config).unwrap());

    // 4. Verify, then tamper and verify again.
    let check = verify(&VerifyArgs {
        bundle: bundle_path.clone(),
    })
    .unwrap();
    assert_eq!(check, IntegrityCheck::Intact);

    let mut stored: Value = serde_json::from_str(&std::fs::read_to_string(&bundle_path).unwrap()).unwrap();
    for item in stored["items"].as_array_mut().unwrap() {
        if item["key"] == "verdict.status" {
            item["value"] = json!("allow");
        }
    }
    std::fs::write(&bundle_path, serde_json::to_string(&stored).unwrap()).unwrap();
    let tampered = verify(&VerifyArgs { bundle: bundle_path }).unwrap();
    assert!(matches!(tampered, IntegrityCheck::Mismatch { .. }));
}

#[test]
fn hash_matches_effective_content_hash() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let report = effective(
        &EffectiveArgs {
            scopes: write(dir.path(), "scopes.yaml", SCOPES),
            policies: write(dir.path(), "policies.yaml", POLICIES),
            target: "acme.brand-x".to_string(),
            previous: None,
        },
        &config,
    )
    .unwrap();
    let EffectiveReport::Computed(outcome) = report else {
        panic!("expected computed");
    };
    let values = write(
        dir.path(),
        "values.json",
        &serde_json::to_string(&outcome.policy.values).unwrap(),
    );
    let digest = hash(&HashArgs {
        file: values,
        unregistered: false,
    })
    .unwrap();
    assert_eq!(digest, outcome.policy.content_hash);
}

#[test]
fn evaluate_refuses_an_edited_effective_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let report = effective(
        &EffectiveArgs {
            scopes: write(dir.path(), "scopes.yaml", SCOPES),
            policies: write(dir.path(), "policies.yaml", POLICIES),
            target: "acme.brand-x".to_string(),
            previous: None,
        },
        &config,
    )
    .unwrap();
    let mut stored: Value = serde_json::from_str(&render(&report, &config).unwrap()).unwrap();
    for rule in stored["policy"]["values"]["decision_rules"].as_array_mut().unwrap() {
        if rule["id"] == "block-export" {
            rule["decision"]["status"] = json!("allow");
        }
    }
    let effective_path = write(
        dir.path(),
        "effective.json",
        &serde_json::to_string(&stored).unwrap(),
    );

    let err = evaluate(&EvaluateArgs {
        event: write(dir.path(), "event.json", EVENT),
        rules: None,
        effective: Some(effective_path),
        explain: false,
    })
    .unwrap_err();
    assert!(err.to_string().contains("content hash"), "{err}");
}
