//! # Evaluate Subcommand
//!
//! Resolves a usage event against a rule set, either a plain rule list or
//! the `decision_rules` of a computed effective policy.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use vera_decision::{
    decision_rules, explain, resolve, DecisionStatus, PolicyRule, RuleEvaluation, UsageEvent,
    Verdict,
};

use crate::config::Config;

/// Arguments for the `vera evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Usage event (JSON or YAML).
    #[arg(long)]
    pub event: PathBuf,

    /// Rule list (JSON or YAML array of rules).
    #[arg(long, required_unless_present = "effective", conflicts_with = "effective")]
    pub rules: Option<PathBuf>,

    /// Effective policy whose `decision_rules` field supplies the rules,
    /// bare or as `vera effective` output.
    #[arg(long)]
    pub effective: Option<PathBuf>,

    /// Include the per-rule evaluation trace.
    #[arg(long)]
    pub explain: bool,
}

/// Output of `vera evaluate`.
#[derive(Debug, Serialize)]
pub struct EvaluateReport {
    /// The resolved verdict.
    pub verdict: Verdict,
    /// Per-rule trace, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluations: Option<Vec<RuleEvaluation>>,
}

/// Execute the evaluate subcommand.
///
/// Returns exit code: 0 on allow, 1 on block or review, 2 on operational error.
pub fn run_evaluate(args: &EvaluateArgs, config: &Config) -> Result<u8> {
    let report = evaluate(args)?;
    crate::emit(&report, config)?;
    Ok(exit_code(report.verdict.status))
}

/// Load inputs and resolve.
///
/// An effective policy whose values no longer match its content hash is
/// refused rather than evaluated.
pub fn evaluate(args: &EvaluateArgs) -> Result<EvaluateReport> {
    let event: UsageEvent = crate::load(&args.event)?;
    let rules: Vec<PolicyRule> = match (&args.rules, &args.effective) {
        (Some(path), _) => crate::load(path)?,
        (None, Some(path)) => {
            let policy = crate::effective::load_effective(path)?;
            if !policy.verify()? {
                tracing::warn!(scope = %policy.scope_id, hash = %policy.content_hash, "effective policy content hash does not match its values");
                anyhow::bail!(
                    "{}: effective policy for {} does not match its content hash {}",
                    path.display(),
                    policy.scope_id,
                    policy.content_hash
                );
            }
            decision_rules(&policy)?
        }
        (None, None) => anyhow::bail!("either --rules or --effective is required"),
    };

    let verdict = resolve(&event, &rules);
    let evaluations = args.explain.then(|| explain(&event, &rules));
    Ok(EvaluateReport {
        verdict,
        evaluations,
    })
}

fn exit_code(status: DecisionStatus) -> u8 {
    match status {
        DecisionStatus::Allow => crate::EXIT_OK,
        DecisionStatus::Block | DecisionStatus::RequiresReview => crate::EXIT_NEGATIVE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const EVENT: &str = r#"{
        "actor": {"role": "agency_designer"},
        "tool": {"id": "gen-x", "name": "GenX", "version": "4.2.0"},
        "action": {"kind": "generate"},
        "context": {
            "tenant_id": "tenant-ogilvy",
            "enterprise_id": "ent-pfizer",
            "brand": "brand-x",
            "policy_snapshot_id": "snap-1"
        }
    }"#;

    const RULES_YAML: &str = r#"
- id: p1
  priority: 1
  condition:
    type: leaf
    field: tool.version
    operator: version_less_than
    value: "5.0.0"
  decision:
    status: block
    reason: outdated tool
- id: p2
  priority: 2
  condition:
    type: leaf
    field: tool.id
    operator: in
    value: [gen-x, gen-y]
  decision:
    status: allow
    reason: approved tool
"#;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn evaluates_yaml_rules_against_json_event() {
        let dir = tempfile::tempdir().unwrap();
        let args = EvaluateArgs {
            event: write(dir.path(), "event.json", EVENT),
            rules: Some(write(dir.path(), "rules.yaml", RULES_YAML)),
            effective: None,
            explain: true,
        };
        let report = evaluate(&args).unwrap();
        assert_eq!(report.verdict.status, DecisionStatus::Block);
        assert_eq!(report.verdict.rule_id.as_ref().unwrap().as_str(), "p1");
        let trace = report.evaluations.unwrap();
        assert_eq!(trace.len(), 2);
        assert!(trace[0].matched);
        assert_eq!(exit_code(report.verdict.status), 1);
    }

    #[test]
    fn explain_is_omitted_unless_requested() {
        let dir = tempfile::tempdir().unwrap();
        let args = EvaluateArgs {
            event: write(dir.path(), "event.json", EVENT),
            rules: Some(write(dir.path(), "rules.json", "[]")),
            effective: None,
            explain: false,
        };
        let report = evaluate(&args).unwrap();
        assert_eq!(report.verdict.status, DecisionStatus::RequiresReview);
        assert!(report.evaluations.is_none());
    }

    #[test]
    fn exit_codes_follow_status() {
        assert_eq!(exit_code(DecisionStatus::Allow), 0);
        assert_eq!(exit_code(DecisionStatus::Block), 1);
        assert_eq!(exit_code(DecisionStatus::RequiresReview), 1);
    }
}
