//! # Validate Subcommand
//!
//! Authoring-time checks. Rules are checked for duplicate ids, operator
//! and value mismatches, and excessive nesting; scope lists are checked
//! for unknown parents, cycles, and depth ordering.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use vera_decision::{collect_violations, PolicyRule};
use vera_inheritance::{Scope, ScopeTree};

use crate::config::Config;

/// Arguments for the `vera validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Rule list to check.
    #[arg(long, required_unless_present = "scopes")]
    pub rules: Option<PathBuf>,

    /// Scope list to check.
    #[arg(long)]
    pub scopes: Option<PathBuf>,
}

/// Output of `vera validate`.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    /// Number of rules checked.
    pub rules_checked: usize,
    /// Number of scopes checked.
    pub scopes_checked: usize,
    /// Every problem found.
    pub violations: Vec<String>,
}

impl ValidationReport {
    /// True if nothing was found.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 on success, 1 on validation failure, 2 on operational error.
pub fn run_validate(args: &ValidateArgs, config: &Config) -> Result<u8> {
    let report = validate(args)?;
    crate::emit(&report, config)?;
    Ok(if report.passed() {
        crate::EXIT_OK
    } else {
        crate::EXIT_NEGATIVE
    })
}

/// Load and check.
pub fn validate(args: &ValidateArgs) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    if let Some(path) = &args.rules {
        let rules: Vec<PolicyRule> = crate::load(path)?;
        report.rules_checked = rules.len();
        report
            .violations
            .extend(collect_violations(&rules).into_iter().map(|e| e.to_string()));
    }

    if let Some(path) = &args.scopes {
        let scopes: Vec<Scope> = crate::load(path)?;
        report.scopes_checked = scopes.len();
        if let Err(e) = ScopeTree::new(scopes) {
            report.violations.push(e.to_string());
        }
    }

    tracing::info!(
        rules = report.rules_checked,
        scopes = report.scopes_checked,
        violations = report.violations.len(),
        "validation complete"
    );
    Ok(report)
}
