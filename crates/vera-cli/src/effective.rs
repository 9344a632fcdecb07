//! # Effective Subcommand
//!
//! Computes the effective policy for one scope from a scope tree and the
//! policies attached along its ancestor chain. Output is the computed
//! policy and every conflict found; on an incompatible conflict only the
//! conflicts are printed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use vera_core::ScopeId;
use vera_inheritance::{
    EffectiveOutcome, EffectivePolicy, EffectivePolicyComputer, InheritanceError, PolicyConflict,
    Scope, ScopeTree, ScopedPolicy,
};

use crate::config::Config;

/// Arguments for the `vera effective` subcommand.
#[derive(Args, Debug)]
pub struct EffectiveArgs {
    /// Scope list (JSON or YAML array of scopes).
    #[arg(long)]
    pub scopes: PathBuf,

    /// Policy list (JSON or YAML array of scoped policies).
    #[arg(long)]
    pub policies: PathBuf,

    /// Scope to compute.
    #[arg(long)]
    pub target: String,

    /// Previously computed effective policy; carries the version forward.
    #[arg(long)]
    pub previous: Option<PathBuf>,
}

/// Output of `vera effective`.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EffectiveReport {
    /// The effective policy was produced.
    Computed(EffectiveOutcome),
    /// An incompatible conflict stopped the computation.
    Rejected {
        /// Scope of the first incompatible policy.
        scope_id: ScopeId,
        /// Every conflict found.
        conflicts: Vec<PolicyConflict>,
    },
}

impl EffectiveReport {
    /// Exit code for this report.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Computed(outcome) if !outcome.blocks_activation() => crate::EXIT_OK,
            _ => crate::EXIT_NEGATIVE,
        }
    }
}

/// Execute the effective subcommand.
///
/// Returns exit code: 0 if the policy can activate, 1 on a blocking or
/// incompatible conflict, 2 on operational error.
pub fn run_effective(args: &EffectiveArgs, config: &Config) -> Result<u8> {
    let report = effective(args, config)?;
    crate::emit(&report, config)?;
    Ok(report.exit_code())
}

/// Load inputs and compute.
pub fn effective(args: &EffectiveArgs, config: &Config) -> Result<EffectiveReport> {
    let scopes: Vec<Scope> = crate::load(&args.scopes)?;
    let policies: Vec<ScopedPolicy> = crate::load(&args.policies)?;
    let tree = ScopeTree::new(scopes).context("invalid scope tree")?;
    let target = ScopeId::new(args.target.as_str())?;
    let computer = EffectivePolicyComputer::new(config.conflicts);

    let result = match &args.previous {
        None => computer.compute_in_tree(&tree, &target, &policies),
        Some(path) => {
            let previous = load_effective(path)?;
            let chain = tree.ancestor_chain(&target)?;
            let relevant: Vec<ScopedPolicy> = policies
                .into_iter()
                .filter(|p| chain.iter().any(|s| s.id == p.scope_id))
                .collect();
            computer.recompute(&previous, &target, &chain, &relevant)
        }
    };

    match result {
        Ok(outcome) => Ok(EffectiveReport::Computed(outcome)),
        Err(InheritanceError::Conflict {
            scope_id,
            conflicts,
            ..
        }) => Ok(EffectiveReport::Rejected {
            scope_id,
            conflicts,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Read an effective policy, either bare or wrapped in the
/// `{"policy", "conflicts"}` output of `vera effective`.
pub fn load_effective(path: &Path) -> Result<EffectivePolicy> {
    let mut doc: Value = crate::load(path)?;
    let body = match doc.get_mut("policy") {
        Some(inner) => inner.take(),
        None => doc,
    };
    serde_json::from_value(body)
        .with_context(|| format!("{} is not an effective policy", path.display()))
}
