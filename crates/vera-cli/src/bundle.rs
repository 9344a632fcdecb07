//! # Bundle Subcommand
//!
//! Compiles a proof bundle from a usage event and the verdict resolved for
//! it. Extras are `key=value` pairs; a value that parses as JSON is kept as
//! JSON, anything else is a string.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::Value;

use vera_decision::{UsageEvent, Verdict};
use vera_proof::ProofBundle;

use crate::config::Config;

/// Arguments for the `vera bundle` subcommand.
#[derive(Args, Debug)]
pub struct BundleArgs {
    /// Usage event (JSON or YAML).
    #[arg(long)]
    pub event: PathBuf,

    /// Verdict resolved for the event, bare or as `vera evaluate` output.
    #[arg(long)]
    pub verdict: PathBuf,

    /// Additional evidence item, `key=value`. Repeatable.
    #[arg(long = "extra", value_name = "KEY=VALUE")]
    pub extras: Vec<String>,
}

/// Execute the bundle subcommand.
pub fn run_bundle(args: &BundleArgs, config: &Config) -> Result<u8> {
    let bundle = bundle(args)?;
    crate::emit(&bundle, config)?;
    Ok(crate::EXIT_OK)
}

/// Load inputs and compile.
pub fn bundle(args: &BundleArgs) -> Result<ProofBundle> {
    let event: UsageEvent = crate::load(&args.event)?;
    let mut doc: Value = crate::load(&args.verdict)?;
    let body = match doc.get_mut("verdict") {
        Some(inner) => inner.take(),
        None => doc,
    };
    let verdict: Verdict = serde_json::from_value(body)?;
    let extra = parse_extras(&args.extras)?;
    Ok(vera_proof::compile(&event, &verdict, &extra)?)
}

/// Parse `key=value` pairs. Later duplicates win.
pub fn parse_extras(raw: &[String]) -> Result<BTreeMap<String, Value>> {
    let mut out = BTreeMap::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("extra {pair:?} is not key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("extra {pair:?} has an empty key"));
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        out.insert(key.to_string(), value);
    }
    Ok(out)
}
