//! # vera-cli: Command-Line Interface for the Governance Core
//!
//! Provides the `vera` binary. Every subcommand reads JSON or YAML input
//! files and writes JSON to stdout.
//!
//! ## Subcommands
//!
//! - `vera evaluate`: Resolve a usage event against a rule set.
//! - `vera effective`: Compute a scope's effective policy and conflicts.
//! - `vera bundle`: Compile a proof bundle from an event and verdict.
//! - `vera hash`: Canonical SHA-256 digest of a document.
//! - `vera verify`: Recompute a proof bundle's integrity hash.
//! - `vera validate`: Authoring checks for rules and scope trees.
//!
//! ## Exit Codes
//!
//! `0` success, `1` negative outcome (blocked verdict, blocking conflict,
//! tampered bundle, validation failures), `2` operational error.

pub mod bundle;
pub mod config;
pub mod effective;
pub mod evaluate;
pub mod hash;
pub mod validate;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use config::Config;

/// Exit code for a successful, positive outcome.
pub const EXIT_OK: u8 = 0;
/// Exit code for a negative outcome.
pub const EXIT_NEGATIVE: u8 = 1;
/// Exit code for an operational error.
pub const EXIT_ERROR: u8 = 2;

/// Read a JSON or YAML document. `.yaml` and `.yml` files are parsed as
/// YAML; anything else as JSON.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if is_yaml(path) {
        serde_yaml::from_str(&text).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Render `value` as JSON, pretty-printed when configured.
pub fn render(value: &impl Serialize, config: &Config) -> Result<String> {
    let text = if config.output.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

/// Print `value` to stdout as JSON.
pub fn emit(value: &impl Serialize, config: &Config) -> Result<()> {
    println!("{}", render(value, config)?);
    Ok(())
}
