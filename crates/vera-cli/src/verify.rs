//! # Verify Subcommand
//!
//! Recomputes the integrity hash of a stored proof bundle.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use vera_proof::{IntegrityCheck, ProofBundle};

use crate::config::Config;

/// Arguments for the `vera verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Proof bundle (JSON or YAML).
    #[arg(long)]
    pub bundle: PathBuf,
}

/// Execute the verify subcommand.
///
/// Returns exit code: 0 if intact, 1 on mismatch or unhashable items,
/// 2 on operational error.
pub fn run_verify(args: &VerifyArgs, config: &Config) -> Result<u8> {
    let check = verify(args)?;
    crate::emit(&check, config)?;
    Ok(if check.is_intact() {
        crate::EXIT_OK
    } else {
        crate::EXIT_NEGATIVE
    })
}

/// Load and check.
pub fn verify(args: &VerifyArgs) -> Result<IntegrityCheck> {
    let bundle: ProofBundle = crate::load(&args.bundle)?;
    let check = bundle.verify();
    tracing::info!(bundle = %bundle.bundle_id, intact = check.is_intact(), "verified proof bundle");
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn stored_bundle() -> Value {
        let items = json!([
            {"key": "tool.id", "value": "gen-x"},
            {"key": "verdict.status", "value": "allow"}
        ]);
        let items_vec: Vec<vera_proof::EvidenceItem> = serde_json::from_value(items.clone()).unwrap();
        let hash = vera_proof::hash_items(&items_vec).unwrap();
        json!({
            "bundle_id": "00000000-0000-0000-0000-000000000000",
            "tenant_id": "tenant-ogilvy",
            "policy_snapshot_id": "snap-1",
            "items": items,
            "integrity_hash": hash.to_string(),
        })
    }

    fn run(doc: &Value) -> IntegrityCheck {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, serde_json::to_string(doc).unwrap()).unwrap();
        verify(&VerifyArgs { bundle: path }).unwrap()
    }

    #[test]
    fn intact_bundle_verifies() {
        assert_eq!(run(&stored_bundle()), IntegrityCheck::Intact);
    }

    #[test]
    fn edited_bundle_fails() {
        let mut doc = stored_bundle();
        doc["items"][1]["value"] = json!("block");
        assert!(matches!(run(&doc), IntegrityCheck::Mismatch { .. }));
    }

    #[test]
    fn bundle_id_is_not_covered() {
        let mut doc = stored_bundle();
        doc["bundle_id"] = json!("11111111-1111-1111-1111-111111111111");
        assert!(run(&doc).is_intact());
    }
}
