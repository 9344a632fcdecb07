//! # Hash Subcommand
//!
//! Prints the canonical SHA-256 digest of a JSON or YAML document. By
//! default orderless fields from the standard registry are sorted first;
//! `--unregistered` keeps every array in its given order.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use vera_core::{sha256_digest, Canonicalizer, ContentDigest};

use crate::config::Config;

/// Arguments for the `vera hash` subcommand.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Document to hash.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Hash without field semantics; all arrays keep their order.
    #[arg(long)]
    pub unregistered: bool,
}

/// Execute the hash subcommand.
pub fn run_hash(args: &HashArgs, _config: &Config) -> Result<u8> {
    println!("{}", hash(args)?);
    Ok(crate::EXIT_OK)
}

/// Load and digest.
pub fn hash(args: &HashArgs) -> Result<ContentDigest> {
    let doc: Value = crate::load(&args.file)?;
    let canonicalizer = if args.unregistered {
        Canonicalizer::unregistered()
    } else {
        Canonicalizer::standard()
    };
    let digest = sha256_digest(&canonicalizer.canonical_bytes(&doc)?);
    tracing::debug!(file = %args.file.display(), %digest, "hashed document");
    Ok(digest)
}
