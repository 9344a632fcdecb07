//! # vera CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vera_cli::bundle::{run_bundle, BundleArgs};
use vera_cli::config::Config;
use vera_cli::effective::{run_effective, EffectiveArgs};
use vera_cli::evaluate::{run_evaluate, EvaluateArgs};
use vera_cli::hash::{run_hash, HashArgs};
use vera_cli::validate::{run_validate, ValidateArgs};
use vera_cli::verify::{run_verify, VerifyArgs};
use vera_cli::EXIT_ERROR;

/// VERA governance CLI
///
/// Evaluates AI-tool usage against enterprise rules, computes inherited
/// effective policies, and produces tamper-evident proof bundles.
#[derive(Parser, Debug)]
#[command(name = "vera", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a usage event against a rule set.
    Evaluate(EvaluateArgs),

    /// Compute the effective policy for a scope.
    Effective(EffectiveArgs),

    /// Compile a proof bundle from an event and its verdict.
    Bundle(BundleArgs),

    /// Print the canonical digest of a document.
    Hash(HashArgs),

    /// Check a proof bundle's integrity hash.
    Verify(VerifyArgs),

    /// Authoring checks for rules and scopes.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    tracing::debug!(?config, "vera CLI starting");

    let result = match cli.command {
        Commands::Evaluate(args) => run_evaluate(&args, &config),
        Commands::Effective(args) => run_effective(&args, &config),
        Commands::Bundle(args) => run_bundle(&args, &config),
        Commands::Hash(args) => run_hash(&args, &config),
        Commands::Verify(args) => run_verify(&args, &config),
        Commands::Validate(args) => run_validate(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
