//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`:
//!
//! ```yaml
//! conflicts:
//!   looser_severity: error   # warning (default) | error
//! output:
//!   pretty: false            # default true
//! ```
//!
//! `VERA_LOOSER_SEVERITY` overrides `conflicts.looser_severity`.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use vera_inheritance::{ConflictPolicy, LooserSeverity};

/// Environment variable overriding the looser-conflict severity.
pub const LOOSER_SEVERITY_ENV: &str = "VERA_LOOSER_SEVERITY";

/// Resolved CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Conflict classification settings.
    pub conflicts: ConflictPolicy,
    /// Output formatting.
    pub output: OutputConfig,
}

/// Output formatting settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl Config {
    /// Load from an optional file, then apply the environment override.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let env = std::env::var(LOOSER_SEVERITY_ENV).ok();
        config.with_looser_override(env.as_deref())
    }

    /// Parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Apply a looser-severity override, if one is given.
    pub fn with_looser_override(mut self, value: Option<&str>) -> Result<Self> {
        if let Some(raw) = value {
            let severity: LooserSeverity = raw
                .parse()
                .map_err(|e: String| anyhow!("{LOOSER_SEVERITY_ENV}: {e}"))?;
            self.conflicts.looser_severity = severity;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_warn_on_looser_and_pretty_print() {
        let config = Config::default();
        assert_eq!(config.conflicts.looser_severity, LooserSeverity::Warning);
        assert!(config.output.pretty);
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vera.yaml");
        std::fs::write(
            &path,
            "conflicts:\n  looser_severity: error\noutput:\n  pretty: false\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.conflicts.looser_severity, LooserSeverity::Error);
        assert!(!config.output.pretty);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vera.yaml");
        std::fs::write(&path, "output:\n  pretty: false\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.conflicts.looser_severity, LooserSeverity::Warning);
    }

    #[test]
    fn override_replaces_file_value() {
        let config = Config::default().with_looser_override(Some("ERROR")).unwrap();
        assert_eq!(config.conflicts.looser_severity, LooserSeverity::Error);
        let unchanged = Config::default().with_looser_override(None).unwrap();
        assert_eq!(unchanged, Config::default());
    }

    #[test]
    fn bad_override_is_rejected() {
        let err = Config::default()
            .with_looser_override(Some("fatal"))
            .unwrap_err();
        assert!(err.to_string().contains(LOOSER_SEVERITY_ENV));
    }

    #[test]
    fn unknown_severity_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vera.yaml");
        std::fs::write(&path, "conflicts:\n  looser_severity: loud\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
