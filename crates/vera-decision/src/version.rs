//! Lenient semantic-version parsing for tool versions.
//!
//! Tools report versions inconsistently (`v6.1`, `6`, `6.1.0-beta.2`). A
//! leading `v` is dropped and missing minor/patch components are padded
//! with zero before handing the string to `semver`. Anything else that
//! `semver` rejects is not a version.

use semver::{Version, VersionReq};

/// Parse a tool version, returning `None` if it is not a version.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let s = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    let split = s.find(|c| c == '-' || c == '+').unwrap_or(s.len());
    let (core, suffix) = s.split_at(split);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    Version::parse(&padded).ok()
}

/// Parse a version requirement such as `>=5.0.0, <7.0.0`.
pub fn parse_requirement(raw: &str) -> Option<VersionReq> {
    VersionReq::parse(raw.trim()).ok()
}
