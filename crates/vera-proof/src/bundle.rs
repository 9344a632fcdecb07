//! # Proof Bundle Compiler
//!
//! A proof bundle is the minimal, tamper-evident record of one decision:
//! which tool, which actor role, which action, under which tenant and
//! policy snapshot, and what the verdict was.
//!
//! ## Data Minimization Invariant
//!
//! Items come only from the fixed extraction schema ([`SCHEMA_KEYS`]) plus
//! caller extras. The compiler never reads [`UsageEvent::content`], so
//! prompts, generated text, and asset references cannot leak into a bundle.
//!
//! ## Integrity
//!
//! The item list is hashed as a JSON array of `{"key", "value"}` objects,
//! canonicalized without a field registry (item order is part of the
//! commitment) and digested with SHA-256. The bundle id is a correlation id
//! only and never enters the hash.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use vera_core::{sha256_digest, Canonicalizer, ContentDigest, PolicySnapshotId, TenantId};
use vera_decision::{UsageEvent, Verdict};

use crate::error::ProofError;

/// Extraction schema keys, in bundle order.
pub const SCHEMA_KEYS: [&str; 15] = [
    "tool.id",
    "tool.name",
    "tool.version",
    "actor.role",
    "action.kind",
    "context.tenant_id",
    "context.enterprise_id",
    "context.brand",
    "context.region",
    "context.channel",
    "context.policy_snapshot_id",
    "verdict.status",
    "verdict.reason",
    "verdict.rule_id",
    "verdict.policy_snapshot_id",
];

// ── Identifiers ────────────────────────────────────────────────────────

/// Correlation id of a proof bundle. Not a cryptographic commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleId(Uuid);

impl BundleId {
    /// Create a new random bundle identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BundleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proof-bundle:{}", self.0)
    }
}

// ── Evidence Items ─────────────────────────────────────────────────────

/// One `(key, value)` evidence entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Schema key or caller extra key.
    pub key: String,
    /// Extracted value.
    pub value: Value,
}

impl EvidenceItem {
    fn new(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

/// Outcome of recomputing a bundle's integrity hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IntegrityCheck {
    /// The stored hash matches the items.
    Intact,
    /// The items no longer hash to the stored value.
    Mismatch {
        /// The stored hash.
        expected: ContentDigest,
        /// The recomputed hash.
        actual: ContentDigest,
    },
    /// The items cannot be canonicalized at all (e.g. a float was
    /// injected), so they cannot match any stored hash.
    Unhashable {
        /// Canonicalization failure detail.
        reason: String,
    },
}

impl IntegrityCheck {
    /// True for [`IntegrityCheck::Intact`].
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact)
    }
}

// ── Proof Bundle ───────────────────────────────────────────────────────

/// Minimal-disclosure evidence of one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofBundle {
    /// Correlation id.
    pub bundle_id: BundleId,
    /// Partner tenant of the event.
    pub tenant_id: TenantId,
    /// Policy snapshot the decision was made under.
    pub policy_snapshot_id: PolicySnapshotId,
    /// Evidence items in schema order, then extras by key.
    pub items: Vec<EvidenceItem>,
    /// SHA-256 over the canonical item list.
    pub integrity_hash: ContentDigest,
}

impl ProofBundle {
    /// Value of an item by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.iter().find(|i| i.key == key).map(|i| &i.value)
    }

    /// Item keys in bundle order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.key.as_str())
    }

    /// Recompute the integrity hash and compare. Never raises.
    pub fn verify(&self) -> IntegrityCheck {
        match hash_items(&self.items) {
            Ok(actual) if actual == self.integrity_hash => IntegrityCheck::Intact,
            Ok(actual) => {
                tracing::warn!(bundle = %self.bundle_id, expected = %self.integrity_hash, actual = %actual, "proof bundle hash mismatch");
                IntegrityCheck::Mismatch {
                    expected: self.integrity_hash.clone(),
                    actual,
                }
            }
            Err(e) => {
                tracing::warn!(bundle = %self.bundle_id, error = %e, "proof bundle items cannot be canonicalized");
                IntegrityCheck::Unhashable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Like [`verify`](Self::verify), but as a `Result` for `?` chains.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::IntegrityViolation`] on mismatch and
    /// [`ProofError::Canonicalization`] if the items cannot be hashed.
    pub fn verify_integrity(&self) -> Result<(), ProofError> {
        let actual = hash_items(&self.items)?;
        if actual != self.integrity_hash {
            return Err(ProofError::IntegrityViolation {
                bundle_id: self.bundle_id.to_string(),
                expected: self.integrity_hash.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(())
    }
}

/// Digest of an item list.
///
/// # Errors
///
/// Propagates canonicalization failures.
pub fn hash_items(items: &[EvidenceItem]) -> Result<ContentDigest, ProofError> {
    let bytes = Canonicalizer::unregistered().canonical_bytes(&items)?;
    Ok(sha256_digest(&bytes))
}

/// `compile(event, verdict, extra)` with a freshly minted bundle id.
///
/// # Errors
///
/// See [`compile_with_id`].
pub fn compile(
    event: &UsageEvent,
    verdict: &Verdict,
    extra: &BTreeMap<String, Value>,
) -> Result<ProofBundle, ProofError> {
    compile_with_id(BundleId::new(), event, verdict, extra)
}

/// Compile a bundle under a caller-supplied id.
///
/// # Errors
///
/// - [`ProofError::SnapshotMismatch`] if the verdict and event name
///   different policy snapshots.
/// - [`ProofError::ReservedKey`] if an extra reuses a schema key.
/// - [`ProofError::Canonicalization`] if an extra value cannot be
///   canonicalized.
pub fn compile_with_id(
    bundle_id: BundleId,
    event: &UsageEvent,
    verdict: &Verdict,
    extra: &BTreeMap<String, Value>,
) -> Result<ProofBundle, ProofError> {
    let ctx = &event.context;
    if verdict.policy_snapshot_id != ctx.policy_snapshot_id {
        return Err(ProofError::SnapshotMismatch {
            event: ctx.policy_snapshot_id.clone(),
            verdict: verdict.policy_snapshot_id.clone(),
        });
    }
    if let Some(key) = extra.keys().find(|k| SCHEMA_KEYS.contains(&k.as_str())) {
        return Err(ProofError::ReservedKey(key.clone()));
    }

    let mut items = vec![
        EvidenceItem::new("tool.id", event.tool.id.as_str()),
        EvidenceItem::new("tool.name", event.tool.name.as_str()),
        EvidenceItem::new("tool.version", event.tool.version.as_str()),
        EvidenceItem::new("actor.role", event.actor.role.as_str()),
        EvidenceItem::new("action.kind", event.action.kind.as_str()),
        EvidenceItem::new("context.tenant_id", ctx.tenant_id.as_str()),
        EvidenceItem::new("context.enterprise_id", ctx.enterprise_id.as_str()),
    ];
    let optional = [
        ("context.brand", &ctx.brand),
        ("context.region", &ctx.region),
        ("context.channel", &ctx.channel),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            items.push(EvidenceItem::new(key, v.as_str()));
        }
    }
    items.push(EvidenceItem::new(
        "context.policy_snapshot_id",
        ctx.policy_snapshot_id.as_str(),
    ));
    items.push(EvidenceItem::new("verdict.status", verdict.status.as_str()));
    items.push(EvidenceItem::new("verdict.reason", verdict.reason.as_str()));
    if let Some(rule_id) = &verdict.rule_id {
        items.push(EvidenceItem::new("verdict.rule_id", rule_id.as_str()));
    }
    items.push(EvidenceItem::new(
        "verdict.policy_snapshot_id",
        verdict.policy_snapshot_id.as_str(),
    ));
    items.extend(extra.iter().map(|(k, v)| EvidenceItem {
        key: k.clone(),
        value: v.clone(),
    }));

    let integrity_hash = hash_items(&items)?;
    tracing::info!(
        bundle = %bundle_id,
        tenant = %ctx.tenant_id,
        items = items.len(),
        hash = %integrity_hash,
        "proof bundle compiled"
    );

    Ok(ProofBundle {
        bundle_id,
        tenant_id: ctx.tenant_id.clone(),
        policy_snapshot_id: ctx.policy_snapshot_id.clone(),
        items,
        integrity_hash,
    })
}
