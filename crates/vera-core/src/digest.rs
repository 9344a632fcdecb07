//! # Content Digest: Hash Commitment
//!
//! Defines [`ContentDigest`] and [`DigestAlgorithm`], the hash commitment
//! applied to canonical bytes.
//!
//! ## Security Invariant
//!
//! `ContentDigest` can only be computed from [`CanonicalBytes`], so every
//! digest in the system is produced through the registry-aware
//! canonicalization pipeline. This is enforced by the signature of
//! [`sha256_digest()`].
//!
//! ## Wire form
//!
//! Digests serialize as `sha256:<64 lowercase hex>`, the same string
//! `Display` produces, so stored records are self-describing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::{CanonicalBytes, Canonicalizer};
use crate::error::{CanonicalizationError, VeraError};

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    /// SHA-256 over RFC 8785 canonical bytes.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a content digest from raw bytes and algorithm.
    ///
    /// Prefer [`sha256_digest()`] for computing digests.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse `sha256:<hex>` or bare 64-character hex.
    ///
    /// # Errors
    ///
    /// Returns [`VeraError::Integrity`] for an unknown algorithm prefix or
    /// malformed hex.
    pub fn parse(s: &str) -> Result<Self, VeraError> {
        let hex = match s.split_once(':') {
            Some(("sha256", rest)) => rest,
            Some((other, _)) => {
                return Err(VeraError::Integrity(format!(
                    "unsupported digest algorithm: {other}"
                )))
            }
            None => s,
        };
        if hex.len() != 64 {
            return Err(VeraError::Integrity(format!(
                "digest must be 64 hex characters, got {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(|| {
                VeraError::Integrity(format!("invalid hex at position {}", i * 2))
            })?;
            *byte = u8::from_str_radix(pair, 16).map_err(|e| {
                VeraError::Integrity(format!("invalid hex at position {}: {e}", i * 2))
            })?;
        }
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl std::str::FromStr for ContentDigest {
    type Err = VeraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = VeraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> String {
        digest.to_string()
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`, so no code path can
/// hash non-canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// `hash(value)`: canonicalize with the standard registry, serialize, digest.
///
/// # Errors
///
/// Propagates canonicalization failures (floats, serialization).
pub fn content_hash(obj: &impl Serialize) -> Result<ContentDigest, CanonicalizationError> {
    let canonical = Canonicalizer::standard().canonical_bytes(obj)?;
    Ok(sha256_digest(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_digest_deterministic() {
        let cb = CanonicalBytes::new(&json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(sha256_digest(&cb), sha256_digest(&cb));
    }

    #[test]
    fn known_sha256_vector() {
        // SHA-256("{}")
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        assert_eq!(
            sha256_hex(&cb),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn display_has_algorithm_prefix() {
        let digest = content_hash(&json!({"a": 1})).unwrap();
        let s = digest.to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn parse_round_trips_display() {
        let digest = content_hash(&json!({"min_approvals": 3})).unwrap();
        let parsed = ContentDigest::parse(&digest.to_string()).unwrap();
        assert_eq!(parsed, digest);
        let bare = ContentDigest::parse(&digest.to_hex()).unwrap();
        assert_eq!(bare, digest);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(ContentDigest::parse("md5:abcd").is_err());
        assert!(ContentDigest::parse("sha256:zz").is_err());
        assert!(ContentDigest::parse(&"g".repeat(64)).is_err());
    }

    #[test]
    fn serializes_as_prefixed_string() {
        let digest = content_hash(&json!({})).unwrap();
        let json = serde_json::to_value(&digest).unwrap();
        assert_eq!(
            json,
            json!("sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a")
        );
    }

    #[test]
    fn key_order_does_not_change_hash() {
        let a = content_hash(&json!({"a": 1, "b": 2})).unwrap();
        let b = content_hash(&json!({"b": 2, "a": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ordered_swap_changes_hash() {
        let a = content_hash(&json!({"approval_chain": ["legal", "medical"]})).unwrap();
        let b = content_hash(&json!({"approval_chain": ["medical", "legal"]})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn value_change_changes_hash() {
        let a = content_hash(&json!({"min_approvals": 3})).unwrap();
        let b = content_hash(&json!({"min_approvals": 4})).unwrap();
        assert_ne!(a, b);
    }
}
