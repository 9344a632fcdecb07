//! # Canonical Serialization: Registry-Aware JCS Byte Production
//!
//! This module defines [`Canonicalizer`] and [`CanonicalBytes`], the sole
//! construction path for bytes used in digest computation anywhere in the
//! governance core.
//!
//! ## Security Invariant
//!
//! `CanonicalBytes` has a private inner field. The only ways to construct it
//! are [`CanonicalBytes::new()`] and [`Canonicalizer::canonical_bytes()`],
//! both of which run the full pipeline:
//!
//! 1. **Reject floats.** Thresholds and counts must be integers. Floats have
//!    non-deterministic cross-language serialization edge cases.
//! 2. **Sort object keys** lexicographically.
//! 3. **Recurse into arrays.** Each element is canonicalized at the array's
//!    own (index-free) path.
//! 4. **Sort orderless arrays** by the serialized text of their canonical
//!    elements, but only where the [`FieldRegistry`] marks the path
//!    orderless. Every other array keeps its order exactly.
//! 5. **Serialize** with `serde_jcs` (RFC 8785): sorted keys, no
//!    whitespace, UTF-8.
//!
//! `null` passes through unchanged.
//!
//! ## Cross-System Contract
//!
//! This is the one bit-exact contract the core owns. Any verifier (audit
//! store, export layer, external auditor) must reproduce steps 1-5 exactly
//! to recompute a stored hash.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;
use crate::path::{FieldPath, PathSegment};
use crate::registry::FieldRegistry;

/// Bytes produced exclusively by registry-aware JCS canonicalization.
///
/// # Invariants
///
/// - Constructed only through this module's pipeline.
/// - Contains no floats.
/// - Object keys are sorted; orderless arrays are sorted; ordered arrays are
///   untouched.
/// - Serialization is compact RFC 8785 output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value without registry semantics
    /// (keys sorted, no array reordered).
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains
    /// a non-integer number, `SerializationFailed` if serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        Canonicalizer::unregistered().canonical_bytes(obj)
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursive normalizer bound to a field registry.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer<'r> {
    registry: &'r FieldRegistry,
}

impl Canonicalizer<'static> {
    /// Canonicalizer over the shared standard registry.
    pub fn standard() -> Self {
        Self {
            registry: FieldRegistry::standard(),
        }
    }

    /// Canonicalizer with no registered paths. No array is orderless, so
    /// the output depends only on key ordering.
    pub fn unregistered() -> Self {
        static EMPTY: FieldRegistry = FieldRegistry::empty();
        Self { registry: &EMPTY }
    }
}

impl<'r> Canonicalizer<'r> {
    /// Canonicalizer over a caller-supplied registry.
    pub fn with_registry(registry: &'r FieldRegistry) -> Self {
        Self { registry }
    }

    /// The registry this canonicalizer consults.
    pub fn registry(&self) -> &'r FieldRegistry {
        self.registry
    }

    /// Normalize `value`, treating it as located at `path`.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` on non-integer numbers.
    pub fn canonicalize(
        &self,
        value: Value,
        path: &FieldPath,
    ) -> Result<Value, CanonicalizationError> {
        let mut keys: Vec<String> = path
            .segments()
            .iter()
            .filter_map(|s| match s {
                PathSegment::Key(k) => Some(k.clone()),
                PathSegment::Index(_) => None,
            })
            .collect();
        self.normalize(value, &mut keys)
    }

    /// Canonicalize and serialize a value located at the document root.
    ///
    /// # Errors
    ///
    /// See [`Canonicalizer::canonicalize`].
    pub fn canonical_bytes(
        &self,
        obj: &impl Serialize,
    ) -> Result<CanonicalBytes, CanonicalizationError> {
        self.canonical_bytes_at(obj, &FieldPath::root())
    }

    /// Canonicalize and serialize a value located at `path`.
    ///
    /// # Errors
    ///
    /// See [`Canonicalizer::canonicalize`].
    pub fn canonical_bytes_at(
        &self,
        obj: &impl Serialize,
        path: &FieldPath,
    ) -> Result<CanonicalBytes, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let normalized = self.canonicalize(value, path)?;
        Ok(CanonicalBytes(serialize_canonical(&normalized)?))
    }

    fn normalize(
        &self,
        value: Value,
        keys: &mut Vec<String>,
    ) -> Result<Value, CanonicalizationError> {
        match value {
            Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
            Value::Number(ref n) => {
                if n.is_f64() && !n.is_i64() && !n.is_u64() {
                    if let Some(f) = n.as_f64() {
                        return Err(CanonicalizationError::FloatRejected(f));
                    }
                }
                Ok(value)
            }
            Value::Object(map) => {
                let mut entries: Vec<(String, Value)> = map.into_iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                let mut out = serde_json::Map::new();
                for (k, v) in entries {
                    keys.push(k);
                    let normalized = self.normalize(v, keys);
                    let k = keys.pop().unwrap_or_default();
                    out.insert(k, normalized?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                // Elements share the array's index-free path.
                let normalized: Vec<Value> = items
                    .into_iter()
                    .map(|item| self.normalize(item, keys))
                    .collect::<Result<_, _>>()?;
                let orderless = self
                    .registry
                    .directive_for_keys(keys)
                    .is_some_and(|d| d.is_orderless());
                if !orderless {
                    return Ok(Value::Array(normalized));
                }
                let mut keyed: Vec<(String, Value)> = normalized
                    .into_iter()
                    .map(|v| Ok((serde_jcs::to_string(&v)?, v)))
                    .collect::<Result<_, serde_json::Error>>()?;
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(Value::Array(keyed.into_iter().map(|(_, v)| v).collect()))
            }
        }
    }
}

/// Serialize a normalized value in RFC 8785 form.
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_value_no_floats() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,20}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_]{1,10}", inner, 0..8)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        /// Canonicalization is deterministic and never fails on float-free input.
        #[test]
        fn canonical_bytes_deterministic(value in json_value_no_floats()) {
            let c = Canonicalizer::standard();
            let a = c.canonical_bytes(&value).unwrap();
            let b = c.canonical_bytes(&value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        /// Canonicalization is idempotent: re-canonicalizing the output is a no-op.
        #[test]
        fn canonicalization_idempotent(value in json_value_no_floats()) {
            let c = Canonicalizer::standard();
            let once = c.canonical_bytes(&value).unwrap();
            let reparsed: Value = serde_json::from_slice(once.as_bytes()).unwrap();
            let twice = c.canonical_bytes(&reparsed).unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Any permutation of an orderless field canonicalizes identically.
        #[test]
        fn orderless_permutation_invariant(
            mut items in prop::collection::vec("[a-z]{1,6}", 0..10),
            seed in any::<u64>(),
        ) {
            let c = Canonicalizer::standard();
            let original = serde_json::json!({"blocked_actions": items.clone()});
            let n = items.len();
            if n > 1 {
                items.rotate_left((seed as usize) % n);
            }
            let permuted = serde_json::json!({"blocked_actions": items});
            prop_assert_eq!(
                c.canonical_bytes(&original).unwrap(),
                c.canonical_bytes(&permuted).unwrap()
            );
        }
    }
}
