//! # Canonical Hash Test Vectors
//!
//! Fixed input → canonical text → SHA-256 vectors. Any verifier that
//! recomputes stored hashes (audit store, export layer, external auditor)
//! must reproduce these byte-for-byte. If one of these tests fails, stored
//! effective policies and proof bundles can no longer be verified.

use serde_json::json;
use vera_core::{content_hash, sha256_digest, CanonicalBytes, Canonicalizer};

fn canonical_text(value: &serde_json::Value) -> String {
    let cb = Canonicalizer::standard()
        .canonical_bytes(value)
        .expect("canonicalization should succeed");
    String::from_utf8(cb.as_bytes().to_vec()).unwrap()
}

// ---------------------------------------------------------------------------
// Vector 1: key ordering only
// ---------------------------------------------------------------------------

#[test]
fn vector_simple_dict() {
    let data = json!({"b": 2, "a": 1, "c": "hello"});
    assert_eq!(canonical_text(&data), r#"{"a":1,"b":2,"c":"hello"}"#);
    assert_eq!(
        content_hash(&data).unwrap().to_hex(),
        "264be526dd59f5bed5c756e96e5a6a08f285ca424658f70b981f2554b4709121"
    );
}

// ---------------------------------------------------------------------------
// Vector 2: orderless array is sorted
// ---------------------------------------------------------------------------

#[test]
fn vector_orderless_blocked_actions() {
    let expected = "417903205df96efa9aa2e899297db1c35f8e2dfaded7ba2826e75a0759ac5790";
    for data in [
        json!({"blocked_actions": ["share", "export"]}),
        json!({"blocked_actions": ["export", "share"]}),
    ] {
        assert_eq!(canonical_text(&data), r#"{"blocked_actions":["export","share"]}"#);
        assert_eq!(content_hash(&data).unwrap().to_hex(), expected);
    }
}

// ---------------------------------------------------------------------------
// Vector 3: ordered array keeps its order, and order is committed
// ---------------------------------------------------------------------------

#[test]
fn vector_ordered_approval_chain() {
    let forward = json!({"approval_chain": ["legal", "medical"]});
    let reversed = json!({"approval_chain": ["medical", "legal"]});
    assert_eq!(
        content_hash(&forward).unwrap().to_hex(),
        "a2cb25d1fe947867593d94a887c23172e10305cfa1d9e50258fadcce76d365bc"
    );
    assert_eq!(
        content_hash(&reversed).unwrap().to_hex(),
        "801721bbeae332f4a8576cde7555d09ec19dae4e912f83fe97887ff7eb97383e"
    );
}

// ---------------------------------------------------------------------------
// Vector 4: nested registered set inside objects
// ---------------------------------------------------------------------------

#[test]
fn vector_nested_hitl_reviewers() {
    let data = json!({
        "min_approvals": 3,
        "controls": {"hitl": {"reviewers": ["medical_reviewer", "brand_lead"], "required": true}}
    });
    assert_eq!(
        canonical_text(&data),
        r#"{"controls":{"hitl":{"required":true,"reviewers":["brand_lead","medical_reviewer"]}},"min_approvals":3}"#
    );
    assert_eq!(
        content_hash(&data).unwrap().to_hex(),
        "5ee2a7d9e158044568a37a65786bd868765ac1525e5d92fd004097dad312db05"
    );
}

// ---------------------------------------------------------------------------
// Registry-free canonical form
// ---------------------------------------------------------------------------

#[test]
fn registry_free_form_keeps_every_array_order() {
    let data = json!({"blocked_actions": ["share", "export"]});
    let cb = CanonicalBytes::new(&data).unwrap();
    assert_eq!(cb.as_bytes(), br#"{"blocked_actions":["share","export"]}"#);
    assert_ne!(sha256_digest(&cb), content_hash(&data).unwrap());
}
