//! Query fingerprinting
//!
//! A [`CacheKey`] is the SHA-256 digest of a versioned canonical JSON document
//! built from exactly three normalized fields: the question, the requested
//! result count and the document filter. Nothing else about a request (or the
//! shape of the cached payload) influences the key.

use crate::cache::types::DocumentId;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Version tag embedded in the canonical serialization
pub const KEY_FORMAT_VERSION: u32 = 1;

/// Fixed-length fingerprint of a normalized query
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Fingerprint a query
    pub fn from_query(question: &str, top_k: usize, paper_ids: Option<&[DocumentId]>) -> Self {
        let canonical = canonical_form(question, top_k, paper_ids);
        let digest = Sha256::digest(canonical.as_bytes());

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.short())
    }
}

/// Compute the cache key for a query
///
/// Equivalent to [`CacheKey::from_query`]. Never fails: any string is a valid
/// question, including the empty string. Callers are expected to reject a zero
/// `top_k` before getting here.
pub fn normalize(question: &str, top_k: usize, paper_ids: Option<&[DocumentId]>) -> CacheKey {
    CacheKey::from_query(question, top_k, paper_ids)
}

/// Case-fold a question and collapse every whitespace run to a single space
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Sort and de-duplicate a document filter; an empty filter means no filter
pub fn normalize_filter(paper_ids: Option<&[DocumentId]>) -> Option<Vec<DocumentId>> {
    let mut ids = paper_ids?.to_vec();
    if ids.is_empty() {
        return None;
    }
    ids.sort_unstable();
    ids.dedup();
    Some(ids)
}

/// Canonical serialization hashed into the key
///
/// Fields are sorted through a `BTreeMap` before they reach the JSON object, so
/// the output is the same whether or not `serde_json` preserves insertion order.
fn canonical_form(question: &str, top_k: usize, paper_ids: Option<&[DocumentId]>) -> String {
    let fields: BTreeMap<&str, Value> = BTreeMap::from([
        ("v", json!(KEY_FORMAT_VERSION)),
        ("question", json!(normalize_question(question))),
        ("top_k", json!(top_k)),
        ("paper_ids", json!(normalize_filter(paper_ids))),
    ]);
    let object: Map<String, Value> = fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    Value::Object(object).to_string()
}
