//! Canonical JSON encoding and seed hashing for idempotent workflow
//! preparation.
//!
//! Two seeds are considered the same workflow input exactly when their
//! canonical encodings are byte-equal: object keys are sorted
//! lexicographically at every level, and no insignificant whitespace is
//! emitted.

use sha2::{Digest, Sha256};

/// Encode a JSON value canonically: objects with keys in sorted order,
/// arrays and scalars in serde_json's compact form.
#[must_use]
pub fn canonical_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Compute the idempotency hash for a workflow seed: the first 16 hex
/// characters of SHA-256 over the canonical JSON encoding.
#[must_use]
pub fn seed_hash(seed: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(seed).as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_owned()
}
