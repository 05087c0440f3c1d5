//! Canonical content hashing for row comparison
//!
//! Rows are compared by a SHA-256 digest of a canonical serialization in which
//! object keys are sorted at every depth. Two values that differ only in key
//! order therefore hash identically, whatever map ordering serde_json was
//! built with.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize `value` as compact JSON with object keys sorted recursively
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Keys go through Value's Display to get JSON string escaping
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
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

/// Hex-encoded SHA-256 of the canonical serialization
pub fn content_hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether two values have the same content hash
pub fn content_equal(a: &Value, b: &Value) -> bool {
    content_hash(a) == content_hash(b)
}
