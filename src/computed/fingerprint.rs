//! Content fingerprints for computed artifact inputs
//!
//! Two inputs with the same logical content (regardless of object key order
//! or which instance carries it) produce the same fingerprint. Numbers are
//! compared by value, so `1` and `1.0` share a fingerprint.

use serde::Serialize;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Integers beyond this are not exactly representable as `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integral floats are written as integers, `-0.0` as `0`
fn canonical_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
                return (f as i64).to_string();
            }
        }
    }
    n.to_string()
}

/// Serialize a JSON value canonically: sorted object keys, no whitespace
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => canonical_number(n),
        Value::String(s) => Value::String(s.clone()).to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// SHA-256 hex digest of the canonical serialization of `input`
pub fn fingerprint<T: Serialize + ?Sized>(input: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(input)?;
    let canonical = to_canonical_json(&value);
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}
