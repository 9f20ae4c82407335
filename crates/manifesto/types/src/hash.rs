//! Content hashing over canonical JSON.
//!
//! Object keys are sorted recursively before serialization so that two
//! deep-equal values always hash to the same digest regardless of map
//! insertion order. Every digest is domain-separated with a version prefix.

use serde_json::{Map, Value};

/// Domain prefix for world content addresses.
pub const WORLD_DOMAIN: &str = "manifesto-world-v1:";
/// Domain prefix for snapshot content hashes.
pub const SNAPSHOT_DOMAIN: &str = "manifesto-snapshot-v1:";
/// Domain prefix for intent keys.
pub const INTENT_DOMAIN: &str = "manifesto-intent-v1:";

/// Return a structurally identical value with all object keys sorted.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Hash a JSON value under a domain prefix, returning a lowercase hex digest.
pub fn hash_hex(domain: &str, value: &Value) -> String {
    let canonical = canonicalize(value).to_string();
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(canonical.as_bytes());
    hasher.finalize().to_hex().to_string()
}
