//! Content fingerprints for schema nodes.
//!
//! A schema's cache identity is the SHA-256 digest of its canonical JSON,
//! taken after following the node's top-level `$ref` chain. Two media types
//! that reference the same component, or that spell out an identical
//! definition inline, therefore share one fingerprint and one cache entry.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::document::Schema;
use crate::loader::navigate_fragment;

/// A 32-byte content digest identifying a schema definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint `schema`, resolving its top-level `$ref` chain against `root`.
    ///
    /// Never fails: a reference that does not resolve (or loops) is hashed as
    /// written, and the renderer reports the problem when the cache is built.
    pub fn of(schema: &Schema, root: &Value) -> Self {
        Self::of_value(resolve_top_level(schema.node(), root))
    }

    /// Fingerprint a raw value as-is.
    pub fn of_value(value: &Value) -> Self {
        let hash = Sha256::digest(canonical_bytes(value));
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn resolve_top_level<'a>(node: &'a Value, root: &'a Value) -> &'a Value {
    let mut current = node;
    let mut seen: Vec<&str> = Vec::new();
    while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
        // Sibling keywords change the definition, so the node stands on its own.
        if current.as_object().is_some_and(|m| m.len() > 1) {
            break;
        }
        if seen.contains(&reference) {
            break;
        }
        match navigate_fragment(root, reference) {
            Some(target) => {
                seen.push(reference);
                current = target;
            }
            None => break,
        }
    }
    current
}

/// Recursively sort object keys.
pub(crate) fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compact JSON with sorted keys.
pub(crate) fn canonical_bytes(value: &Value) -> Vec<u8> {
    // Serializing a `Value` cannot fail: keys are always strings.
    serde_json::to_vec(&canonicalize(value)).unwrap_or_default()
}
