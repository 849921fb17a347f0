//! Strips secrets out of event data before it is signed and stored.
//!
//! `password`, `api_key`, and `secret` keys are dropped outright; `token`
//! is kept but its value is replaced with the literal `[REDACTED]`, since
//! some consumers key off its presence. Applies recursively so nested
//! objects and arrays can't smuggle a secret past the top level.

use serde_json::Value;

const DROPPED_KEYS: [&str; 3] = ["password", "api_key", "secret"];
const REDACTED_KEY: &str = "token";
const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Sanitize event data in place before it becomes part of a signed entry.
#[must_use]
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                let lower = key.to_ascii_lowercase();
                if DROPPED_KEYS.contains(&lower.as_str()) {
                    continue;
                }
                if lower == REDACTED_KEY {
                    out.insert(key, Value::String(REDACTED_PLACEHOLDER.to_string()));
                    continue;
                }
                out.insert(key, sanitize(val));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}
