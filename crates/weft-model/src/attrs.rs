#![forbid(unsafe_code)]

//! Loose attribute comparison.
//!
//! Collection lookup deliberately compares attribute values after string
//! normalization, so a numeric id `1` matches the string `"1"`. This keeps
//! values round-tripped through URLs, DOM datasets, and JSON payloads
//! interchangeable with their typed originals. It is a compatibility
//! choice, not an accident; use [`loose_eq`] wherever that behavior is
//! wanted and plain `==` on [`Value`] where it is not.

use serde_json::Value;

/// Render a value the way loose comparison sees it: strings without
/// quotes, everything else via its JSON text.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// String-normalizing equality: `loose_eq(&json!(1), &json!("1"))` holds.
#[must_use]
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    stringify(a) == stringify(b)
}

/// JS-style truthiness, used by the collection's presence filter for
/// plain [`Value`] members.
#[must_use]
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
