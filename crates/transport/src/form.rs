//! Flattening parameters into form / query pairs
//!
//! Nested values use bracket keys (`report[metrics][0]=pageviews`), the
//! layout analytics endpoints expect for form posts. `null` entries are
//! dropped; booleans become `1` / `0`.

use serde_json::Value;

use crate::Parameters;

/// Flatten parameters into ordered `(key, value)` pairs.
pub fn to_form_pairs(parameters: &Parameters) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in parameters {
        push_pairs(key.clone(), value, &mut pairs);
    }
    pairs
}

fn push_pairs(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                push_pairs(format!("{key}[{index}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (child, item) in map {
                push_pairs(format!("{key}[{child}]"), item, pairs);
            }
        }
    }
}
