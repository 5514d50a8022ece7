//! Human-readable JSON rendering
//!
//! Used both for rewriting the profile file and for printing command output,
//! so the two always agree on layout: two-space indentation, keys in
//! insertion order, trailing newline omitted.

use serde::Serialize;

/// Render any serializable value as indented JSON.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
