//! What the CLI prints on stdout

use common::to_pretty_json;
use serde_json::Value;

/// Render an API response body: a JSON string prints bare, objects and arrays
/// pretty-printed, anything else verbatim.
pub fn render_response(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(value @ (Value::Object(_) | Value::Array(_))) => pretty(&value),
        _ => body.trim_end().to_string(),
    }
}

/// `Token: ` followed by the pretty-printed token response.
pub fn render_token(payload: &Value) -> String {
    format!("Token: {}", pretty(payload))
}

fn pretty(value: &Value) -> String {
    to_pretty_json(value).unwrap_or_else(|_| value.to_string())
}
