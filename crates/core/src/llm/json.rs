use crate::domain::contract::Fields;
use serde_json::Value;

/// Strips a Markdown code fence by dropping the first and last line.
///
/// Only applies when the trimmed text starts with a fence marker and spans more than two lines;
/// anything else is returned trimmed but otherwise unchanged.
pub fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    // Two newlines means at least three lines.
    if trimmed.matches('\n').count() < 2 {
        return trimmed;
    }

    match (trimmed.find('\n'), trimmed.rfind('\n')) {
        (Some(first), Some(last)) => &trimmed[first + 1..last],
        _ => trimmed,
    }
}

/// Parses model output that should hold a single JSON object.
///
/// Never fails: malformed JSON, or JSON that is not an object, yields an empty map.
pub fn parse_object(text: &str) -> Fields {
    match serde_json::from_str::<Value>(strip_fence(text)) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!(kind = json_kind(&other), "model output is JSON but not an object");
            Fields::new()
        }
        Err(err) => {
            tracing::debug!(error = %err, "model output is not valid JSON");
            Fields::new()
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
