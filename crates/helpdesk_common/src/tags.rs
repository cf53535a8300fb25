//! Tag decoding for AI analysis payloads
//!
//! The backend sends `tags` either as a JSON array or as a string holding a
//! serialized array (`"[\"FRAUD\",\"SCAM\"]"`). Anything else decodes to an
//! empty list; a bad tag field never fails the surrounding payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode a raw `tags` value into a list of tag names
pub fn parse_tags(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
        Value::String(text) => parse_tag_string(text),
        _ => Vec::new(),
    }
}

fn parse_tag_string(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        // One level only: a string that decodes to another string is junk.
        Ok(Value::Array(items)) => parse_tags(&Value::Array(items)),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::debug!("Unparseable tags {:?}: {}", trimmed, e);
            Vec::new()
        }
    }
}

/// `deserialize_with` adapter for tag fields
pub fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(parse_tags(&raw))
}
