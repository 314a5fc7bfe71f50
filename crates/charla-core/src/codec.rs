//! Durable wire form for turn histories.
//!
//! Histories are persisted as a JSON array of `{"role", "content"}` objects.
//! Decoding is defensive: some storage layers hand back the array already
//! parsed, others hand back a string that still needs a JSON pass, and a few
//! drivers double-encode on the way in. All three shapes decode to the same
//! turn sequence.

use serde_json::Value;

use crate::turns::{Role, Turn};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed history: {0}")]
    Malformed(String),

    #[error("history entry {index} missing field `{field}`")]
    MissingField { index: usize, field: &'static str },
}

/// Deterministic, lossless serialization of a turn sequence.
pub fn encode(turns: &[Turn]) -> String {
    // Turn's serde derive produces exactly the wire form; Vec<Turn> cannot
    // fail to serialize.
    serde_json::to_string(turns).unwrap_or_else(|_| "[]".to_owned())
}

/// Decode a serialized history string.
pub fn decode_str(raw: &str) -> Result<Vec<Turn>, CodecError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| CodecError::Malformed(e.to_string()))?;
    decode_value(value)
}

/// Decode an already-parsed JSON value.
///
/// Accepts the structured array form and the double-encoded string form.
pub fn decode_value(value: Value) -> Result<Vec<Turn>, CodecError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::String(inner) => {
            let reparsed: Value = serde_json::from_str(&inner)
                .map_err(|e| CodecError::Malformed(format!("nested string: {e}")))?;
            match reparsed {
                Value::Array(entries) => entries,
                other => {
                    return Err(CodecError::Malformed(format!(
                        "expected array, got {}",
                        type_name(&other)
                    )))
                }
            }
        }
        other => {
            return Err(CodecError::Malformed(format!(
                "expected array, got {}",
                type_name(&other)
            )))
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| decode_entry(index, entry))
        .collect()
}

fn decode_entry(index: usize, entry: Value) -> Result<Turn, CodecError> {
    let role_str = entry
        .get("role")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingField {
            index,
            field: "role",
        })?;
    let content = entry
        .get("content")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingField {
            index,
            field: "content",
        })?;

    // Unknown role strings are normalized to user rather than rejected, so a
    // record written by an older deployment never bricks the conversation.
    let role = role_str.parse::<Role>().unwrap_or(Role::User);

    Ok(Turn {
        role,
        content: content.to_owned(),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
