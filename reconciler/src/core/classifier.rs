//! Frame classification: raw message text into a [`DecodedFrame`].
//!
//! The service sends a schema-less, deeply nested JSON document. Every level
//! is looked up explicitly and a missing or mistyped level only drops that
//! element; the whole frame fails only when it is not a JSON object at all.

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::core::types::{DecodedFrame, Group, Row, SubsetEntry, SuggestionFrame, TextSegment};
use crate::error::ReconcileError;

/// JSON pointer to the rows of the default suggestion view.
pub const SUGGESTION_ROWS_POINTER: &str = "/sdui/child/child/views/default-suggestion/children";

/// Classify one raw frame.
///
/// Bytes that are not valid UTF-8 JSON are a decode error, like any other
/// malformed frame.
///
/// - `Terminal` if `outcomeScores` is a non-empty object or `scoresStatus`
///   equals `too_small_status`.
/// - `SuggestionTree` if the suggestion view has a non-empty row list.
/// - `Progress` otherwise.
pub fn classify_frame(
    raw: impl AsRef<[u8]>,
    too_small_status: &str,
) -> Result<DecodedFrame, ReconcileError> {
    let value: Value =
        serde_json::from_slice(raw.as_ref()).map_err(|err| ReconcileError::Decode {
            reason: err.to_string(),
        })?;
    let Some(root) = value.as_object() else {
        return Err(ReconcileError::Decode {
            reason: format!("expected a JSON object, got {}", json_kind(&value)),
        });
    };

    let message_id = root.get("messageId").and_then(|id| match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    });

    let scores = root
        .get("outcomeScores")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let status = root
        .get("scoresStatus")
        .and_then(Value::as_str)
        .map(str::to_string);

    let frame = if !scores.is_empty() || status.as_deref() == Some(too_small_status) {
        SuggestionFrame::Terminal { scores, status }
    } else if let Some(rows) = decode_rows(&value) {
        SuggestionFrame::SuggestionTree { rows }
    } else {
        SuggestionFrame::Progress
    };

    Ok(DecodedFrame { message_id, frame })
}

fn decode_rows(root: &Value) -> Option<Vec<Row>> {
    let children = root.pointer(SUGGESTION_ROWS_POINTER)?.as_array()?;
    if children.is_empty() {
        return None;
    }
    Some(children.iter().map(decode_row).collect())
}

fn decode_row(value: &Value) -> Row {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let groups = value
        .get("children")
        .and_then(Value::as_array)
        .map(|children| children.iter().map(decode_group).collect())
        .unwrap_or_default();
    Row { kind, groups }
}

fn decode_group(value: &Value) -> Group {
    Group {
        left: decode_entries(value.get("left")),
        right: decode_entries(value.get("right")),
    }
}

fn decode_entries(value: Option<&Value>) -> Vec<SubsetEntry> {
    value
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(decode_entry).collect())
        .unwrap_or_default()
}

fn decode_entry(value: &Value) -> Option<SubsetEntry> {
    let entry = value.as_object()?;
    let kind = entry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let resolved = match kind {
        "block" => SubsetEntry::Block {
            parts: decode_parts(entry.get("parts")),
        },
        "alternativeChoice" => {
            let best = entry
                .get("alternatives")
                .and_then(Value::as_array)
                .and_then(|alternatives| alternatives.first())
                .and_then(|alternative| alternative.pointer("/preview/parts"));
            SubsetEntry::AlternativeChoice {
                best_preview_parts: decode_parts(best),
            }
        }
        other => SubsetEntry::Other {
            kind: other.to_string(),
        },
    };
    Some(resolved)
}

fn decode_parts(value: Option<&Value>) -> Vec<TextSegment> {
    let Some(parts) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    parts
        .iter()
        .filter_map(|part| match TextSegment::deserialize(part) {
            Ok(segment) => Some(segment),
            Err(err) => {
                trace!(error = %err, "dropping undecodable part");
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
