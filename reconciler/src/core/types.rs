//! Shared deterministic types for the reconciliation core.
//!
//! These mirror the suggestion frames sent by the remote correction service,
//! reduced to the pieces that describe edits. They carry no I/O state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded message from the frame stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Service-assigned id, when the frame carries one.
    pub message_id: Option<String>,
    pub frame: SuggestionFrame,
}

/// Classification of a decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionFrame {
    /// Keep-alive or bookkeeping message with nothing to apply.
    Progress,
    /// Final message of a session.
    Terminal {
        /// Outcome scores reported by the service (may be empty for `TOO_SMALL`).
        scores: Map<String, Value>,
        /// Raw `scoresStatus` value, if present.
        status: Option<String>,
    },
    /// Edit tree; may decode to zero usable rows.
    SuggestionTree { rows: Vec<Row> },
}

/// One child of the `default-suggestion` view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    /// Component type (`"column"` rows carry edit groups).
    pub kind: String,
    pub groups: Vec<Group>,
}

impl Row {
    pub const EDIT_KIND: &'static str = "column";

    pub fn carries_edits(&self) -> bool {
        self.kind == Self::EDIT_KIND
    }
}

/// Left/right subsets of one row child. `left` has priority.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    pub left: Vec<SubsetEntry>,
    pub right: Vec<SubsetEntry>,
}

/// One entry of a left/right subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsetEntry {
    Block { parts: Vec<TextSegment> },
    /// Only the top-ranked alternative's preview parts are kept.
    AlternativeChoice { best_preview_parts: Vec<TextSegment> },
    /// Any other entry type; contributes no segments.
    Other { kind: String },
}

impl SubsetEntry {
    pub fn segments(&self) -> &[TextSegment] {
        match self {
            SubsetEntry::Block { parts } => parts,
            SubsetEntry::AlternativeChoice { best_preview_parts } => best_preview_parts,
            SubsetEntry::Other { .. } => &[],
        }
    }
}

/// A text fragment ("part") of a suggestion preview.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSegment {
    pub text: String,
    #[serde(rename = "meta", with = "label_meta")]
    pub operation_label: String,
    #[serde(rename = "textColor")]
    pub color_tag: String,
    #[serde(rename = "format")]
    pub format_tags: Vec<String>,
}

/// Which subset of a group a correction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Ordered segments of one subset entry, plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionGroup {
    pub row: usize,
    pub group: usize,
    pub side: Side,
    pub segments: Vec<TextSegment>,
}

/// `{"meta": {"label": "..."}}` flattened into a plain label string.
mod label_meta {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Meta {
        label: Option<String>,
    }

    pub fn serialize<S: Serializer>(label: &str, serializer: S) -> Result<S::Ok, S::Error> {
        Meta {
            label: Some(label.to_string()),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let meta = Option::<Meta>::deserialize(deserializer)?;
        Ok(meta.and_then(|meta| meta.label).unwrap_or_default())
    }
}
