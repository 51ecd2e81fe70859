//! Pattern building: one correction group into an anchored match pattern and
//! its replacement text.
//!
//! Suggestion previews carry no character offsets. Unchanged ("context")
//! parts anchor the match, and the gaps between anchors are non-greedy
//! wildcards that absorb whatever the edit parts touch in the live text.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::cache::PatternCache;
use crate::core::types::{CorrectionGroup, TextSegment};
use crate::error::ReconcileError;

/// Gap inserted between consecutive anchors.
pub const WILDCARD: &str = "(.*?)";

/// How context text becomes pattern source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    /// Context text is used as raw pattern syntax; unescaped metacharacters
    /// in it can make the group fail to compile.
    #[default]
    Pattern,
    /// Context text is escaped and matched literally.
    Literal,
}

/// Substitute for `insert line break` parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineBreakPolicy {
    #[default]
    Newline,
    Space,
    Drop,
}

impl LineBreakPolicy {
    pub fn substitute(self) -> &'static str {
        match self {
            LineBreakPolicy::Newline => "\n",
            LineBreakPolicy::Space => " ",
            LineBreakPolicy::Drop => "",
        }
    }
}

/// Inputs to pattern building that come from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternOptions {
    pub context_color: String,
    pub ellipsis_markers: Vec<String>,
    pub anchor_mode: AnchorMode,
    pub line_break: String,
}

/// Edit kind named by a part's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditLabel {
    LineBreak,
    Insert,
    Delete,
}

/// Case-insensitive prefix match against the label grammar.
pub fn parse_label(label: &str) -> Option<EditLabel> {
    let label = label.to_lowercase();
    if label.starts_with("insert line break") {
        Some(EditLabel::LineBreak)
    } else if label.starts_with("insert ") {
        Some(EditLabel::Insert)
    } else if label.starts_with("delete ") || label.starts_with("remove ") {
        Some(EditLabel::Delete)
    } else {
        None
    }
}

/// What a segment contributes to the pattern and the replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    /// Unchanged text: anchors the match and is kept in the replacement.
    Context,
    LineBreak,
    Insert,
    Delete,
    /// Unlabeled whitespace between parts, re-emitted verbatim.
    Passthrough,
    /// Unknown label or unlabeled text of another colour.
    Ignored,
}

pub fn segment_role(segment: &TextSegment, options: &PatternOptions) -> SegmentRole {
    if segment.operation_label.is_empty() {
        if segment.text != " " && segment.color_tag == options.context_color {
            SegmentRole::Context
        } else if !segment.text.is_empty() && segment.text.trim().is_empty() {
            SegmentRole::Passthrough
        } else {
            SegmentRole::Ignored
        }
    } else {
        match parse_label(&segment.operation_label) {
            Some(EditLabel::LineBreak) => SegmentRole::LineBreak,
            Some(EditLabel::Insert) => SegmentRole::Insert,
            Some(EditLabel::Delete) => SegmentRole::Delete,
            None => SegmentRole::Ignored,
        }
    }
}

/// Uncompiled result of pattern building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionPlan {
    pub pattern_source: String,
    pub replacement: String,
    /// Inserted text keyed by label.
    pub insertions: BTreeMap<String, String>,
    /// Deleted text keyed by label.
    pub deletions: BTreeMap<String, String>,
}

/// A plan with its compiled pattern.
#[derive(Debug, Clone)]
pub struct Correction {
    pub plan: CorrectionPlan,
    pub pattern: Regex,
}

/// Build the pattern source and replacement for one group.
///
/// Returns `None` when the group has no usable context anchor.
pub fn build_plan(group: &CorrectionGroup, options: &PatternOptions) -> Option<CorrectionPlan> {
    let segments = &group.segments;
    let mut pattern_source = String::new();
    let mut anchor_len = 0usize;
    let mut replacement = String::new();
    let mut insertions = BTreeMap::new();
    let mut deletions = BTreeMap::new();

    for (index, segment) in segments.iter().enumerate() {
        match segment_role(segment, options) {
            SegmentRole::Context => {
                let text = strip_markers(&segment.text, &options.ellipsis_markers);
                anchor_len += text.len();
                match options.anchor_mode {
                    AnchorMode::Literal => pattern_source.push_str(&regex::escape(&text)),
                    AnchorMode::Pattern => pattern_source.push_str(&text),
                }
                // The final two positions are joined without a gap so the match
                // cannot run past the right-hand anchor.
                if index + 2 < segments.len() {
                    pattern_source.push_str(WILDCARD);
                }
                replacement.push_str(&text);
            }
            SegmentRole::LineBreak => replacement.push_str(&options.line_break),
            SegmentRole::Insert => {
                replacement.push_str(&segment.text);
                insertions.insert(segment.operation_label.clone(), segment.text.clone());
            }
            SegmentRole::Delete => {
                if !segment.text.is_empty() {
                    replacement = replacement.replace(&segment.text, "");
                }
                deletions.insert(segment.operation_label.clone(), segment.text.clone());
            }
            SegmentRole::Passthrough => replacement.push_str(&segment.text),
            SegmentRole::Ignored => {
                trace!(label = %segment.operation_label, text = %segment.text, "ignoring part");
            }
        }
    }

    if anchor_len == 0 {
        return None;
    }

    Some(CorrectionPlan {
        pattern_source,
        replacement,
        insertions,
        deletions,
    })
}

/// Build and compile one group through the session's pattern cache.
///
/// `Ok(None)` means the group has no context anchor and is skipped.
pub fn build_correction(
    group: &CorrectionGroup,
    options: &PatternOptions,
    cache: &mut PatternCache,
) -> Result<Option<Correction>, ReconcileError> {
    let Some(plan) = build_plan(group, options) else {
        return Ok(None);
    };
    let pattern = cache
        .compile(&plan.pattern_source)
        .map_err(|err| ReconcileError::PatternCompile {
            pattern: plan.pattern_source.clone(),
            row: group.row,
            group: group.group,
            side: group.side,
            reason: err.to_string(),
        })?;
    Ok(Some(Correction { plan, pattern }))
}

fn strip_markers(text: &str, markers: &[String]) -> String {
    markers
        .iter()
        .fold(text.to_string(), |acc, marker| acc.replace(marker.as_str(), ""))
}
