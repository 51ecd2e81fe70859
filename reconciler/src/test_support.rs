//! Test-only helpers for building suggestion frames and scratch workspaces.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::stream::{self, Stream};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::io::config::{ReconcileConfig, write_config};
use crate::io::frames::FrameItem;

pub const CONTEXT_COLOR: &str = "CoreNeutral90";

/// A part with an explicit label and colour.
pub fn part(text: &str, label: &str, color: &str) -> Value {
    json!({
        "text": text,
        "meta": {"label": label},
        "textColor": color,
        "format": []
    })
}

/// Unchanged text that anchors a match.
pub fn context(text: &str) -> Value {
    part(text, "", CONTEXT_COLOR)
}

/// Single-space separator part.
pub fn space() -> Value {
    part(" ", "", CONTEXT_COLOR)
}

pub fn insert(text: &str) -> Value {
    part(text, "Insert the word", "CoreGreen60")
}

pub fn delete(text: &str) -> Value {
    part(text, "Delete the word", "CoreRed50")
}

pub fn line_break() -> Value {
    part("", "Insert line break", "CoreGreen60")
}

pub fn block(parts: Vec<Value>) -> Value {
    json!({"type": "block", "parts": parts})
}

/// Alternative-choice entry; the first choice is the best one.
pub fn alternatives(choices: Vec<Vec<Value>>) -> Value {
    let alternatives: Vec<Value> = choices
        .into_iter()
        .map(|parts| json!({"preview": {"parts": parts}}))
        .collect();
    json!({"type": "alternativeChoice", "alternatives": alternatives})
}

/// Row child whose subsets are plain blocks.
pub fn group(left: Vec<Vec<Value>>, right: Vec<Vec<Value>>) -> Value {
    entries_group(
        left.into_iter().map(block).collect(),
        right.into_iter().map(block).collect(),
    )
}

/// Row child with arbitrary subset entries.
pub fn entries_group(left: Vec<Value>, right: Vec<Value>) -> Value {
    json!({"left": left, "right": right})
}

/// Suggestion frame with one `"column"` row holding `groups`.
pub fn suggestion_frame(groups: Vec<Value>) -> String {
    rows_frame(vec![json!({"type": "column", "children": groups})])
}

/// Suggestion frame with explicit rows.
pub fn rows_frame(rows: Vec<Value>) -> String {
    json!({
        "messageId": "suggestion",
        "sdui": {"child": {"child": {"views": {"default-suggestion": {"children": rows}}}}}
    })
    .to_string()
}

pub fn progress_frame() -> String {
    json!({"messageId": "progress", "action": "submit_ot"}).to_string()
}

pub fn terminal_frame() -> String {
    json!({"messageId": "finish", "outcomeScores": {"Correctness": 97}}).to_string()
}

pub fn too_small_frame() -> String {
    json!({"messageId": "finish", "outcomeScores": {}, "scoresStatus": "TOO_SMALL"}).to_string()
}

/// In-memory frame stream that ends after `frames`.
pub fn scripted(frames: Vec<String>) -> impl Stream<Item = FrameItem> {
    stream::iter(frames.into_iter().map(|frame| Ok(frame.into_bytes())))
}

/// Scratch directory holding input files for CLI and reader tests.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_text(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Write frames as JSONL, one frame per line.
    pub fn write_frames(&self, name: &str, frames: &[String]) -> Result<PathBuf> {
        let mut buf = frames.join("\n");
        buf.push('\n');
        self.write_text(name, &buf)
    }

    pub fn write_config(&self, name: &str, cfg: &ReconcileConfig) -> Result<PathBuf> {
        let path = self.path().join(name);
        write_config(&path, cfg)?;
        Ok(path)
    }
}
