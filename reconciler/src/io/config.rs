//! Reconciler configuration stored as TOML (`reconciler.toml`).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::pattern::{AnchorMode, LineBreakPolicy, PatternOptions};

/// Reconciler configuration (TOML).
///
/// Defaults describe the correction protocol as observed on the wire; most
/// deployments never need a config file. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconcileConfig {
    /// `textColor` that marks a part as unchanged original text.
    pub context_color: String,

    /// Marker strings stripped from context text (truncation ellipses).
    pub ellipsis_markers: Vec<String>,

    /// `scoresStatus` value that ends a session without scores.
    pub too_small_status: String,

    /// Abort once this many identical tokens appear in a row after a patch.
    pub runaway_threshold: usize,

    /// How context text is turned into a match pattern. `literal` escapes
    /// anchors so that metacharacters in the document cannot misfire.
    pub anchor_mode: AnchorMode,

    /// What an `insert line break` part becomes in the replacement.
    pub line_break: LineBreakPolicy,

    /// Literal text used for line breaks instead of `line_break`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_break_override: Option<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            context_color: "CoreNeutral90".to_string(),
            ellipsis_markers: vec!["…".to_string(), "â€¦".to_string()],
            too_small_status: "TOO_SMALL".to_string(),
            runaway_threshold: 3,
            anchor_mode: AnchorMode::Pattern,
            line_break: LineBreakPolicy::Newline,
            line_break_override: None,
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.context_color.trim().is_empty() {
            return Err(anyhow!("context_color must be non-empty"));
        }
        if self.too_small_status.trim().is_empty() {
            return Err(anyhow!("too_small_status must be non-empty"));
        }
        if self.runaway_threshold < 2 {
            return Err(anyhow!("runaway_threshold must be >= 2"));
        }
        if self.ellipsis_markers.iter().any(|marker| marker.is_empty()) {
            return Err(anyhow!("ellipsis_markers must not contain empty strings"));
        }
        Ok(())
    }

    /// Options consumed by the pattern builder.
    pub fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            context_color: self.context_color.clone(),
            ellipsis_markers: self.ellipsis_markers.clone(),
            anchor_mode: self.anchor_mode,
            line_break: self.line_break_text().to_string(),
        }
    }

    /// Text emitted for an `insert line break` part.
    pub fn line_break_text(&self) -> &str {
        match &self.line_break_override {
            Some(text) => text,
            None => self.line_break.substitute(),
        }
    }
}

/// Load config from a TOML file and validate it.
///
/// A missing file yields `ReconcileConfig::default()`.
pub fn load_config(path: &Path) -> Result<ReconcileConfig> {
    let cfg = match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<ReconcileConfig>(&contents)
            .with_context(|| format!("parse {}", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => ReconcileConfig::default(),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Validate and write config as TOML, replacing any existing file in one step.
pub fn write_config(path: &Path, cfg: &ReconcileConfig) -> Result<()> {
    cfg.validate()?;
    let body = toml::to_string_pretty(cfg).context("serialize config toml")?;
    replace_file(path, &format!("{CONFIG_HEADER}{body}"))
}

const CONFIG_HEADER: &str = "# reconciler settings; omitted keys take their defaults.\n\n";

/// Write to a sibling temp file, then rename over `path`.
fn replace_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let staged = path.with_extension("toml.tmp");
    fs::write(&staged, contents).with_context(|| format!("write {}", staged.display()))?;
    fs::rename(&staged, path).with_context(|| format!("replace {}", path.display()))
}
