//! Per-frame reconciliation state machine.
//!
//! A [`Session`] owns the document text and is its only writer. Frames are
//! fed one at a time; the session moves `Idle → Streaming → {Done, Failed}`
//! and ignores anything fed after reaching a terminal state.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::core::cache::PatternCache;
use crate::core::classifier::classify_frame;
use crate::core::guard::check_runaway;
use crate::core::patcher::apply_patch;
use crate::core::pattern::{PatternOptions, build_correction};
use crate::core::types::{Row, SuggestionFrame};
use crate::core::walker::correction_groups;
use crate::error::{ReconcileError, TransportError};
use crate::io::config::ReconcileConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No frame consumed yet.
    Idle,
    Streaming,
    Done,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

/// What the caller should do after feeding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// Keep reading frames.
    Continue,
    /// The session reached `Done`; stop reading.
    Finished,
}

/// Counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub frames: u64,
    pub progress_frames: u64,
    pub suggestion_frames: u64,
    pub decode_errors: u64,
    pub groups_seen: u64,
    /// Groups without a context anchor.
    pub groups_unusable: u64,
    pub compile_errors: u64,
    /// Distinct patterns compiled by the session's cache.
    pub patterns_compiled: u64,
    /// Groups whose pattern was already compiled.
    pub pattern_cache_hits: u64,
    pub patches_applied: u64,
    /// Corrections whose pattern did not match the current text.
    pub patches_unmatched: u64,
}

/// Successful end of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub text: String,
    pub scores: Map<String, Value>,
    pub status: Option<String>,
    pub stats: ReconcileStats,
}

/// Fatal end of a session, carrying the text accumulated so far.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct ReconcileFailure {
    pub partial_text: String,
    pub error: ReconcileError,
    pub stats: ReconcileStats,
}

#[derive(Debug)]
pub struct Session {
    text: String,
    state: SessionState,
    options: PatternOptions,
    too_small_status: String,
    runaway_threshold: usize,
    cache: PatternCache,
    stats: ReconcileStats,
    terminal: Option<(Map<String, Value>, Option<String>)>,
    failure: Option<ReconcileError>,
}

impl Session {
    pub fn new(original: impl Into<String>, config: &ReconcileConfig) -> Self {
        Self {
            text: original.into(),
            state: SessionState::Idle,
            options: config.pattern_options(),
            too_small_status: config.too_small_status.clone(),
            runaway_threshold: config.runaway_threshold,
            cache: PatternCache::default(),
            stats: ReconcileStats::default(),
            terminal: None,
            failure: None,
        }
    }

    /// Current document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    /// Feed one raw frame.
    ///
    /// Decode and compile errors are logged and swallowed. A corruption error
    /// moves the session to `Failed` and is returned; the text keeps its value
    /// from before the offending patch.
    pub fn handle_frame(&mut self, raw: impl AsRef<[u8]>) -> Result<FrameStep, ReconcileError> {
        if self.state.is_terminal() {
            warn!(state = ?self.state, "frame fed to a finished session; ignoring");
            return Ok(FrameStep::Finished);
        }
        self.state = SessionState::Streaming;
        self.stats.frames += 1;

        let decoded = match classify_frame(raw.as_ref(), &self.too_small_status) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.stats.decode_errors += 1;
                warn!(error = %err, "skipping undecodable frame");
                return Ok(FrameStep::Continue);
            }
        };

        match decoded.frame {
            SuggestionFrame::Progress => {
                self.stats.progress_frames += 1;
                debug!(message_id = ?decoded.message_id, "progress frame");
                Ok(FrameStep::Continue)
            }
            SuggestionFrame::Terminal { scores, status } => {
                info!(
                    message_id = ?decoded.message_id,
                    scores = scores.len(),
                    status = ?status,
                    "terminal frame"
                );
                self.terminal = Some((scores, status));
                self.state = SessionState::Done;
                Ok(FrameStep::Finished)
            }
            SuggestionFrame::SuggestionTree { rows } => {
                self.stats.suggestion_frames += 1;
                debug!(message_id = ?decoded.message_id, rows = rows.len(), "suggestion frame");
                match self.apply_rows(&rows) {
                    Ok(()) => Ok(FrameStep::Continue),
                    Err(err) => Err(self.fail(err)),
                }
            }
        }
    }

    /// Record a fatal error and move to `Failed`.
    pub fn fail(&mut self, error: ReconcileError) -> ReconcileError {
        warn!(error = %error, "session failed");
        self.state = SessionState::Failed;
        self.failure = Some(error.clone());
        error
    }

    /// Consume the session into its outcome.
    ///
    /// A session that never saw a terminal frame ends as a closed-stream
    /// transport failure.
    pub fn finish(mut self) -> Result<Reconciled, ReconcileFailure> {
        if self.state == SessionState::Done {
            let (scores, status) = self.terminal.take().unwrap_or_default();
            return Ok(Reconciled {
                text: self.text,
                scores,
                status,
                stats: self.stats,
            });
        }
        let error = self
            .failure
            .take()
            .unwrap_or(ReconcileError::Transport(TransportError::Closed));
        Err(ReconcileFailure {
            partial_text: self.text,
            error,
            stats: self.stats,
        })
    }

    fn apply_rows(&mut self, rows: &[Row]) -> Result<(), ReconcileError> {
        for group in correction_groups(rows) {
            self.stats.groups_seen += 1;
            let built = build_correction(&group, &self.options, &mut self.cache);
            self.stats.patterns_compiled = self.cache.compiled_count() as u64;
            self.stats.pattern_cache_hits = self.cache.hits();
            let correction = match built {
                Ok(Some(correction)) => correction,
                Ok(None) => {
                    self.stats.groups_unusable += 1;
                    debug!(
                        row = group.row,
                        group = group.group,
                        side = ?group.side,
                        "group has no context anchor"
                    );
                    continue;
                }
                Err(err) => {
                    self.stats.compile_errors += 1;
                    warn!(error = %err, "skipping group");
                    continue;
                }
            };

            let outcome = apply_patch(&self.text, &correction.pattern, &correction.plan.replacement);
            if !outcome.matched {
                self.stats.patches_unmatched += 1;
                debug!(pattern = %correction.plan.pattern_source, "pattern did not match");
                continue;
            }
            check_runaway(&outcome.text, self.runaway_threshold)?;
            self.text = outcome.text;
            self.stats.patches_applied += 1;
            debug!(
                pattern = %correction.plan.pattern_source,
                insertions = correction.plan.insertions.len(),
                deletions = correction.plan.deletions.len(),
                "patch applied"
            );
        }
        Ok(())
    }
}
