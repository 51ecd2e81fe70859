//! Error taxonomy for the reconciliation engine.
//!
//! `Decode` and `PatternCompile` are recoverable: the loop logs them and moves
//! on. `Corruption` and `Transport` end a session.

use crate::core::types::Side;

/// Failure to read the next frame from the frame stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The producer went away before a terminal frame arrived.
    #[error("frame stream closed before a terminal frame")]
    Closed,
    /// The producer reported a read failure.
    #[error("frame read failed: {0}")]
    Read(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Frame could not be parsed into the expected shape.
    #[error("decode frame: {reason}")]
    Decode { reason: String },

    /// Anchor text derived from a correction group is not a valid pattern.
    #[error("compile pattern `{pattern}` (row {row}, group {group}, {side:?}): {reason}")]
    PatternCompile {
        pattern: String,
        row: usize,
        group: usize,
        side: Side,
        reason: String,
    },

    /// A patch produced a run of repeated tokens.
    #[error("runaway patch: token `{token}` repeated {run} times")]
    Corruption { token: String, run: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ReconcileError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::Corruption { .. } | ReconcileError::Transport(_)
        )
    }
}
