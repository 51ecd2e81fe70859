//! Suggestion-to-text reconciliation engine.
//!
//! Applies the edits described by a correction service's suggestion frames to
//! an original document. Frames carry a UI-oriented tree of text parts with no
//! character offsets, so each edit is located by context-anchored pattern
//! matching over the live, mutating text. The architecture keeps a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (classification, tree walking,
//!   pattern building, patching, runaway detection). No I/O.
//! - **[`io`]**: Configuration files and the frame stream channel.
//!
//! [`session`] holds the per-frame state machine and [`looping`] drives it
//! from an async frame stream.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
