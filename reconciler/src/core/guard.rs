//! Runaway detection for patched text.
//!
//! A wildcard anchored on repeated boilerplate can fire across the wrong span
//! and stutter words. The guard stops the session before that compounds.

use crate::error::ReconcileError;

/// First run of at least `threshold` identical consecutive tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRun {
    pub token: String,
    pub run: usize,
}

/// Scan whitespace-separated tokens for a run of length `>= threshold`.
pub fn find_token_run(text: &str, threshold: usize) -> Option<TokenRun> {
    let mut tokens = text.split_whitespace();
    let mut prev = tokens.next()?;
    let mut run = 1usize;
    if run >= threshold {
        return Some(TokenRun {
            token: prev.to_string(),
            run,
        });
    }
    for token in tokens {
        if token == prev {
            run += 1;
        } else {
            prev = token;
            run = 1;
        }
        if run >= threshold {
            return Some(TokenRun {
                token: prev.to_string(),
                run,
            });
        }
    }
    None
}

/// Check patched text; a run of `threshold` or more is a corruption error.
pub fn check_runaway(text: &str, threshold: usize) -> Result<(), ReconcileError> {
    match find_token_run(text, threshold) {
        Some(TokenRun { token, run }) => Err(ReconcileError::Corruption { token, run }),
        None => Ok(()),
    }
}

/// Length of the longest run of identical consecutive tokens.
pub fn longest_token_run(text: &str) -> usize {
    let mut longest = 0usize;
    let mut run = 0usize;
    let mut prev: Option<&str> = None;
    for token in text.split_whitespace() {
        run = if prev == Some(token) { run + 1 } else { 1 };
        longest = longest.max(run);
        prev = Some(token);
    }
    longest
}
