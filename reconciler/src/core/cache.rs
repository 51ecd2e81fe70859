//! Session-scoped cache of compiled match patterns, keyed by pattern source.

use std::collections::HashMap;

use regex::Regex;
use tracing::trace;

/// Compiled patterns for one reconciliation session.
///
/// Owned by the session and dropped with it; never shared across sessions.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Regex>,
    hits: u64,
}

impl PatternCache {
    /// Return the compiled pattern for `source`, compiling it on first use.
    ///
    /// Compile failures are not cached.
    pub fn compile(&mut self, source: &str) -> Result<Regex, regex::Error> {
        if let Some(regex) = self.compiled.get(source) {
            self.hits += 1;
            trace!(source, "pattern cache hit");
            return Ok(regex.clone());
        }
        let regex = Regex::new(source)?;
        self.compiled.insert(source.to_string(), regex.clone());
        Ok(regex)
    }

    /// Number of distinct patterns compiled so far.
    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }

    /// Number of lookups served without compiling.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}
