//! Stable exit codes for reconciler CLI commands.

/// Session reached a terminal frame.
pub const OK: i32 = 0;
/// Invalid arguments, config, or input files.
pub const INVALID: i32 = 1;
/// Session aborted by the runaway guard.
pub const CORRUPTION: i32 = 2;
/// Frame stream failed or closed before a terminal frame.
pub const TRANSPORT: i32 = 3;
