//! Deterministic, pure logic shared by the reconciliation session.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod cache;
pub mod classifier;
pub mod guard;
pub mod patcher;
pub mod pattern;
pub mod types;
pub mod walker;
