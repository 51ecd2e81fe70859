//! I/O collaborators: configuration files and the frame stream.

pub mod config;
pub mod frames;
