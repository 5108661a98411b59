//! Playmark runner
//!
//! Configuration loading and the terminal surface used by the `playmark`
//! binary.

pub mod config;
pub mod console;
