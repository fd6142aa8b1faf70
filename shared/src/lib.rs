//! Shared types and utilities for wattprobe
//!
//! This crate contains the telemetry data structures and small helpers used
//! by both the profiling harness and the command-line front end.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{table::*, telemetry::*};
