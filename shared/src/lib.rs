//! Shared types and utilities for vramwatch
//!
//! This crate contains the memory-reading and run-report types exchanged
//! between the GPU layer and the command-line front end, plus small helpers.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{memory::*, report::*};
