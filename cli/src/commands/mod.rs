//! Subcommand implementations

pub mod capacity;
pub mod probe;
pub mod run;
