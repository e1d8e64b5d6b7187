//! Core data types

pub mod memory;
pub mod report;
