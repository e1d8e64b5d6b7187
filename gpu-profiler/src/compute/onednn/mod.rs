//! oneDNN integration
//!
//! Runs the multiply through a oneDNN matmul primitive on a GPU engine.

pub mod bindings;
pub mod executor;

pub use executor::{DnnlBuffer, DnnlExecutor};
