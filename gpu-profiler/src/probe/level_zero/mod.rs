//! Level Zero integration

pub mod bindings;
pub mod runtime;

pub use runtime::LevelZeroRuntime;
