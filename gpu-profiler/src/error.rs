//! Error types for the GPU layer

use thiserror::Error;

pub type GpuResult<T> = Result<T, GpuError>;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("matrix dimension `{name}` must be positive")]
    InvalidDimension { name: &'static str },

    #[error(
        "non-conformable operands: A is {}x{}, B is {}x{}, C is {}x{}",
        .a.0, .a.1, .b.0, .b.1, .c.0, .c.1
    )]
    ShapeMismatch {
        a: (usize, usize),
        b: (usize, usize),
        c: (usize, usize),
    },

    #[error("{call} failed with status {code}")]
    Runtime { call: &'static str, code: i64 },

    #[error("no GPU runtime driver found")]
    NoDriver,

    #[error("driver {driver} exposes no devices")]
    NoDevice { driver: usize },

    #[error("device index {index} out of range ({count} devices)")]
    DeviceIndex { index: usize, count: usize },

    #[error("{0} support was not compiled in")]
    Unavailable(&'static str),

    #[error("iteration {iteration}: {mismatches} output elements differ from expected {expected}")]
    WrongResult {
        iteration: u32,
        mismatches: usize,
        expected: f32,
    },

    #[error("failed to write console output")]
    Output(#[from] std::io::Error),
}

impl GpuError {
    /// Map a vendor status code to a result, treating `success` as Ok
    pub(crate) fn check(call: &'static str, code: i64, success: i64) -> GpuResult<()> {
        if code == success {
            Ok(())
        } else {
            Err(GpuError::Runtime { call, code })
        }
    }
}
