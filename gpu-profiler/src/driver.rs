//! Compute driver
//!
//! Issues one fixed-shape multiply per call: acquire A, B and C, fill the
//! inputs with constants, run the primitive, wait, copy C back. Buffers are
//! either scoped to the call or hoisted and reused for the driver's lifetime.

use crate::compute::{DeviceBuffer, MatmulExecutor};
use crate::error::GpuResult;
use crate::tensor::{check_conformable, Fill, MatmulShape};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// When A, B and C are allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationPolicy {
    /// Allocated at the start of each call and released before it returns
    #[default]
    PerIteration,
    /// Allocated on the first call and reused until the driver is dropped
    Hoisted,
}

impl AllocationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationPolicy::PerIteration => "per-iteration",
            AllocationPolicy::Hoisted => "hoisted",
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-iteration" => Ok(AllocationPolicy::PerIteration),
            "hoisted" => Ok(AllocationPolicy::Hoisted),
            _ => anyhow::bail!("Invalid allocation policy: {}", s),
        }
    }
}

/// Result of one multiply, copied back to the host
#[derive(Debug, Clone)]
pub struct MatmulOutcome {
    pub shape: MatmulShape,
    pub fill: Fill,
    pub output: Vec<f32>,
}

impl MatmulOutcome {
    /// Value every element should hold
    pub fn expected(&self) -> f32 {
        self.fill.expected(self.shape.k())
    }

    /// Number of elements that differ from the expected value
    pub fn mismatches(&self) -> usize {
        let expected = self.expected();
        // f32 accumulation over k terms
        let tolerance = expected.abs() * 1e-5 + f32::EPSILON;
        self.output
            .iter()
            .filter(|&&v| !v.is_finite() || (v - expected).abs() > tolerance)
            .count()
    }

    pub fn is_correct(&self) -> bool {
        self.output.len() == self.shape.m() * self.shape.n() && self.mismatches() == 0
    }
}

struct Operands<B> {
    a: B,
    b: B,
    c: B,
    fill: Fill,
}

fn allocate_operands<E: MatmulExecutor>(
    executor: &mut E,
    shape: MatmulShape,
    fill: Fill,
) -> GpuResult<Operands<E::Buffer>> {
    let (a_rows, a_cols) = shape.a_dims();
    let (b_rows, b_cols) = shape.b_dims();
    let (c_rows, c_cols) = shape.c_dims();

    let mut a = executor.allocate(a_rows, a_cols)?;
    let mut b = executor.allocate(b_rows, b_cols)?;
    let c = executor.allocate(c_rows, c_cols)?;
    executor.fill(&mut a, fill.a)?;
    executor.fill(&mut b, fill.b)?;

    Ok(Operands { a, b, c, fill })
}

fn execute<E: MatmulExecutor>(
    executor: &mut E,
    operands: &mut Operands<E::Buffer>,
    fill: Fill,
) -> GpuResult<Vec<f32>> {
    check_conformable(operands.a.dims(), operands.b.dims(), operands.c.dims())?;

    if operands.fill != fill {
        executor.fill(&mut operands.a, fill.a)?;
        executor.fill(&mut operands.b, fill.b)?;
        operands.fill = fill;
    }

    executor.matmul(&operands.a, &operands.b, &mut operands.c)?;
    executor.read(&operands.c)
}

/// Runs one matmul per call on an executor
pub struct ComputeDriver<E: MatmulExecutor> {
    // Declared before the executor so hoisted buffers are released first
    hoisted: Option<Operands<E::Buffer>>,
    executor: E,
    shape: MatmulShape,
    fill: Fill,
    policy: AllocationPolicy,
    calls: u64,
}

impl<E: MatmulExecutor> ComputeDriver<E> {
    pub fn new(executor: E, shape: MatmulShape) -> Self {
        Self {
            hoisted: None,
            executor,
            shape,
            fill: Fill::default(),
            policy: AllocationPolicy::default(),
            calls: 0,
        }
    }

    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    /// Change the input constants for subsequent calls
    pub fn set_fill(&mut self, fill: Fill) {
        self.fill = fill;
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn shape(&self) -> MatmulShape {
        self.shape
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Run one multiply and block until it completes
    pub fn run_matmul(&mut self) -> GpuResult<MatmulOutcome> {
        let Self {
            hoisted,
            executor,
            shape,
            fill,
            policy,
            calls,
        } = self;

        let output = match policy {
            AllocationPolicy::PerIteration => {
                let mut operands = allocate_operands(executor, *shape, *fill)?;
                execute(executor, &mut operands, *fill)?
            }
            AllocationPolicy::Hoisted => {
                let mut operands = match hoisted.take() {
                    Some(operands) => operands,
                    None => {
                        debug!("Allocating hoisted operands for {:?}", shape);
                        allocate_operands(executor, *shape, *fill)?
                    }
                };
                let output = execute(executor, &mut operands, *fill);
                *hoisted = Some(operands);
                output?
            }
        };

        *calls += 1;
        debug!(
            "{} matmul {}x{}x{} done (call {})",
            executor.name(),
            shape.m(),
            shape.k(),
            shape.n(),
            calls
        );

        Ok(MatmulOutcome {
            shape: *shape,
            fill: *fill,
            output,
        })
    }

    /// Release hoisted buffers, if any
    pub fn release(&mut self) {
        self.hoisted = None;
    }
}

/// One-shot multiply with the default constant fill (A = 1.0, B = 2.0)
pub fn run_matmul<E: MatmulExecutor>(
    executor: &mut E,
    m: usize,
    k: usize,
    n: usize,
) -> GpuResult<MatmulOutcome> {
    let shape = MatmulShape::new(m, k, n)?;
    ComputeDriver::new(executor, shape).run_matmul()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::host::HostExecutor;
    use crate::error::GpuError;

    #[test]
    fn test_every_entry_is_k_times_a_times_b() {
        let mut exec = HostExecutor::new();
        for &(m, k, n) in &[(1, 1, 1), (5, 3, 7), (32, 128, 8), (64, 64, 64)] {
            let outcome = run_matmul(&mut exec, m, k, n).unwrap();
            assert_eq!(outcome.output.len(), m * n);
            assert!(outcome.output.iter().all(|&v| v == k as f32 * 1.0 * 2.0));
            assert!(outcome.is_correct());
        }
    }

    #[test]
    fn test_zero_dimension_rejected_before_allocation() {
        let mut exec = HostExecutor::new();
        let err = run_matmul(&mut exec, 4, 0, 4).unwrap_err();
        assert!(matches!(err, GpuError::InvalidDimension { name: "k" }));
        assert_eq!(exec.tracker().total_allocations(), 0);
    }

    #[test]
    fn test_per_iteration_releases_buffers() {
        let exec = HostExecutor::new();
        let tracker = exec.tracker().clone();
        let mut driver = ComputeDriver::new(exec, MatmulShape::new(16, 16, 16).unwrap());

        for _ in 0..5 {
            driver.run_matmul().unwrap();
            assert_eq!(tracker.live_bytes(), 0);
        }
        assert_eq!(tracker.total_allocations(), 15);
        assert_eq!(driver.calls(), 5);
    }

    #[test]
    fn test_hoisted_reuses_buffers() {
        let exec = HostExecutor::new();
        let tracker = exec.tracker().clone();
        let shape = MatmulShape::new(8, 4, 2).unwrap();
        let mut driver = ComputeDriver::new(exec, shape).with_policy(AllocationPolicy::Hoisted);

        for _ in 0..5 {
            assert!(driver.run_matmul().unwrap().is_correct());
            assert_eq!(tracker.live_bytes(), shape.footprint_bytes());
        }
        assert_eq!(tracker.total_allocations(), 3);

        driver.release();
        assert_eq!(tracker.live_bytes(), 0);
    }

    #[test]
    fn test_hoisted_refills_on_new_constants() {
        let mut driver = ComputeDriver::new(HostExecutor::new(), MatmulShape::new(2, 3, 2).unwrap())
            .with_policy(AllocationPolicy::Hoisted);

        assert_eq!(driver.run_matmul().unwrap().output, vec![6.0; 4]);
        driver.set_fill(Fill::new(2.0, 5.0));
        assert_eq!(driver.run_matmul().unwrap().output, vec![30.0; 4]);
    }

    #[test]
    fn test_outcome_mismatch_count() {
        let outcome = MatmulOutcome {
            shape: MatmulShape::new(1, 4, 2).unwrap(),
            fill: Fill::default(),
            output: vec![8.0, 7.5],
        };
        assert_eq!(outcome.expected(), 8.0);
        assert_eq!(outcome.mismatches(), 1);
        assert!(!outcome.is_correct());
    }

    #[test]
    fn test_non_finite_outputs_are_mismatches() {
        let outcome = MatmulOutcome {
            shape: MatmulShape::new(1, 4, 4).unwrap(),
            fill: Fill::default(),
            output: vec![f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 8.0],
        };
        assert_eq!(outcome.mismatches(), 3);
        assert!(!outcome.is_correct());

        let all_nan = MatmulOutcome {
            output: vec![f32::NAN; 4],
            ..outcome
        };
        assert_eq!(all_nan.mismatches(), 4);
        assert!(!all_nan.is_correct());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "hoisted".parse::<AllocationPolicy>().unwrap(),
            AllocationPolicy::Hoisted
        );
        assert_eq!(
            "Per-Iteration".parse::<AllocationPolicy>().unwrap(),
            AllocationPolicy::PerIteration
        );
        assert!("pooled".parse::<AllocationPolicy>().is_err());
    }
}
