//! Iteration loop
//!
//! Runs the compute driver a fixed number of times and samples the memory
//! reporter once before the loop and once after every iteration. Everything
//! is synchronous: an iteration's work has drained before its sample is taken.

use crate::compute::MatmulExecutor;
use crate::driver::ComputeDriver;
use crate::error::{GpuError, GpuResult};
use crate::probe::MemoryReporter;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};
use vramwatch_shared::utils::time::system_time_nanos;
use vramwatch_shared::{IterationSample, RunReport};

/// Loop parameters
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Number of matmul calls
    pub iterations: u32,

    /// Pause between iterations (not after the last one)
    pub delay: Duration,

    /// Check every output against the expected constant
    pub verify: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            delay: Duration::from_millis(500),
            verify: true,
        }
    }
}

pub struct MonitorLoop<E: MatmulExecutor, R: MemoryReporter> {
    driver: ComputeDriver<E>,
    reporter: R,
    config: MonitorConfig,
}

impl<E: MatmulExecutor, R: MemoryReporter> MonitorLoop<E, R> {
    pub fn new(driver: ComputeDriver<E>, reporter: R, config: MonitorConfig) -> Self {
        Self {
            driver,
            reporter,
            config,
        }
    }

    /// Run every iteration, writing one console line per sample to `out`
    pub fn run<W: Write>(&mut self, out: &mut W) -> GpuResult<RunReport> {
        let label = self.reporter.label().to_string();
        let initial = self.reporter.read_memory();
        writeln!(out, "Initial {}: {}", label, initial)?;

        let mut report = RunReport::new(
            self.driver.executor().name(),
            self.driver.shape().as_tuple(),
            self.driver.policy().as_str(),
            initial,
        );

        for iteration in 1..=self.config.iterations {
            let outcome = self.driver.run_matmul()?;

            if self.config.verify {
                let mismatches = outcome.mismatches();
                if mismatches > 0 {
                    return Err(GpuError::WrongResult {
                        iteration,
                        mismatches,
                        expected: outcome.expected(),
                    });
                }
                report.verified_iterations += 1;
            }

            let reading = self.reporter.read_memory();
            writeln!(out, "After iteration {}: {}: {}", iteration, label, reading)?;
            report.push_sample(IterationSample {
                iteration,
                reading,
                timestamp_ns: system_time_nanos(),
            });

            if iteration < self.config.iterations && !self.config.delay.is_zero() {
                std::thread::sleep(self.config.delay);
            }
        }

        writeln!(out, "Finished all matmul iterations.")?;
        out.flush()?;

        info!(
            "Completed {} iterations (peak {} {}, growth {})",
            self.config.iterations,
            report.peak(),
            initial.unit,
            report.growth()
        );
        if report.growth() > 0 && self.driver.policy() == crate::AllocationPolicy::PerIteration {
            warn!(
                "{} grew by {} {} across the run",
                label,
                report.growth(),
                initial.unit
            );
        }

        Ok(report)
    }
}
