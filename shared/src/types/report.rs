//! Run report
//!
//! Collects the memory samples taken around each matmul iteration so they can
//! be written out once the run completes.

use super::memory::MemoryReading;
use serde::{Deserialize, Serialize};

/// Memory sample taken right after an iteration completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationSample {
    /// 1-based iteration index
    pub iteration: u32,

    /// Reading taken after the iteration drained
    pub reading: MemoryReading,

    /// Wall-clock time of the sample (ns since UNIX epoch)
    pub timestamp_ns: u64,
}

/// Summary of one monitoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// RFC 3339 start time
    pub started_at: String,

    /// Compute backend name
    pub backend: String,

    /// Matmul shape (rows, inner dimension, columns)
    pub m: usize,
    pub k: usize,
    pub n: usize,

    /// Buffer allocation policy
    pub allocation: String,

    /// Reading taken before the first iteration
    pub initial: MemoryReading,

    /// One sample per completed iteration
    pub samples: Vec<IterationSample>,

    /// Number of iterations whose output matched the expected values
    pub verified_iterations: u32,
}

impl RunReport {
    pub fn new(
        backend: impl Into<String>,
        (m, k, n): (usize, usize, usize),
        allocation: impl Into<String>,
        initial: MemoryReading,
    ) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            backend: backend.into(),
            m,
            k,
            n,
            allocation: allocation.into(),
            initial,
            samples: Vec::new(),
            verified_iterations: 0,
        }
    }

    pub fn push_sample(&mut self, sample: IterationSample) {
        self.samples.push(sample);
    }

    /// Highest reading seen across the initial sample and every iteration
    pub fn peak(&self) -> u64 {
        self.samples
            .iter()
            .map(|s| s.reading.value)
            .fold(self.initial.value, u64::max)
    }

    /// Difference between the last sample and the initial one, in the reading unit
    pub fn growth(&self) -> i128 {
        match self.samples.last() {
            Some(last) => last.reading.value as i128 - self.initial.value as i128,
            None => 0,
        }
    }
}
