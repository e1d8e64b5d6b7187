//! Host executor
//!
//! Runs the multiply on the CPU and accounts for every live buffer through an
//! [`AllocationTracker`], so the allocate/compute/free cycle and the memory
//! probe can be exercised without an accelerator.

use super::{DeviceBuffer, MatmulExecutor};
use crate::error::GpuResult;
use crate::probe::MemoryReporter;
use crate::tensor::check_conformable;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use vramwatch_shared::{MemoryReading, MemoryUnit};

#[derive(Debug, Default)]
struct Counters {
    live_bytes: AtomicU64,
    allocations: AtomicU64,
}

/// Shared count of bytes held by live host buffers
#[derive(Debug, Clone, Default)]
pub struct AllocationTracker {
    counters: Arc<Counters>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently held by live buffers
    pub fn live_bytes(&self) -> u64 {
        self.counters.live_bytes.load(Ordering::Relaxed)
    }

    /// Number of allocations made since creation
    pub fn total_allocations(&self) -> u64 {
        self.counters.allocations.load(Ordering::Relaxed)
    }

    fn lease(&self, bytes: u64) -> Lease {
        self.counters.live_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.counters.allocations.fetch_add(1, Ordering::Relaxed);
        Lease {
            counters: Arc::clone(&self.counters),
            bytes,
        }
    }
}

impl MemoryReporter for AllocationTracker {
    fn read_memory(&self) -> MemoryReading {
        MemoryReading::from_bytes(self.live_bytes(), MemoryUnit::Kilobytes)
    }
}

/// Returns its bytes to the tracker on drop
#[derive(Debug)]
struct Lease {
    counters: Arc<Counters>,
    bytes: u64,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.counters.live_bytes.fetch_sub(self.bytes, Ordering::Relaxed);
    }
}

/// Row-major f32 buffer in host memory
#[derive(Debug)]
pub struct HostBuffer {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
    _lease: Lease,
}

impl HostBuffer {
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl DeviceBuffer for HostBuffer {
    fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

/// CPU stand-in for a GPU matmul primitive
#[derive(Debug, Clone, Default)]
pub struct HostExecutor {
    tracker: AllocationTracker,
}

impl HostExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracker(tracker: AllocationTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &AllocationTracker {
        &self.tracker
    }
}

impl MatmulExecutor for HostExecutor {
    type Buffer = HostBuffer;

    fn name(&self) -> &'static str {
        "host"
    }

    fn allocate(&mut self, rows: usize, cols: usize) -> GpuResult<HostBuffer> {
        let len = rows * cols;
        let bytes = (len * std::mem::size_of::<f32>()) as u64;
        debug!("Allocating {}x{} host buffer ({} bytes)", rows, cols, bytes);
        Ok(HostBuffer {
            rows,
            cols,
            data: vec![0.0; len],
            _lease: self.tracker.lease(bytes),
        })
    }

    fn fill(&mut self, buffer: &mut HostBuffer, value: f32) -> GpuResult<()> {
        buffer.data.fill(value);
        Ok(())
    }

    fn matmul(&mut self, a: &HostBuffer, b: &HostBuffer, c: &mut HostBuffer) -> GpuResult<()> {
        check_conformable(a.dims(), b.dims(), c.dims())?;

        let (m, k) = a.dims();
        let n = b.cols;
        c.data.fill(0.0);

        // i-k-j order keeps the inner loop walking B and C contiguously
        for i in 0..m {
            let c_row = &mut c.data[i * n..(i + 1) * n];
            for p in 0..k {
                let a_ip = a.data[i * k + p];
                let b_row = &b.data[p * n..(p + 1) * n];
                for (c_ij, &b_pj) in c_row.iter_mut().zip(b_row) {
                    *c_ij += a_ip * b_pj;
                }
            }
        }

        Ok(())
    }

    fn read(&mut self, buffer: &HostBuffer) -> GpuResult<Vec<f32>> {
        Ok(buffer.data.clone())
    }
}
