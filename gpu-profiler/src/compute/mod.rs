//! Matmul execution backends
//!
//! An executor owns the device/queue pair and hands out scoped buffers. A
//! buffer is released when it is dropped, so every exit path (including `?`
//! on a failed device call) gives its memory back.

pub mod host;

#[cfg(feature = "onednn")]
pub mod onednn;

use crate::error::GpuResult;

/// A device-resident f32 matrix, released on drop
pub trait DeviceBuffer {
    /// (rows, cols)
    fn dims(&self) -> (usize, usize);

    fn len(&self) -> usize {
        let (rows, cols) = self.dims();
        rows * cols
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability to run one dense f32 matrix multiply on a device
pub trait MatmulExecutor {
    type Buffer: DeviceBuffer;

    /// Short backend name used in logs and reports
    fn name(&self) -> &'static str;

    /// Allocate a row-major rows x cols buffer on the device
    fn allocate(&mut self, rows: usize, cols: usize) -> GpuResult<Self::Buffer>;

    /// Set every element of `buffer` to `value`
    fn fill(&mut self, buffer: &mut Self::Buffer, value: f32) -> GpuResult<()>;

    /// Compute `c = a x b`, blocking until the queue has drained
    fn matmul(&mut self, a: &Self::Buffer, b: &Self::Buffer, c: &mut Self::Buffer)
        -> GpuResult<()>;

    /// Copy `buffer` back to the host
    fn read(&mut self, buffer: &Self::Buffer) -> GpuResult<Vec<f32>>;
}

impl<E: MatmulExecutor + ?Sized> MatmulExecutor for &mut E {
    type Buffer = E::Buffer;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn allocate(&mut self, rows: usize, cols: usize) -> GpuResult<Self::Buffer> {
        (**self).allocate(rows, cols)
    }

    fn fill(&mut self, buffer: &mut Self::Buffer, value: f32) -> GpuResult<()> {
        (**self).fill(buffer, value)
    }

    fn matmul(
        &mut self,
        a: &Self::Buffer,
        b: &Self::Buffer,
        c: &mut Self::Buffer,
    ) -> GpuResult<()> {
        (**self).matmul(a, b, c)
    }

    fn read(&mut self, buffer: &Self::Buffer) -> GpuResult<Vec<f32>> {
        (**self).read(buffer)
    }
}
