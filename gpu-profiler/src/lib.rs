//! GPU memory probes and matmul driver
//!
//! Runs a fixed-shape dense matrix multiply on a device, repeatedly, and
//! measures device memory around each call. The vendor math library and the
//! GPU runtime sit behind [`MatmulExecutor`] and [`GpuRuntime`] so the loop
//! can run against host stand-ins.

pub mod compute;
pub mod driver;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod tensor;

pub use compute::host::{AllocationTracker, HostExecutor};
pub use compute::{DeviceBuffer, MatmulExecutor};
pub use driver::{run_matmul, AllocationPolicy, ComputeDriver, MatmulOutcome};
pub use error::{GpuError, GpuResult};
pub use monitor::{MonitorConfig, MonitorLoop};
pub use probe::{
    DeviceCapacity, GpuRuntime, MemoryBank, MemoryReporter, RuntimeCapacityProbe, SysfsVramProbe,
};
pub use tensor::{check_conformable, Fill, MatmulShape};
