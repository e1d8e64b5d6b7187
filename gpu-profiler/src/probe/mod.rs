//! Device memory probes
//!
//! Two separate questions are answered here and they are kept apart:
//! - [`MemoryReporter::read_memory`]: memory in use right now (sysfs counter)
//! - [`RuntimeCapacityProbe::read_capacity_mb`]: total capacity of a device's
//!   memory banks, queried from the GPU runtime

pub mod runtime;
pub mod sysfs;

#[cfg(feature = "level-zero")]
pub mod level_zero;

pub use runtime::{DeviceCapacity, GpuRuntime, MemoryBank, RuntimeCapacityProbe};
pub use sysfs::SysfsVramProbe;

use vramwatch_shared::MemoryReading;

/// Source of the current used-memory figure
///
/// Reads are pure: no device state changes and nothing accumulates between
/// calls. A source that cannot be read reports zero instead of failing.
pub trait MemoryReporter {
    /// Label printed in front of each reading
    fn label(&self) -> &str {
        "GPU memory used"
    }

    fn read_memory(&self) -> MemoryReading;
}

impl<R: MemoryReporter + ?Sized> MemoryReporter for &R {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn read_memory(&self) -> MemoryReading {
        (**self).read_memory()
    }
}

impl<R: MemoryReporter + ?Sized> MemoryReporter for Box<R> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn read_memory(&self) -> MemoryReading {
        (**self).read_memory()
    }
}
