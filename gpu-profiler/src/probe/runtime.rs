//! GPU runtime capacity queries
//!
//! Low-level GPU runtimes expose memory topology through a fixed handshake:
//! initialize, enumerate drivers, enumerate the devices of a driver, then
//! query each device's memory banks. Every enumeration step is
//! count-then-fetch: ask for the count with no buffer, then fetch into a
//! buffer of that size.

use crate::error::{GpuError, GpuResult};
use serde::Serialize;
use tracing::{debug, info};
use vramwatch_shared::{MemoryReading, MemoryUnit};

/// One physically distinct memory pool of a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryBank {
    pub name: String,
    /// Capacity in bytes
    pub total_size: u64,
}

/// The low-level GPU runtime, reduced to the calls the capacity query needs
///
/// The enumeration methods follow count-then-fetch: with `None` they return
/// the number of items available; with `Some(buf)` they fill at most
/// `buf.len()` entries and return how many were written.
pub trait GpuRuntime {
    type Driver: Copy + Default;
    type Device: Copy + Default;

    fn init(&mut self) -> GpuResult<()>;

    fn drivers(&self, out: Option<&mut [Self::Driver]>) -> GpuResult<usize>;

    fn devices(
        &self,
        driver: Self::Driver,
        out: Option<&mut [Self::Device]>,
    ) -> GpuResult<usize>;

    fn memory_properties(
        &self,
        device: Self::Device,
        out: Option<&mut [MemoryBank]>,
    ) -> GpuResult<usize>;
}

/// Run one count-then-fetch exchange
pub fn enumerate<T, F>(mut query: F) -> GpuResult<Vec<T>>
where
    T: Clone + Default,
    F: FnMut(Option<&mut [T]>) -> GpuResult<usize>,
{
    let count = query(None)?;
    let mut items = vec![T::default(); count];
    if count > 0 {
        let written = query(Some(&mut items))?;
        items.truncate(written);
    }
    Ok(items)
}

/// Memory banks of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCapacity {
    /// Position of the device within the first driver
    pub device: usize,
    pub banks: Vec<MemoryBank>,
}

impl DeviceCapacity {
    pub fn first_bank(&self) -> Option<&MemoryBank> {
        self.banks.first()
    }

    pub fn total_bytes(&self) -> u64 {
        self.banks.iter().map(|b| b.total_size).sum()
    }

    /// Capacity of bank 0 in megabytes (0 if the device reports no banks)
    pub fn first_bank_mb(&self) -> MemoryReading {
        let bytes = self.first_bank().map(|b| b.total_size).unwrap_or(0);
        MemoryReading::from_bytes(bytes, MemoryUnit::Megabytes)
    }

    /// Capacity of all banks in megabytes
    pub fn total_mb(&self) -> MemoryReading {
        MemoryReading::from_bytes(self.total_bytes(), MemoryUnit::Megabytes)
    }
}

/// Walks the runtime handshake to report per-device memory capacity
pub struct RuntimeCapacityProbe<R: GpuRuntime> {
    runtime: R,
    initialized: bool,
}

impl<R: GpuRuntime> RuntimeCapacityProbe<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            initialized: false,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn ensure_initialized(&mut self) -> GpuResult<()> {
        if !self.initialized {
            self.runtime.init()?;
            self.initialized = true;
            info!("GPU runtime initialized");
        }
        Ok(())
    }

    /// Memory banks of every device under the first driver
    ///
    /// A runtime without drivers, or a first driver without devices, is an
    /// initialization error.
    pub fn device_capacities(&mut self) -> GpuResult<Vec<DeviceCapacity>> {
        self.ensure_initialized()?;
        let runtime = &self.runtime;

        let drivers = enumerate(|out| runtime.drivers(out))?;
        let driver = *drivers.first().ok_or(GpuError::NoDriver)?;
        debug!("{} driver(s), using the first", drivers.len());

        let devices = enumerate(|out| runtime.devices(driver, out))?;
        if devices.is_empty() {
            return Err(GpuError::NoDevice { driver: 0 });
        }

        devices
            .iter()
            .enumerate()
            .map(|(index, &device)| {
                let banks = enumerate(|out| runtime.memory_properties(device, out))?;
                debug!("Device {}: {} memory bank(s)", index, banks.len());
                Ok(DeviceCapacity {
                    device: index,
                    banks,
                })
            })
            .collect()
    }

    /// Capacity of bank 0 of `device`, in megabytes
    pub fn read_capacity_mb(&mut self, device: usize) -> GpuResult<MemoryReading> {
        let capacities = self.device_capacities()?;
        let count = capacities.len();
        capacities
            .get(device)
            .map(DeviceCapacity::first_bank_mb)
            .ok_or(GpuError::DeviceIndex {
                index: device,
                count,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Scripted runtime: devices are indexes into `banks`
    #[derive(Default)]
    struct ScriptedRuntime {
        drivers: usize,
        banks: Vec<Vec<u64>>,
        calls: RefCell<Vec<String>>,
        inits: usize,
    }

    impl ScriptedRuntime {
        fn record(&self, call: &str, out: bool) {
            let phase = if out { "fetch" } else { "count" };
            self.calls.borrow_mut().push(format!("{}:{}", call, phase));
        }
    }

    fn fetch<T: Clone>(items: &[T], out: Option<&mut [T]>) -> usize {
        match out {
            None => items.len(),
            Some(buf) => {
                let n = buf.len().min(items.len());
                buf[..n].clone_from_slice(&items[..n]);
                n
            }
        }
    }

    impl GpuRuntime for ScriptedRuntime {
        type Driver = usize;
        type Device = usize;

        fn init(&mut self) -> GpuResult<()> {
            self.inits += 1;
            Ok(())
        }

        fn drivers(&self, out: Option<&mut [usize]>) -> GpuResult<usize> {
            self.record("drivers", out.is_some());
            let drivers: Vec<usize> = (0..self.drivers).collect();
            Ok(fetch(&drivers, out))
        }

        fn devices(&self, _driver: usize, out: Option<&mut [usize]>) -> GpuResult<usize> {
            self.record("devices", out.is_some());
            let devices: Vec<usize> = (0..self.banks.len()).collect();
            Ok(fetch(&devices, out))
        }

        fn memory_properties(
            &self,
            device: usize,
            out: Option<&mut [MemoryBank]>,
        ) -> GpuResult<usize> {
            self.record("memory", out.is_some());
            let banks: Vec<MemoryBank> = self.banks[device]
                .iter()
                .enumerate()
                .map(|(i, &total_size)| MemoryBank {
                    name: format!("bank{}", i),
                    total_size,
                })
                .collect();
            Ok(fetch(&banks, out))
        }
    }

    fn two_devices() -> ScriptedRuntime {
        ScriptedRuntime {
            drivers: 1,
            banks: vec![vec![4_294_967_296], vec![8_589_934_592]],
            ..Default::default()
        }
    }

    #[test]
    fn test_two_devices_report_megabytes() {
        let mut probe = RuntimeCapacityProbe::new(two_devices());

        assert_eq!(probe.read_capacity_mb(0).unwrap().value, 4096);
        assert_eq!(probe.read_capacity_mb(1).unwrap().value, 8192);
        assert_eq!(probe.read_capacity_mb(1).unwrap().to_string(), "8192 MB");
        assert_eq!(probe.runtime().inits, 1);
    }

    #[test]
    fn test_count_precedes_fetch() {
        let mut probe = RuntimeCapacityProbe::new(two_devices());
        probe.device_capacities().unwrap();

        let calls = probe.runtime().calls.borrow().clone();
        assert_eq!(
            calls,
            vec![
                "drivers:count",
                "drivers:fetch",
                "devices:count",
                "devices:fetch",
                "memory:count",
                "memory:fetch",
                "memory:count",
                "memory:fetch",
            ]
        );
    }

    #[test]
    fn test_multiple_banks() {
        let runtime = ScriptedRuntime {
            drivers: 1,
            banks: vec![vec![1024 * 1024 * 1024, 512 * 1024 * 1024]],
            ..Default::default()
        };
        let mut probe = RuntimeCapacityProbe::new(runtime);
        let capacities = probe.device_capacities().unwrap();

        assert_eq!(capacities[0].first_bank_mb().value, 1024);
        assert_eq!(capacities[0].total_mb().value, 1536);
    }

    #[test]
    fn test_missing_driver_is_fatal() {
        let mut probe = RuntimeCapacityProbe::new(ScriptedRuntime::default());
        assert!(matches!(probe.device_capacities(), Err(GpuError::NoDriver)));
    }

    #[test]
    fn test_missing_device_is_fatal() {
        let runtime = ScriptedRuntime {
            drivers: 1,
            ..Default::default()
        };
        let mut probe = RuntimeCapacityProbe::new(runtime);
        assert!(matches!(
            probe.device_capacities(),
            Err(GpuError::NoDevice { driver: 0 })
        ));
    }

    #[test]
    fn test_device_index_out_of_range() {
        let mut probe = RuntimeCapacityProbe::new(two_devices());
        assert!(matches!(
            probe.read_capacity_mb(2),
            Err(GpuError::DeviceIndex { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_device_without_banks_reports_zero() {
        let capacity = DeviceCapacity {
            device: 0,
            banks: Vec::new(),
        };
        assert_eq!(capacity.first_bank_mb().value, 0);
        assert_eq!(capacity.total_bytes(), 0);
    }
}
