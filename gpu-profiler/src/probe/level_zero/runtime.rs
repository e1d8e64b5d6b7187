//! [`GpuRuntime`] over the Level Zero loader

use super::bindings::*;
use crate::error::{GpuError, GpuResult};
use crate::probe::runtime::{GpuRuntime, MemoryBank};
use std::ffi::CStr;
use std::ptr;

fn check(call: &'static str, result: ze_result_t) -> GpuResult<()> {
    GpuError::check(call, result as i64, ZE_RESULT_SUCCESS as i64)
}

#[derive(Debug, Clone, Copy)]
pub struct Driver(ze_driver_handle_t);

impl Default for Driver {
    fn default() -> Self {
        Self(ptr::null_mut())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Device(ze_device_handle_t);

impl Default for Device {
    fn default() -> Self {
        Self(ptr::null_mut())
    }
}

/// Level Zero driver/device enumeration
#[derive(Debug, Default)]
pub struct LevelZeroRuntime;

impl LevelZeroRuntime {
    pub fn new() -> Self {
        Self
    }
}

/// Fetch up to `out.len()` raw handles and wrap them
fn fetch_handles<H: Copy, W>(
    out: &mut [W],
    wrap: impl Fn(H) -> W,
    null: H,
    call: impl FnOnce(*mut u32, *mut H) -> ze_result_t,
    name: &'static str,
) -> GpuResult<usize> {
    let mut count = out.len() as u32;
    let mut raw = vec![null; out.len()];
    check(name, call(&mut count, raw.as_mut_ptr()))?;
    let written = (count as usize).min(out.len());
    for (slot, handle) in out.iter_mut().zip(raw.into_iter().take(written)) {
        *slot = wrap(handle);
    }
    Ok(written)
}

impl GpuRuntime for LevelZeroRuntime {
    type Driver = Driver;
    type Device = Device;

    fn init(&mut self) -> GpuResult<()> {
        check("zeInit", unsafe { zeInit(0) })
    }

    fn drivers(&self, out: Option<&mut [Driver]>) -> GpuResult<usize> {
        match out {
            None => {
                let mut count = 0u32;
                check("zeDriverGet", unsafe {
                    zeDriverGet(&mut count, ptr::null_mut())
                })?;
                Ok(count as usize)
            }
            Some(out) => fetch_handles(
                out,
                Driver,
                ptr::null_mut(),
                |count, raw| unsafe { zeDriverGet(count, raw) },
                "zeDriverGet",
            ),
        }
    }

    fn devices(&self, driver: Driver, out: Option<&mut [Device]>) -> GpuResult<usize> {
        match out {
            None => {
                let mut count = 0u32;
                check("zeDeviceGet", unsafe {
                    zeDeviceGet(driver.0, &mut count, ptr::null_mut())
                })?;
                Ok(count as usize)
            }
            Some(out) => fetch_handles(
                out,
                Device,
                ptr::null_mut(),
                |count, raw| unsafe { zeDeviceGet(driver.0, count, raw) },
                "zeDeviceGet",
            ),
        }
    }

    fn memory_properties(
        &self,
        device: Device,
        out: Option<&mut [MemoryBank]>,
    ) -> GpuResult<usize> {
        let mut count = out.as_ref().map(|o| o.len()).unwrap_or(0) as u32;
        let Some(out) = out else {
            check("zeDeviceGetMemoryProperties", unsafe {
                zeDeviceGetMemoryProperties(device.0, &mut count, ptr::null_mut())
            })?;
            return Ok(count as usize);
        };

        let mut raw = vec![ze_device_memory_properties_t::default(); out.len()];
        check("zeDeviceGetMemoryProperties", unsafe {
            zeDeviceGetMemoryProperties(device.0, &mut count, raw.as_mut_ptr())
        })?;

        let written = (count as usize).min(out.len());
        for (slot, props) in out.iter_mut().zip(&raw[..written]) {
            let name = unsafe { CStr::from_ptr(props.name.as_ptr()) };
            *slot = MemoryBank {
                name: name.to_string_lossy().into_owned(),
                total_size: props.totalSize,
            };
        }
        Ok(written)
    }
}
