//! Level Zero loader bindings
//!
//! Declarations follow `ze_api.h`; only the enumeration and memory-property
//! entry points are bound.

#![allow(non_camel_case_types, non_snake_case, dead_code)]

use libc::{c_char, c_void};

pub type ze_result_t = u32;
pub type ze_init_flags_t = u32;
pub type ze_structure_type_t = u32;
pub type ze_driver_handle_t = *mut c_void;
pub type ze_device_handle_t = *mut c_void;

pub const ZE_RESULT_SUCCESS: ze_result_t = 0;
pub const ZE_STRUCTURE_TYPE_DEVICE_MEMORY_PROPERTIES: ze_structure_type_t = 0x7;
pub const ZE_MAX_DEVICE_NAME: usize = 256;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct ze_device_memory_properties_t {
    pub stype: ze_structure_type_t,
    pub pNext: *mut c_void,
    pub flags: u32,
    pub maxClockRate: u32,
    pub maxBusWidth: u32,
    pub totalSize: u64,
    pub name: [c_char; ZE_MAX_DEVICE_NAME],
}

impl Default for ze_device_memory_properties_t {
    fn default() -> Self {
        Self {
            stype: ZE_STRUCTURE_TYPE_DEVICE_MEMORY_PROPERTIES,
            pNext: std::ptr::null_mut(),
            flags: 0,
            maxClockRate: 0,
            maxBusWidth: 0,
            totalSize: 0,
            name: [0; ZE_MAX_DEVICE_NAME],
        }
    }
}

#[link(name = "ze_loader")]
extern "C" {
    pub fn zeInit(flags: ze_init_flags_t) -> ze_result_t;
    pub fn zeDriverGet(pCount: *mut u32, phDrivers: *mut ze_driver_handle_t) -> ze_result_t;
    pub fn zeDeviceGet(
        hDriver: ze_driver_handle_t,
        pCount: *mut u32,
        phDevices: *mut ze_device_handle_t,
    ) -> ze_result_t;
    pub fn zeDeviceGetMemoryProperties(
        hDevice: ze_device_handle_t,
        pCount: *mut u32,
        pMemProperties: *mut ze_device_memory_properties_t,
    ) -> ze_result_t;
}
