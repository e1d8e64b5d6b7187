//! oneDNN C API bindings
//!
//! Only the handful of entry points needed to build and run one f32 matmul
//! primitive. Declarations follow `dnnl.h` / `dnnl_types.h` (v3 API).

#![allow(non_camel_case_types, dead_code)]

use libc::{c_int, c_uint, c_void};

pub type dnnl_status_t = c_int;
pub type dnnl_engine_kind_t = c_int;
pub type dnnl_data_type_t = c_int;
pub type dnnl_format_tag_t = c_int;
pub type dnnl_dim_t = i64;

pub type dnnl_engine_t = *mut c_void;
pub type dnnl_stream_t = *mut c_void;
pub type dnnl_memory_desc_t = *mut c_void;
pub type dnnl_memory_t = *mut c_void;
pub type dnnl_primitive_desc_t = *mut c_void;
pub type dnnl_primitive_t = *mut c_void;
pub type dnnl_primitive_attr_t = *mut c_void;

pub const DNNL_SUCCESS: dnnl_status_t = 0;

pub const DNNL_GPU: dnnl_engine_kind_t = 2;
pub const DNNL_STREAM_IN_ORDER: c_uint = 0x1;
pub const DNNL_F32: dnnl_data_type_t = 3;
pub const DNNL_FORMAT_TAG_AB: dnnl_format_tag_t = 3;

pub const DNNL_ARG_SRC: c_int = 1;
pub const DNNL_ARG_DST: c_int = 17;
pub const DNNL_ARG_WEIGHTS: c_int = 33;

/// Ask the library to allocate the memory object's storage itself
pub const DNNL_MEMORY_ALLOCATE: *mut c_void = usize::MAX as *mut c_void;

#[repr(C)]
pub struct dnnl_exec_arg_t {
    pub arg: c_int,
    pub memory: dnnl_memory_t,
}

#[link(name = "dnnl")]
extern "C" {
    pub fn dnnl_engine_create(
        engine: *mut dnnl_engine_t,
        kind: dnnl_engine_kind_t,
        index: usize,
    ) -> dnnl_status_t;
    pub fn dnnl_engine_destroy(engine: dnnl_engine_t) -> dnnl_status_t;

    pub fn dnnl_stream_create(
        stream: *mut dnnl_stream_t,
        engine: dnnl_engine_t,
        flags: c_uint,
    ) -> dnnl_status_t;
    pub fn dnnl_stream_wait(stream: dnnl_stream_t) -> dnnl_status_t;
    pub fn dnnl_stream_destroy(stream: dnnl_stream_t) -> dnnl_status_t;

    pub fn dnnl_memory_desc_create_with_tag(
        memory_desc: *mut dnnl_memory_desc_t,
        ndims: c_int,
        dims: *const dnnl_dim_t,
        data_type: dnnl_data_type_t,
        tag: dnnl_format_tag_t,
    ) -> dnnl_status_t;
    pub fn dnnl_memory_desc_destroy(memory_desc: dnnl_memory_desc_t) -> dnnl_status_t;

    pub fn dnnl_memory_create(
        memory: *mut dnnl_memory_t,
        memory_desc: dnnl_memory_desc_t,
        engine: dnnl_engine_t,
        handle: *mut c_void,
    ) -> dnnl_status_t;
    pub fn dnnl_memory_map_data(memory: dnnl_memory_t, mapped_ptr: *mut *mut c_void)
        -> dnnl_status_t;
    pub fn dnnl_memory_unmap_data(memory: dnnl_memory_t, mapped_ptr: *mut c_void)
        -> dnnl_status_t;
    pub fn dnnl_memory_destroy(memory: dnnl_memory_t) -> dnnl_status_t;

    pub fn dnnl_matmul_primitive_desc_create(
        primitive_desc: *mut dnnl_primitive_desc_t,
        engine: dnnl_engine_t,
        src_desc: dnnl_memory_desc_t,
        weights_desc: dnnl_memory_desc_t,
        bias_desc: dnnl_memory_desc_t,
        dst_desc: dnnl_memory_desc_t,
        attr: dnnl_primitive_attr_t,
    ) -> dnnl_status_t;
    pub fn dnnl_primitive_desc_destroy(primitive_desc: dnnl_primitive_desc_t) -> dnnl_status_t;

    pub fn dnnl_primitive_create(
        primitive: *mut dnnl_primitive_t,
        primitive_desc: dnnl_primitive_desc_t,
    ) -> dnnl_status_t;
    pub fn dnnl_primitive_execute(
        primitive: dnnl_primitive_t,
        stream: dnnl_stream_t,
        nargs: c_int,
        args: *const dnnl_exec_arg_t,
    ) -> dnnl_status_t;
    pub fn dnnl_primitive_destroy(primitive: dnnl_primitive_t) -> dnnl_status_t;
}
