//! oneDNN-backed matmul executor

use super::bindings::*;
use crate::compute::{DeviceBuffer, MatmulExecutor};
use crate::error::{GpuError, GpuResult};
use crate::tensor::check_conformable;
use std::ptr;
use tracing::{debug, info};

fn check(call: &'static str, status: dnnl_status_t) -> GpuResult<()> {
    GpuError::check(call, status as i64, DNNL_SUCCESS as i64)
}

/// Owning wrapper over a oneDNN handle; destroyed on drop
struct Handle {
    raw: *mut libc::c_void,
    destroy: unsafe extern "C" fn(*mut libc::c_void) -> dnnl_status_t,
}

impl Handle {
    fn new(
        raw: *mut libc::c_void,
        destroy: unsafe extern "C" fn(*mut libc::c_void) -> dnnl_status_t,
    ) -> Self {
        Self { raw, destroy }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            // Destroy status is not actionable during unwinding
            unsafe {
                (self.destroy)(self.raw);
            }
        }
    }
}

/// f32 row-major memory object on the executor's engine
pub struct DnnlBuffer {
    rows: usize,
    cols: usize,
    // Field order matters: the memory object goes before its descriptor
    memory: Handle,
    desc: Handle,
}

impl DeviceBuffer for DnnlBuffer {
    fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

impl DnnlBuffer {
    /// Map the buffer, run `f` over its elements and unmap again
    fn with_mapped<T>(&self, f: impl FnOnce(&mut [f32]) -> T) -> GpuResult<T> {
        let mut mapped: *mut libc::c_void = ptr::null_mut();
        check("dnnl_memory_map_data", unsafe {
            dnnl_memory_map_data(self.memory.raw, &mut mapped)
        })?;

        let slice =
            unsafe { std::slice::from_raw_parts_mut(mapped as *mut f32, self.rows * self.cols) };
        let out = f(slice);

        check("dnnl_memory_unmap_data", unsafe {
            dnnl_memory_unmap_data(self.memory.raw, mapped)
        })?;
        Ok(out)
    }
}

/// Matmul through a oneDNN primitive on a GPU engine
pub struct DnnlExecutor {
    // Stream must be released before the engine it was created on
    stream: Handle,
    engine: Handle,
}

impl DnnlExecutor {
    /// Create a GPU engine at `device_index` and an in-order stream on it
    pub fn new(device_index: usize) -> GpuResult<Self> {
        let mut engine: dnnl_engine_t = ptr::null_mut();
        check("dnnl_engine_create", unsafe {
            dnnl_engine_create(&mut engine, DNNL_GPU, device_index)
        })?;
        let engine = Handle::new(engine, dnnl_engine_destroy);

        let mut stream: dnnl_stream_t = ptr::null_mut();
        check("dnnl_stream_create", unsafe {
            dnnl_stream_create(&mut stream, engine.raw, DNNL_STREAM_IN_ORDER)
        })?;
        let stream = Handle::new(stream, dnnl_stream_destroy);

        info!("oneDNN GPU engine {} ready", device_index);
        Ok(Self { stream, engine })
    }
}

impl MatmulExecutor for DnnlExecutor {
    type Buffer = DnnlBuffer;

    fn name(&self) -> &'static str {
        "onednn"
    }

    fn allocate(&mut self, rows: usize, cols: usize) -> GpuResult<DnnlBuffer> {
        let dims: [dnnl_dim_t; 2] = [rows as dnnl_dim_t, cols as dnnl_dim_t];

        let mut desc: dnnl_memory_desc_t = ptr::null_mut();
        check("dnnl_memory_desc_create_with_tag", unsafe {
            dnnl_memory_desc_create_with_tag(
                &mut desc,
                2,
                dims.as_ptr(),
                DNNL_F32,
                DNNL_FORMAT_TAG_AB,
            )
        })?;
        let desc = Handle::new(desc, dnnl_memory_desc_destroy);

        let mut memory: dnnl_memory_t = ptr::null_mut();
        check("dnnl_memory_create", unsafe {
            dnnl_memory_create(&mut memory, desc.raw, self.engine.raw, DNNL_MEMORY_ALLOCATE)
        })?;
        let memory = Handle::new(memory, dnnl_memory_destroy);

        debug!("Allocated {}x{} oneDNN memory", rows, cols);
        Ok(DnnlBuffer {
            rows,
            cols,
            memory,
            desc,
        })
    }

    fn fill(&mut self, buffer: &mut DnnlBuffer, value: f32) -> GpuResult<()> {
        buffer.with_mapped(|data| data.fill(value))
    }

    fn matmul(&mut self, a: &DnnlBuffer, b: &DnnlBuffer, c: &mut DnnlBuffer) -> GpuResult<()> {
        check_conformable(a.dims(), b.dims(), c.dims())?;

        let mut pd: dnnl_primitive_desc_t = ptr::null_mut();
        check("dnnl_matmul_primitive_desc_create", unsafe {
            dnnl_matmul_primitive_desc_create(
                &mut pd,
                self.engine.raw,
                a.desc.raw,
                b.desc.raw,
                ptr::null_mut(),
                c.desc.raw,
                ptr::null_mut(),
            )
        })?;
        let pd = Handle::new(pd, dnnl_primitive_desc_destroy);

        let mut primitive: dnnl_primitive_t = ptr::null_mut();
        check("dnnl_primitive_create", unsafe {
            dnnl_primitive_create(&mut primitive, pd.raw)
        })?;
        let primitive = Handle::new(primitive, dnnl_primitive_destroy);

        let args = [
            dnnl_exec_arg_t {
                arg: DNNL_ARG_SRC,
                memory: a.memory.raw,
            },
            dnnl_exec_arg_t {
                arg: DNNL_ARG_WEIGHTS,
                memory: b.memory.raw,
            },
            dnnl_exec_arg_t {
                arg: DNNL_ARG_DST,
                memory: c.memory.raw,
            },
        ];

        check("dnnl_primitive_execute", unsafe {
            dnnl_primitive_execute(
                primitive.raw,
                self.stream.raw,
                args.len() as libc::c_int,
                args.as_ptr(),
            )
        })?;
        check("dnnl_stream_wait", unsafe { dnnl_stream_wait(self.stream.raw) })
    }

    fn read(&mut self, buffer: &DnnlBuffer) -> GpuResult<Vec<f32>> {
        buffer.with_mapped(|data| data.to_vec())
    }
}
