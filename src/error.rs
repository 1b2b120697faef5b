//! Host-side error type.
//!
//! The kernel body itself has no way to report failure.  Everything that
//! can go wrong is caught on the host before or around a dispatch and
//! surfaced as a [`ComputeError`].

use thiserror::Error;

/// Errors raised while acquiring the GPU, planning a dispatch or moving
/// data between host and device.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("unable to find a suitable GPU adapter: {0}")]
    AdapterUnavailable(#[from] wgpu::RequestAdapterError),

    #[error("adapter `{adapter}` does not support compute shaders")]
    ComputeUnsupported { adapter: String },

    #[error("failed to create GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("workgroup size {requested} is outside 1..={max}")]
    InvalidWorkgroupSize { requested: u32, max: u32 },

    #[error("cannot cover {len} elements with workgroups of {workgroup_size} lanes")]
    GridTooLarge { len: usize, workgroup_size: u32 },

    #[error("grid of {invocations} invocations cannot cover {len} elements")]
    GridTooSmall { len: usize, invocations: u64 },

    #[error("bound arrays differ in length: a = {a}, b = {b}, c = {c}")]
    LengthMismatch { a: usize, b: usize, c: usize },

    #[error("{requested} elements requested but buffer holds {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("shader or pipeline validation failed: {0}")]
    ShaderValidation(String),

    #[error("dispatch rejected by the device: {0}")]
    Dispatch(String),

    #[error("failed to map buffer for reading: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("device polling failed: {0}")]
    DevicePoll(#[from] wgpu::PollError),
}

pub type Result<T> = std::result::Result<T, ComputeError>;

/// Checks the host-side binding contract shared by every backend: the three
/// arrays have one common capacity and the logical length fits inside it.
pub(crate) fn check_bindings(a: usize, b: usize, c: usize, len: usize) -> Result<()> {
    if a != b || a != c {
        return Err(ComputeError::LengthMismatch { a, b, c });
    }
    if len > a {
        return Err(ComputeError::CapacityExceeded {
            requested: len,
            capacity: a,
        });
    }
    Ok(())
}
