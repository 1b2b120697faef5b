//! Elementwise addition of 3-component `f32` vectors as a
//! [wgpu](https://github.com/gfx-rs/wgpu) compute kernel.
//!
//! The kernel computes `c[i] = a[i] + b[i]` with one invocation per
//! element.  Invocations are grouped into workgroups (64 lanes by default),
//! the grid is rounded up to whole workgroups and lanes past the end of the
//! data are guarded off inside the kernel.  Inputs are bound at slots 0 and
//! 1, the output at slot 2.
//!
//! The host API is synchronous and blocking: a dispatch waits for the GPU
//! to complete before returning.  A CPU path runs the same launch shape on
//! rayon and serves as a reference and fallback.
//!
//! ```no_run
//! use wgpu_vec3_add::{add_vectors, GpuContext, KernelConfig, Vec3, Vec3AddKernel};
//!
//! # fn main() -> wgpu_vec3_add::Result<()> {
//! let context = GpuContext::new_blocking()?;
//! let kernel = Vec3AddKernel::new(&context, &KernelConfig::default())?;
//! let c = add_vectors(
//!     &context,
//!     &kernel,
//!     &[Vec3::new(1.0, 2.0, 3.0)],
//!     &[Vec3::new(4.0, 5.0, 6.0)],
//! )?;
//! assert_eq!(c, vec![Vec3::new(5.0, 7.0, 9.0)]);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod buffer;
pub mod compute;
pub mod config;
pub mod context;
pub mod cpu;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod vector;

// Re-export the most common types at the crate root.
pub use backend::{CpuBackend, GpuBackend, Vec3AddBackend};
pub use buffer::GpuBuffer;
pub use compute::{add_vectors, Vec3AddKernel};
pub use config::{ContextOptions, KernelConfig, DEFAULT_WORKGROUP_SIZE};
pub use context::GpuContext;
pub use error::{ComputeError, Result};
pub use grid::DispatchGrid;
pub use vector::Vec3;
