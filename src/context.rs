//! GPU context initialization.
//!
//! This module provides a thin wrapper around wgpu's instance, adapter,
//! device and queue objects.  The `new_blocking` constructor hides the
//! asynchronous nature of requesting an adapter and device by using the
//! [`pollster`] crate.

use log::info;
use wgpu::{Adapter, Device, Instance, Queue};

use crate::config::ContextOptions;
use crate::error::{ComputeError, Result};

/// A GPU context encapsulates all state needed to submit compute work.
///
/// The context holds on to the `Instance`, `Adapter`, `Device` and
/// `Queue`.  Those types have internal reference counting so they can
/// cheaply be cloned if you need multiple references.
pub struct GpuContext {
    /// The global GPU instance.  In headless compute applications the
    /// instance is still required to request an adapter.
    pub instance: Instance,
    /// The physical device selected for computation.
    pub adapter: Adapter,
    /// Logical device used to create resources and command encoders.
    pub device: Device,
    /// Command submission queue.
    pub queue: Queue,
}

impl GpuContext {
    /// Create a new GPU context synchronously with default options.
    ///
    /// Blocks the current thread while the adapter and device requests
    /// complete.  Use [`Self::new_async`] inside an async runtime.
    pub fn new_blocking() -> Result<Self> {
        Self::with_options(&ContextOptions::default())
    }

    /// Create a new GPU context asynchronously with default options.
    pub async fn new_async() -> Result<Self> {
        Self::with_options_async(&ContextOptions::default()).await
    }

    /// Blocking variant of [`Self::with_options_async`].
    pub fn with_options(options: &ContextOptions) -> Result<Self> {
        pollster::block_on(Self::with_options_async(options))
    }

    /// Pick an adapter according to `options`, check that it can run
    /// compute shaders and open a device on it.
    pub async fn with_options_async(options: &ContextOptions) -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                force_fallback_adapter: options.force_fallback_adapter,
                compatible_surface: None,
            })
            .await?;
        let adapter_info = adapter.get_info();
        // Downlevel devices may not support compute on all backends.
        let capabilities = adapter.get_downlevel_capabilities();
        if !capabilities.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
            return Err(ComputeError::ComputeUnsupported {
                adapter: adapter_info.name,
            });
        }
        info!(
            "using adapter `{}` ({:?}, {:?})",
            adapter_info.name, adapter_info.backend, adapter_info.device_type
        );
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("vec3_add_device"),
                required_features: wgpu::Features::empty(),
                required_limits: options.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await?;
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Largest number of workgroups the device accepts along one axis.
    pub fn max_workgroups_per_dimension(&self) -> u32 {
        self.device.limits().max_compute_workgroups_per_dimension
    }

    /// Largest one-dimensional workgroup the device accepts.
    pub fn max_workgroup_size(&self) -> u32 {
        let limits = self.device.limits();
        limits
            .max_compute_workgroup_size_x
            .min(limits.max_compute_invocations_per_workgroup)
    }

    /// Most elements of `T` a single storage binding may hold.
    pub fn max_storage_elements<T>(&self) -> usize {
        let bytes = self.device.limits().max_storage_buffer_binding_size as usize;
        bytes / std::mem::size_of::<T>().max(1)
    }

    /// Block until all submitted work has finished.
    pub fn wait_idle(&self) -> Result<()> {
        self.device.poll(wgpu::PollType::Wait)?;
        Ok(())
    }
}
