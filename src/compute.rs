//! Host side of the add kernel on the GPU.
//!
//! [`Vec3AddKernel`] compiles the shader, bind group layout and compute
//! pipeline once and can then be dispatched any number of times over
//! buffers the caller owns.  [`add_vectors`] is the one-shot path that
//! uploads two slices, runs the kernel and reads the sum back.

use std::num::NonZeroU64;

use log::debug;
use wgpu::{self, util::DeviceExt, BufferUsages, ShaderModuleDescriptor, ShaderSource};

use crate::buffer::GpuBuffer;
use crate::config::KernelConfig;
use crate::context::GpuContext;
use crate::error::{check_bindings, ComputeError, Result};
use crate::grid::DispatchGrid;
use crate::kernel::{self, DispatchParams, BINDING_A, BINDING_B, BINDING_C, BINDING_PARAMS};
use crate::vector::Vec3;

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(std::mem::size_of::<Vec3>() as u64),
        },
        count: None,
    }
}

/// Runs `f` inside a validation error scope and reports anything wgpu
/// raised while it ran.
fn validated<R>(context: &GpuContext, f: impl FnOnce() -> R) -> (R, Option<wgpu::Error>) {
    context.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = f();
    let error = pollster::block_on(context.device.pop_error_scope());
    (result, error)
}

/// A compiled elementwise add pipeline.
pub struct Vec3AddKernel {
    config: KernelConfig,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl Vec3AddKernel {
    /// Compile the kernel for `context`'s device.
    ///
    /// Fails if the configured workgroup size exceeds the device limits or
    /// if the device rejects the shader or pipeline.
    pub fn new(context: &GpuContext, config: &KernelConfig) -> Result<Self> {
        let max = context.max_workgroup_size();
        if config.workgroup_size == 0 || config.workgroup_size > max {
            return Err(ComputeError::InvalidWorkgroupSize {
                requested: config.workgroup_size,
                max,
            });
        }
        let source = kernel::wgsl_source(config.workgroup_size);
        let ((bind_group_layout, pipeline), error) = validated(context, || {
            let module = context.device.create_shader_module(ShaderModuleDescriptor {
                label: Some("vec3_add_shader"),
                source: ShaderSource::Wgsl(source.as_str().into()),
            });
            let bind_group_layout =
                context
                    .device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("vec3_add_bind_group_layout"),
                        entries: &[
                            storage_entry(BINDING_A, true),
                            storage_entry(BINDING_B, true),
                            storage_entry(BINDING_C, false),
                            wgpu::BindGroupLayoutEntry {
                                binding: BINDING_PARAMS,
                                visibility: wgpu::ShaderStages::COMPUTE,
                                ty: wgpu::BindingType::Buffer {
                                    ty: wgpu::BufferBindingType::Uniform,
                                    has_dynamic_offset: false,
                                    min_binding_size: NonZeroU64::new(
                                        std::mem::size_of::<DispatchParams>() as u64,
                                    ),
                                },
                                count: None,
                            },
                        ],
                    });
            let pipeline_layout =
                context
                    .device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("vec3_add_pipeline_layout"),
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    });
            let pipeline =
                context
                    .device
                    .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                        label: Some("vec3_add_pipeline"),
                        layout: Some(&pipeline_layout),
                        module: &module,
                        entry_point: Some(kernel::ENTRY_POINT),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        cache: None,
                    });
            (bind_group_layout, pipeline)
        });
        if let Some(error) = error {
            return Err(ComputeError::ShaderValidation(error.to_string()));
        }
        debug!(
            "compiled vec3 add kernel with workgroup size {}",
            config.workgroup_size
        );
        Ok(Self {
            config: config.clone(),
            bind_group_layout,
            pipeline,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn workgroup_size(&self) -> u32 {
        self.config.workgroup_size
    }

    /// The grid a dispatch of `len` elements would launch on `context`.
    pub fn plan(&self, context: &GpuContext, len: usize) -> Result<DispatchGrid> {
        DispatchGrid::for_len(
            len,
            self.config.workgroup_size,
            context.max_workgroups_per_dimension(),
        )
    }

    /// Compute `c[i] = a[i] + b[i]` for every `i < len` and wait for the
    /// GPU to finish.
    ///
    /// The three buffers must share one capacity and `len` must not exceed
    /// it.  Slots of `c` at `len` and beyond keep their previous contents.
    /// A zero `len` submits nothing.
    pub fn dispatch(
        &self,
        context: &GpuContext,
        a: &GpuBuffer<Vec3>,
        b: &GpuBuffer<Vec3>,
        c: &GpuBuffer<Vec3>,
        len: usize,
    ) -> Result<()> {
        check_bindings(a.len(), b.len(), c.len(), len)?;
        if len == 0 {
            debug!("skipping empty dispatch");
            return Ok(());
        }
        let grid = self.plan(context, len)?;
        let max_elements = context.max_storage_elements::<Vec3>();
        if a.len() > max_elements {
            return Err(ComputeError::CapacityExceeded {
                requested: a.len(),
                capacity: max_elements,
            });
        }
        // The grid already bounds every global index by u32::MAX.
        let params = DispatchParams::new(&grid, len as u32);
        let (groups_x, groups_y) = grid.groups();
        debug!(
            "gpu dispatch: {len} elements as {groups_x}x{groups_y} workgroups of {} lanes ({} guarded)",
            grid.workgroup_size(),
            grid.padding(len)
        );

        let ((), error) = validated(context, || {
            let params_buffer =
                context
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("vec3_add_params"),
                        contents: bytemuck::bytes_of(&params),
                        usage: BufferUsages::UNIFORM,
                    });
            let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("vec3_add_bind_group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: BINDING_A,
                        resource: a.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: BINDING_B,
                        resource: b.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: BINDING_C,
                        resource: c.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: BINDING_PARAMS,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });
            let mut encoder =
                context
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("vec3_add_encoder"),
                    });
            {
                let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("vec3_add_pass"),
                    timestamp_writes: None,
                });
                cpass.set_pipeline(&self.pipeline);
                cpass.set_bind_group(0, &bind_group, &[]);
                cpass.dispatch_workgroups(groups_x, groups_y, 1);
            }
            context.queue.submit([encoder.finish()]);
        });
        if let Some(error) = error {
            return Err(ComputeError::Dispatch(error.to_string()));
        }
        context.wait_idle()
    }
}

/// Add two equal-length slices on the GPU and return the sum.
///
/// Uploads both inputs, allocates an output of the same length, runs
/// `kernel` and reads the result back.  Empty inputs return an empty
/// vector without touching the device.
pub fn add_vectors(
    context: &GpuContext,
    kernel: &Vec3AddKernel,
    a: &[Vec3],
    b: &[Vec3],
) -> Result<Vec<Vec3>> {
    check_bindings(a.len(), b.len(), a.len(), a.len())?;
    if a.is_empty() {
        return Ok(Vec::new());
    }
    let buffer_a = GpuBuffer::from_slice(context, a, BufferUsages::empty());
    let buffer_b = GpuBuffer::from_slice(context, b, BufferUsages::empty());
    let output = GpuBuffer::new_output(context, a.len(), BufferUsages::empty())?;
    kernel.dispatch(context, &buffer_a, &buffer_b, &output, a.len())?;
    output.read_to_vec(context)
}
