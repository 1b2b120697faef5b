//! Interchangeable executors for the add kernel.

use crate::compute::{self, Vec3AddKernel};
use crate::config::{ContextOptions, KernelConfig};
use crate::context::GpuContext;
use crate::cpu;
use crate::error::Result;
use crate::vector::Vec3;

/// Something that can add two equal-length arrays of [`Vec3`].
///
/// Every implementation runs the same kernel contract and returns
/// bit-identical results for the same inputs.
pub trait Vec3AddBackend {
    fn name(&self) -> &'static str;

    fn add(&self, a: &[Vec3], b: &[Vec3]) -> Result<Vec<Vec3>>;
}

/// Runs workgroups as rayon tasks.
#[derive(Clone, Debug, Default)]
pub struct CpuBackend {
    pub config: KernelConfig,
}

impl CpuBackend {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }
}

impl Vec3AddBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn add(&self, a: &[Vec3], b: &[Vec3]) -> Result<Vec<Vec3>> {
        cpu::add_vectors(a, b, &self.config)
    }
}

/// Owns a device and a compiled pipeline.
pub struct GpuBackend {
    context: GpuContext,
    kernel: Vec3AddKernel,
}

impl GpuBackend {
    pub fn new(options: &ContextOptions, config: &KernelConfig) -> Result<Self> {
        let context = GpuContext::with_options(options)?;
        Self::from_context(context, config)
    }

    pub fn from_context(context: GpuContext, config: &KernelConfig) -> Result<Self> {
        let kernel = Vec3AddKernel::new(&context, config)?;
        Ok(Self { context, kernel })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn kernel(&self) -> &Vec3AddKernel {
        &self.kernel
    }
}

impl Vec3AddBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn add(&self, a: &[Vec3], b: &[Vec3]) -> Result<Vec<Vec3>> {
        compute::add_vectors(&self.context, &self.kernel, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_backend_through_the_trait_object() {
        let backend: Box<dyn Vec3AddBackend> = Box::new(CpuBackend::default());
        assert_eq!(backend.name(), "cpu");
        let c = backend
            .add(&[Vec3::new(1.0, 2.0, 3.0)], &[Vec3::new(4.0, 5.0, 6.0)])
            .unwrap();
        assert_eq!(c, vec![Vec3::new(5.0, 7.0, 9.0)]);
    }
}
