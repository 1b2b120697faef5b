//! Tunables for the kernel and for GPU acquisition.

use wgpu::{Backends, Limits, PowerPreference};

/// Lanes per workgroup used when nothing else is requested.
pub const DEFAULT_WORKGROUP_SIZE: u32 = 64;

/// Kernel launch configuration.
///
/// The workgroup size only affects occupancy.  Any value the device accepts
/// produces the same output, because the dispatch grid always covers the
/// whole array and lanes past the end are guarded off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelConfig {
    pub workgroup_size: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
        }
    }
}

impl KernelConfig {
    pub fn with_workgroup_size(mut self, workgroup_size: u32) -> Self {
        self.workgroup_size = workgroup_size;
        self
    }
}

/// How [`crate::GpuContext`] picks an adapter and which limits it asks the
/// device for.
#[derive(Clone, Debug)]
pub struct ContextOptions {
    pub backends: Backends,
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
    /// Limits requested from the device.  The downlevel defaults run on
    /// practically every adapter; raise them to bind buffers larger than
    /// 128 MiB.
    pub required_limits: Limits,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            backends: Backends::all(),
            power_preference: PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_limits: Limits::downlevel_defaults(),
        }
    }
}

impl ContextOptions {
    /// Defaults, overridden by wgpu's `WGPU_BACKEND` and `WGPU_POWER_PREF`
    /// environment variables when they are set.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(backends) = Backends::from_env() {
            options.backends = backends;
        }
        if let Some(power_preference) = PowerPreference::from_env() {
            options.power_preference = power_preference;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workgroup_is_64() {
        assert_eq!(KernelConfig::default().workgroup_size, 64);
        assert_eq!(
            KernelConfig::default().with_workgroup_size(128).workgroup_size,
            128
        );
    }

    #[test]
    fn default_context_requests_downlevel_limits() {
        let options = ContextOptions::default();
        assert_eq!(options.backends, Backends::all());
        assert!(!options.force_fallback_adapter);
        assert_eq!(
            options.required_limits.max_compute_workgroup_size_x,
            Limits::downlevel_defaults().max_compute_workgroup_size_x
        );
    }
}
