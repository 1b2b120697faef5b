//! Typed GPU buffers and host readback utilities.
//!
//! This module defines a [`GpuBuffer`] wrapper around [`wgpu::Buffer`]
//! that tracks the number of typed elements stored in the buffer and
//! provides convenience methods for uploading and downloading data.
//! The buffer does not keep a CPU copy; reads go through a `MAP_READ`
//! staging buffer that is allocated on the first read and reused after.

use std::marker::PhantomData;
use std::sync::{mpsc, Mutex, PoisonError};

use bytemuck::{cast_slice, Pod};
use log::trace;
use wgpu::{Buffer, BufferDescriptor, BufferUsages};

use crate::error::{ComputeError, Result};
use crate::GpuContext;

/// A typed GPU storage buffer.
///
/// `len` is the capacity in elements of `T`; the underlying buffer size
/// in bytes is `len * size_of::<T>()`.  Every buffer is created with
/// `STORAGE | COPY_DST | COPY_SRC` so it can be bound to the kernel,
/// updated from the host and read back.
pub struct GpuBuffer<T: Pod> {
    pub buffer: Buffer,
    len: usize,
    size: u64,
    /// Capacity-sized readback buffer; the lock also serialises mappings.
    staging: Mutex<Option<Buffer>>,
    _marker: PhantomData<T>,
}

impl<T: Pod> GpuBuffer<T> {
    const BASE_USAGE: BufferUsages = BufferUsages::STORAGE
        .union(BufferUsages::COPY_DST)
        .union(BufferUsages::COPY_SRC);

    /// Create a storage buffer holding a copy of `data`.
    ///
    /// Additional usages can be passed in via the `usage` parameter.
    pub fn from_slice(context: &GpuContext, data: &[T], usage: BufferUsages) -> Self {
        let bytes: &[u8] = cast_slice(data);
        let buffer = context.device.create_buffer(&BufferDescriptor {
            label: Some("vec3_add_input"),
            size: bytes.len() as u64,
            usage: Self::BASE_USAGE | usage,
            mapped_at_creation: false,
        });
        // Writing through the queue avoids requiring `MAP_WRITE`.
        context.queue.write_buffer(&buffer, 0, bytes);
        Self {
            buffer,
            len: data.len(),
            size: bytes.len() as u64,
            staging: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// Create a zero-initialised buffer of `len` elements, typically the
    /// output of a dispatch.
    ///
    /// Fails with [`ComputeError::CapacityExceeded`] when `len` elements do
    /// not fit in the device's maximum buffer size.
    pub fn new_output(context: &GpuContext, len: usize, usage: BufferUsages) -> Result<Self> {
        let max_size = context.device.limits().max_buffer_size;
        let size = Self::byte_len(len)
            .filter(|&size| size <= max_size)
            .ok_or(ComputeError::CapacityExceeded {
                requested: len,
                capacity: Self::elements_in(max_size),
            })?;
        let buffer = context.device.create_buffer(&BufferDescriptor {
            label: Some("vec3_add_output"),
            size,
            usage: Self::BASE_USAGE | usage,
            mapped_at_creation: false,
        });
        Ok(Self {
            buffer,
            len,
            size,
            staging: Mutex::new(None),
            _marker: PhantomData,
        })
    }

    /// Capacity in elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn size_bytes(&self) -> u64 {
        self.size
    }

    pub fn as_entire_binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /// Overwrite the first `data.len()` elements.  The write is queued and
    /// ordered before any later submission on the same queue.
    pub fn write(&self, context: &GpuContext, data: &[T]) -> Result<()> {
        if data.len() > self.len {
            return Err(ComputeError::CapacityExceeded {
                requested: data.len(),
                capacity: self.len,
            });
        }
        context.queue.write_buffer(&self.buffer, 0, cast_slice(data));
        Ok(())
    }

    /// Read the whole buffer back to the CPU.
    pub fn read_to_vec(&self, context: &GpuContext) -> Result<Vec<T>> {
        self.read_prefix(context, self.len)
    }

    /// Read the first `n` elements back to the CPU.
    ///
    /// Copies into the staging buffer and blocks until the GPU has
    /// finished all prior work and the mapping is ready.
    pub fn read_prefix(&self, context: &GpuContext, n: usize) -> Result<Vec<T>> {
        if n > self.len {
            return Err(ComputeError::CapacityExceeded {
                requested: n,
                capacity: self.len,
            });
        }
        if n == 0 {
            return Ok(Vec::new());
        }
        // n <= len, and len * size_of::<T>() was checked at construction.
        let size = n as u64 * std::mem::size_of::<T>() as u64;
        let mut guard = self.staging.lock().unwrap_or_else(PoisonError::into_inner);
        let staging = guard.get_or_insert_with(|| {
            trace!("allocating {} byte staging buffer", self.size);
            context.device.create_buffer(&BufferDescriptor {
                label: Some("vec3_add_download"),
                size: self.size,
                usage: BufferUsages::COPY_DST | BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        });
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vec3_add_readback"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, staging, 0, size);
        context.queue.submit([encoder.finish()]);

        let slice = staging.slice(..size);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only goes away if the caller already bailed out.
            let _ = sender.send(result);
        });
        context.device.poll(wgpu::PollType::Wait)?;
        receiver
            .recv()
            .map_err(|_| ComputeError::BufferMap(wgpu::BufferAsyncError))??;

        let data = slice.get_mapped_range();
        let result: Vec<T> = cast_slice(&data).to_vec();
        // The mapped view must be released before unmapping.
        drop(data);
        staging.unmap();
        trace!("read back {n} elements ({size} bytes)");
        Ok(result)
    }

    /// Bytes needed for `len` elements, or `None` if that overflows.
    fn byte_len(len: usize) -> Option<u64> {
        len.checked_mul(std::mem::size_of::<T>())
            .and_then(|bytes| u64::try_from(bytes).ok())
    }

    fn elements_in(bytes: u64) -> usize {
        let elements = bytes / std::mem::size_of::<T>().max(1) as u64;
        usize::try_from(elements).unwrap_or(usize::MAX)
    }

    #[cfg(test)]
    fn has_staging(&self) -> bool {
        self.staging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec3;

    #[test]
    fn byte_len_rejects_overflowing_capacities() {
        assert_eq!(GpuBuffer::<Vec3>::byte_len(0), Some(0));
        assert_eq!(GpuBuffer::<Vec3>::byte_len(4), Some(48));
        assert_eq!(GpuBuffer::<Vec3>::byte_len(usize::MAX), None);
        assert_eq!(GpuBuffer::<Vec3>::byte_len(usize::MAX / 12 + 1), None);
        assert_eq!(GpuBuffer::<Vec3>::elements_in(48), 4);
    }

    #[test]
    fn staging_buffer_is_reused_across_reads() {
        let context = match GpuContext::new_blocking() {
            Ok(context) => context,
            Err(e) => {
                log::warn!("skipping GPU test: {e}");
                return;
            }
        };
        let buffer = GpuBuffer::from_slice(&context, &[Vec3::splat(1.0); 4], BufferUsages::empty());
        assert!(!buffer.has_staging());

        assert_eq!(buffer.read_to_vec(&context).unwrap(), vec![Vec3::splat(1.0); 4]);
        assert!(buffer.has_staging());

        buffer.write(&context, &[Vec3::splat(2.0); 2]).unwrap();
        assert_eq!(
            buffer.read_prefix(&context, 3).unwrap(),
            vec![Vec3::splat(2.0), Vec3::splat(2.0), Vec3::splat(1.0)]
        );
        buffer.write(&context, &[Vec3::splat(5.0)]).unwrap();
        assert_eq!(buffer.read_prefix(&context, 1).unwrap(), vec![Vec3::splat(5.0)]);
    }

    #[test]
    fn absurd_output_capacity_is_rejected() {
        let context = match GpuContext::new_blocking() {
            Ok(context) => context,
            Err(e) => {
                log::warn!("skipping GPU test: {e}");
                return;
            }
        };
        assert!(matches!(
            GpuBuffer::<Vec3>::new_output(&context, usize::MAX, BufferUsages::empty()),
            Err(ComputeError::CapacityExceeded { requested: usize::MAX, .. })
        ));
    }
}
