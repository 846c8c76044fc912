//! DeviceBuffer: accelerator-only scratch space

use super::arr::{MemArr, push_host};
use super::blob::MemBlob;
use crate::runtime::Device;
use bytemuck::Pod;

/// Accelerator-resident scratch memory with no host mirror
///
/// Unlike [`MemArr`] the buffer is not shared: it owns its blob outright and
/// only ever receives data from host-resident sources.
#[derive(Debug)]
pub struct DeviceBuffer<T: Pod> {
    blob: MemBlob<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    /// Allocate `len` elements (at least 1) on the accelerator
    pub fn new(len: usize) -> Self {
        Self {
            blob: MemBlob::new(len, Device::Accelerator),
        }
    }

    /// Allocate `len` zero-filled elements on the accelerator
    pub fn zeroed(len: usize) -> Self {
        Self {
            blob: MemBlob::zeroed(len, Device::Accelerator),
        }
    }

    /// Make room for at least `len` elements.
    ///
    /// Never shrinks. When growing, the old allocation is freed first and the
    /// contents are not preserved.
    pub fn reset(&mut self, len: usize) {
        if len <= self.blob.len() {
            return;
        }
        tracing::debug!(from = self.blob.len(), to = len, "growing device buffer");
        self.blob = MemBlob::unallocated(Device::Accelerator);
        self.blob = MemBlob::new(len, Device::Accelerator);
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.blob.len()
    }

    /// Always false: buffers hold at least one element
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }

    /// Always [`Device::Accelerator`]
    #[inline]
    pub fn device(&self) -> Device {
        self.blob.device()
    }

    /// Device pointer to element `i`
    #[inline]
    pub fn ptr_at(&self, i: usize) -> u64 {
        self.blob.ptr() + (i * std::mem::size_of::<T>()) as u64
    }

    /// Copy a host-resident view into the buffer at element `offset`.
    ///
    /// # Panics
    ///
    /// Fatal if `src` is not host-resident or does not fit.
    #[track_caller]
    pub fn push(&self, offset: usize, src: &MemArr<T>) {
        push_host(self.blob.ptr(), self.blob.len(), self.device(), offset, src);
    }

    /// Read the whole buffer back to the host
    pub fn to_vec(&self) -> Vec<T> {
        let mut result = vec![T::zeroed(); self.blob.len()];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut result);
        // SAFETY: the blob holds exactly bytes.len() bytes.
        unsafe {
            crate::runtime::copy_between(
                self.blob.ptr(),
                self.device(),
                bytes.as_mut_ptr() as u64,
                Device::Host,
                bytes.len(),
            )
        };
        result
    }
}
