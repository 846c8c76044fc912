//! MemBlob: one owned, device-tagged allocation

use crate::error::{Error, fatal};
use crate::runtime::{AcceleratorRuntime, Device, Runtime};
use bytemuck::Pod;
use std::marker::PhantomData;

/// A single contiguous allocation of `len` elements on one device
///
/// The blob is allocated exactly once, in its constructor, and freed exactly
/// once, in `Drop`. Sharing is layered on top by [`super::MemArr`], which
/// holds blobs behind a reference count.
///
/// A blob stays on the thread that allocated it. Writes go through shared
/// references and allocation accounting is per thread, so neither the blob
/// nor anything owning it is `Send` or `Sync`:
///
/// ```compile_fail
/// use numr_arena::memory::MemBlob;
/// fn assert_send<T: Send>() {}
/// assert_send::<MemBlob<f32>>();
/// ```
///
/// ```compile_fail
/// use numr_arena::memory::DeviceBuffer;
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<DeviceBuffer<u64>>();
/// ```
pub struct MemBlob<T: Pod> {
    /// Raw device pointer (0 when never allocated)
    ptr: u64,
    /// Number of elements (not bytes)
    len: usize,
    /// Device where memory is allocated
    device: Device,
    _marker: PhantomData<T>,
    /// Pins the blob to its allocating thread
    _thread: PhantomData<*const ()>,
}

impl<T: Pod> MemBlob<T> {
    /// Allocate `len` elements on `device`. `len` is clamped to at least 1.
    ///
    /// The contents are unspecified; use [`MemBlob::zeroed`] when they are read
    /// before being written.
    ///
    /// # Panics
    ///
    /// Allocation failure is fatal.
    pub fn new(len: usize, device: Device) -> Self {
        let len = len.max(1);
        let size_bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .unwrap_or_else(|| {
                fatal(Error::OutOfMemory {
                    size: usize::MAX,
                    device,
                })
            });
        let ptr = crate::dispatch_device!(device, R => R::allocate(size_bytes));
        tracing::debug!(%device, len, size_bytes, "allocated blob");

        Self {
            ptr,
            len,
            device,
            _marker: PhantomData,
            _thread: PhantomData,
        }
    }

    /// Allocate `len` elements on `device` and fill them with zero.
    ///
    /// Host memory is cleared with a host loop, accelerator memory with the
    /// device's native fill.
    pub fn zeroed(len: usize, device: Device) -> Self {
        let blob = Self::new(len, device);
        blob.fill_zero();
        blob
    }

    /// A blob that never allocated anything; dropping it does nothing.
    pub fn unallocated(device: Device) -> Self {
        Self {
            ptr: 0,
            len: 0,
            device,
            _marker: PhantomData,
            _thread: PhantomData,
        }
    }

    fn fill_zero(&self) {
        if self.ptr == 0 {
            return;
        }
        match self.device {
            Device::Host => {
                let base = self.ptr as *mut T;
                for i in 0..self.len {
                    // SAFETY: i < len elements were allocated at base.
                    unsafe { base.add(i).write(T::zeroed()) };
                }
            }
            Device::Accelerator => unsafe {
                AcceleratorRuntime::memset(self.ptr, 0, self.size_in_bytes());
            },
        }
    }

    /// Get the raw device pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the blob holds no elements (only when never allocated)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Whether this blob owns a live allocation
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.ptr != 0
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }
}

impl<T: Pod> Drop for MemBlob<T> {
    fn drop(&mut self) {
        if self.ptr == 0 {
            return;
        }
        let size_bytes = self.size_in_bytes();
        // SAFETY: ptr was produced by this device's allocate(size_bytes) and
        // is released only here.
        unsafe { crate::dispatch_device!(self.device, R => R::deallocate(self.ptr, size_bytes)) };
        tracing::debug!(device = %self.device, len = self.len, "freed blob");
        self.ptr = 0;
    }
}

impl<T: Pod> std::fmt::Debug for MemBlob<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemBlob")
            .field("ptr", &format!("0x{:x}", self.ptr))
            .field("len", &self.len)
            .field("device", &self.device)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_clamped_to_one() {
        let blob = MemBlob::<f32>::new(0, Device::Host);
        assert_eq!(blob.len(), 1);
        assert!(blob.is_allocated());
    }

    #[test]
    fn test_new_contents_are_not_zero() {
        for device in [Device::Host, Device::Accelerator] {
            let blob = MemBlob::<u32>::new(8, device);
            let mut host = vec![0u32; 8];
            unsafe {
                crate::runtime::copy_between(
                    blob.ptr(),
                    device,
                    host.as_mut_ptr() as u64,
                    Device::Host,
                    blob.size_in_bytes(),
                )
            };
            assert!(host.iter().all(|&v| v != 0), "{device}: {host:?}");
        }
    }

    #[test]
    fn test_zeroed_clears_fresh_memory() {
        for device in [Device::Host, Device::Accelerator] {
            let blob = MemBlob::<i64>::zeroed(8, device);
            let mut host = vec![-1i64; 8];
            unsafe {
                crate::runtime::copy_between(
                    blob.ptr(),
                    device,
                    host.as_mut_ptr() as u64,
                    Device::Host,
                    blob.size_in_bytes(),
                )
            };
            assert_eq!(host, vec![0; 8], "{device}");
        }
    }

    #[test]
    fn test_freed_exactly_once() {
        let before = Device::Accelerator.stats();
        {
            let blob = MemBlob::<f64>::zeroed(16, Device::Accelerator);
            assert_eq!(blob.size_in_bytes(), 128);
            assert_eq!(
                Device::Accelerator.stats().live_allocations,
                before.live_allocations + 1
            );
        }
        let after = Device::Accelerator.stats();
        assert_eq!(after.live_allocations, before.live_allocations);
        assert_eq!(after.total_frees, before.total_frees + 1);
    }

    #[test]
    fn test_unallocated_drop_is_noop() {
        let before = Device::Host.stats();
        drop(MemBlob::<i32>::unallocated(Device::Host));
        assert_eq!(Device::Host.stats(), before);
    }
}
