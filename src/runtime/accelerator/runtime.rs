//! Accelerator runtime implementation

use crate::error::{Error, fatal};
use crate::runtime::allocator::{self, AllocationStats};
use crate::runtime::{Device, Runtime};
use std::cell::Cell;

thread_local! {
    static DEVICE_STATS: Cell<AllocationStats> = const { Cell::new(AllocationStats::new()) };
    static MEMORY_LIMIT: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Accelerator compute runtime
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceleratorRuntime;

impl AcceleratorRuntime {
    /// Cap the device memory available to the current thread.
    ///
    /// `None` removes the cap. Allocations that would push live bytes past
    /// the cap fail, which is fatal.
    pub fn set_memory_limit(limit: Option<usize>) {
        MEMORY_LIMIT.with(|cell| cell.set(limit));
    }

    /// Current per-thread device memory cap
    pub fn memory_limit() -> Option<usize> {
        MEMORY_LIMIT.with(|cell| cell.get())
    }
}

impl Runtime for AcceleratorRuntime {
    const DEVICE: Device = Device::Accelerator;

    fn name() -> &'static str {
        "accelerator"
    }

    fn allocate(size_bytes: usize) -> u64 {
        if size_bytes == 0 {
            return 0;
        }

        if let Some(limit) = Self::memory_limit() {
            let in_use = Self::stats().allocated_bytes;
            if in_use.saturating_add(size_bytes) > limit {
                fatal(Error::OutOfMemory {
                    size: size_bytes,
                    device: Device::Accelerator,
                });
            }
        }

        let ptr = allocator::heap_alloc(size_bytes);
        if ptr == 0 {
            fatal(Error::OutOfMemory {
                size: size_bytes,
                device: Device::Accelerator,
            });
        }

        allocator::record_alloc(&DEVICE_STATS, size_bytes);
        tracing::trace!(ptr, size_bytes, "device allocate");
        ptr
    }

    unsafe fn deallocate(ptr: u64, size_bytes: usize) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }

        allocator::heap_free(ptr, size_bytes);
        allocator::record_free(&DEVICE_STATS, size_bytes);
        tracing::trace!(ptr, size_bytes, "device free");
    }

    unsafe fn copy_to_device(src: &[u8], dst: u64) {
        if src.is_empty() || dst == 0 {
            return;
        }

        tracing::trace!(bytes = src.len(), "host to device");
        std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
    }

    unsafe fn copy_from_device(src: u64, dst: &mut [u8]) {
        if dst.is_empty() || src == 0 {
            return;
        }

        tracing::trace!(bytes = dst.len(), "device to host");
        std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
    }

    unsafe fn copy_within_device(src: u64, dst: u64, size_bytes: usize) {
        if size_bytes == 0 || src == 0 || dst == 0 {
            return;
        }

        std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
    }

    unsafe fn memset(dst: u64, value: u8, size_bytes: usize) {
        if size_bytes == 0 || dst == 0 {
            return;
        }

        std::ptr::write_bytes(dst as *mut u8, value, size_bytes);
    }

    fn stats() -> AllocationStats {
        allocator::snapshot(&DEVICE_STATS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_accounting_is_separate_from_host() {
        let host_before = crate::runtime::CpuRuntime::stats();
        let ptr = AcceleratorRuntime::allocate(512);
        assert_eq!(AcceleratorRuntime::stats().allocated_bytes, 512);
        assert_eq!(crate::runtime::CpuRuntime::stats(), host_before);
        unsafe { AcceleratorRuntime::deallocate(ptr, 512) };
        assert_eq!(AcceleratorRuntime::stats().live_allocations, 0);
    }

    #[test]
    fn test_limit_admits_exact_fit() {
        AcceleratorRuntime::set_memory_limit(Some(256));
        let ptr = AcceleratorRuntime::allocate(256);
        unsafe { AcceleratorRuntime::deallocate(ptr, 256) };
        AcceleratorRuntime::set_memory_limit(None);
    }

    #[test]
    #[should_panic(expected = "Out of memory")]
    fn test_limit_exceeded_is_fatal() {
        AcceleratorRuntime::set_memory_limit(Some(64));
        let _ = AcceleratorRuntime::allocate(128);
    }
}
