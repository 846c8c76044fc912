//! CPU runtime implementation

use crate::error::{Error, fatal};
use crate::runtime::allocator::{self, AllocationStats};
use crate::runtime::{Device, Runtime};
use std::cell::Cell;

thread_local! {
    static HOST_STATS: Cell<AllocationStats> = const { Cell::new(AllocationStats::new()) };
}

/// CPU compute runtime
///
/// This is the default runtime that works on any platform.
/// Memory is allocated on the heap using the system allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuRuntime;

impl Runtime for CpuRuntime {
    const DEVICE: Device = Device::Host;

    fn name() -> &'static str {
        "cpu"
    }

    fn allocate(size_bytes: usize) -> u64 {
        if size_bytes == 0 {
            return 0;
        }

        let ptr = allocator::heap_alloc(size_bytes);
        if ptr == 0 {
            fatal(Error::OutOfMemory {
                size: size_bytes,
                device: Device::Host,
            });
        }

        allocator::record_alloc(&HOST_STATS, size_bytes);
        tracing::trace!(ptr, size_bytes, "host allocate");
        ptr
    }

    unsafe fn deallocate(ptr: u64, size_bytes: usize) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }

        allocator::heap_free(ptr, size_bytes);
        allocator::record_free(&HOST_STATS, size_bytes);
        tracing::trace!(ptr, size_bytes, "host free");
    }

    unsafe fn copy_to_device(src: &[u8], dst: u64) {
        if src.is_empty() || dst == 0 {
            return;
        }

        std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
    }

    unsafe fn copy_from_device(src: u64, dst: &mut [u8]) {
        if dst.is_empty() || src == 0 {
            return;
        }

        std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
    }

    unsafe fn copy_within_device(src: u64, dst: u64, size_bytes: usize) {
        if size_bytes == 0 || src == 0 || dst == 0 {
            return;
        }

        // Use copy (not copy_nonoverlapping) in case src and dst overlap
        std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
    }

    unsafe fn memset(dst: u64, value: u8, size_bytes: usize) {
        if size_bytes == 0 || dst == 0 {
            return;
        }

        std::ptr::write_bytes(dst as *mut u8, value, size_bytes);
    }

    fn stats() -> AllocationStats {
        allocator::snapshot(&HOST_STATS)
    }
}
