//! Aligned heap primitives and per-thread allocation accounting
//!
//! Both runtimes draw their memory from the system allocator; what differs is
//! who may touch it. Every allocation and free is counted per runtime and per
//! thread, so ownership tests can observe that a blob was freed exactly once.

use std::alloc::{Layout as AllocLayout, alloc, dealloc};
use std::cell::Cell;
use std::thread::LocalKey;

/// AVX-512 alignment
pub(crate) const ALIGN: usize = 64;

/// Byte written over every fresh allocation.
///
/// Fresh memory never reads back as zero; only an explicit zero fill does.
pub(crate) const FRESH_FILL: u8 = 0xA5;

/// Allocation counters for one runtime on the current thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationStats {
    /// Allocations not yet freed
    pub live_allocations: usize,
    /// Bytes held by live allocations
    pub allocated_bytes: usize,
    /// Allocations made since the thread started
    pub total_allocations: usize,
    /// Frees made since the thread started
    pub total_frees: usize,
}

impl AllocationStats {
    /// Zeroed counters
    pub const fn new() -> Self {
        Self {
            live_allocations: 0,
            allocated_bytes: 0,
            total_allocations: 0,
            total_frees: 0,
        }
    }
}

pub(crate) type StatsKey = LocalKey<Cell<AllocationStats>>;

pub(crate) fn record_alloc(key: &'static StatsKey, size_bytes: usize) {
    key.with(|cell| {
        let mut s = cell.get();
        s.live_allocations += 1;
        s.allocated_bytes += size_bytes;
        s.total_allocations += 1;
        cell.set(s);
    });
}

pub(crate) fn record_free(key: &'static StatsKey, size_bytes: usize) {
    key.with(|cell| {
        let mut s = cell.get();
        s.live_allocations = s.live_allocations.saturating_sub(1);
        s.allocated_bytes = s.allocated_bytes.saturating_sub(size_bytes);
        s.total_frees += 1;
        cell.set(s);
    });
}

pub(crate) fn snapshot(key: &'static StatsKey) -> AllocationStats {
    key.with(|cell| cell.get())
}

/// Allocate `size_bytes` bytes at [`ALIGN`], every byte set to [`FRESH_FILL`].
///
/// Returns 0 when the system allocator fails or the layout is invalid.
pub(crate) fn heap_alloc(size_bytes: usize) -> u64 {
    if size_bytes == 0 {
        return 0;
    }
    let Ok(layout) = AllocLayout::from_size_align(size_bytes, ALIGN) else {
        return 0;
    };
    // SAFETY: layout has non-zero size; the fill covers exactly the new block.
    let ptr = unsafe { alloc(layout) };
    if ptr.is_null() {
        return 0;
    }
    unsafe { ptr.write_bytes(FRESH_FILL, size_bytes) };
    ptr as u64
}

/// Release memory obtained from [`heap_alloc`].
///
/// # Safety
/// `ptr` must come from `heap_alloc(size_bytes)` and not have been freed.
pub(crate) unsafe fn heap_free(ptr: u64, size_bytes: usize) {
    if ptr == 0 || size_bytes == 0 {
        return;
    }
    let layout = AllocLayout::from_size_align_unchecked(size_bytes, ALIGN);
    dealloc(ptr as *mut u8, layout);
}
