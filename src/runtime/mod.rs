//! Device runtimes for arena memory
//!
//! This module defines the `Runtime` trait, the `Device` tag every blob
//! carries, and the two backends behind it.
//!
//! # Architecture
//!
//! ```text
//! Device (0 = Host, 1 = Accelerator)
//! ├── CpuRuntime          (device 0: host heap, directly addressable)
//! └── AcceleratorRuntime  (device 1: opaque memory, reachable only via copies)
//! ```
//!
//! All primitives are blocking. Allocation failure is fatal: it never
//! surfaces as a `Result`.

mod allocator;
pub mod accelerator;
pub mod cpu;

pub use accelerator::AcceleratorRuntime;
pub use allocator::AllocationStats;
pub use cpu::CpuRuntime;

use crate::error::{Error, Result};
use std::fmt;

/// Route a [`Device`] value to its runtime type.
///
/// ```ignore
/// let ptr = dispatch_device!(device, R => R::allocate(bytes));
/// ```
#[macro_export]
macro_rules! dispatch_device {
    ($device:expr, $R:ident => $body:expr) => {
        match $device {
            $crate::runtime::Device::Host => {
                #[allow(unused_imports)]
                use $crate::runtime::Runtime as _;
                type $R = $crate::runtime::CpuRuntime;
                $body
            }
            $crate::runtime::Device::Accelerator => {
                #[allow(unused_imports)]
                use $crate::runtime::Runtime as _;
                type $R = $crate::runtime::AcceleratorRuntime;
                $body
            }
        }
    };
}

/// Memory domain a blob lives in
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Device {
    /// Host memory (device 0)
    #[default]
    Host,
    /// Accelerator memory (device 1)
    Accelerator,
}

impl Device {
    /// Numeric identifier: 0 for host, 1 for accelerator
    #[inline]
    pub const fn id(self) -> usize {
        match self {
            Self::Host => 0,
            Self::Accelerator => 1,
        }
    }

    /// Look up a device by numeric identifier
    pub fn from_id(id: usize) -> Result<Self> {
        match id {
            0 => Ok(Self::Host),
            1 => Ok(Self::Accelerator),
            _ => Err(Error::out_of_bounds(id, 2)),
        }
    }

    /// Check if this is host memory
    #[inline]
    pub const fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        dispatch_device!(self, R => R::name())
    }

    /// Allocation counters for this device on the current thread
    pub fn stats(self) -> AllocationStats {
        dispatch_device!(self, R => R::stats())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}

/// Core trait for device backends
///
/// Each runtime owns one memory domain. Pointers are passed around as `u64`
/// handles; only the runtime that produced a handle may interpret it.
pub trait Runtime {
    /// The device this runtime manages
    const DEVICE: Device;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Allocate device memory
    ///
    /// # Panics
    ///
    /// Allocation failure is unrecoverable and aborts through
    /// [`crate::error::fatal`].
    fn allocate(size_bytes: usize) -> u64;

    /// Deallocate device memory
    ///
    /// # Safety
    /// `ptr` must come from `Self::allocate(size_bytes)` and not have been freed.
    unsafe fn deallocate(ptr: u64, size_bytes: usize);

    /// Copy data from host to this device
    ///
    /// # Safety
    /// `dst` must be valid for `src.len()` bytes on this device.
    unsafe fn copy_to_device(src: &[u8], dst: u64);

    /// Copy data from this device to host
    ///
    /// # Safety
    /// `src` must be valid for `dst.len()` bytes on this device.
    unsafe fn copy_from_device(src: u64, dst: &mut [u8]);

    /// Copy data within this device (ranges may overlap)
    ///
    /// # Safety
    /// Both ranges must be valid for `size_bytes` on this device.
    unsafe fn copy_within_device(src: u64, dst: u64, size_bytes: usize);

    /// Fill a device range with a byte value
    ///
    /// # Safety
    /// `dst` must be valid for `size_bytes` on this device.
    unsafe fn memset(dst: u64, value: u8, size_bytes: usize);

    /// Allocation counters for the current thread
    fn stats() -> AllocationStats;
}

/// Copy bytes between any two devices.
///
/// # Safety
/// `src` must be valid for `size_bytes` on `src_device` and `dst` on
/// `dst_device`. Same-device ranges may overlap.
pub(crate) unsafe fn copy_between(
    src: u64,
    src_device: Device,
    dst: u64,
    dst_device: Device,
    size_bytes: usize,
) {
    if size_bytes == 0 || src == 0 || dst == 0 {
        return;
    }
    tracing::trace!(%src_device, %dst_device, size_bytes, "copy");
    match (src_device, dst_device) {
        (Device::Host, Device::Host) => CpuRuntime::copy_within_device(src, dst, size_bytes),
        (Device::Host, Device::Accelerator) => {
            let bytes = std::slice::from_raw_parts(src as *const u8, size_bytes);
            AcceleratorRuntime::copy_to_device(bytes, dst);
        }
        (Device::Accelerator, Device::Host) => {
            let bytes = std::slice::from_raw_parts_mut(dst as *mut u8, size_bytes);
            AcceleratorRuntime::copy_from_device(src, bytes);
        }
        (Device::Accelerator, Device::Accelerator) => {
            AcceleratorRuntime::copy_within_device(src, dst, size_bytes)
        }
    }
}
