//! MemArr: a shared, offset view into a MemBlob

use super::blob::MemBlob;
use crate::error::{Error, fatal};
use crate::runtime::{self, Device};
use bytemuck::Pod;
use std::ops::Add;
use std::rc::Rc;

/// A reference-counted handle into a [`MemBlob`] plus an element offset
///
/// `Clone` and [`MemArr::assign`] rebind the handle: both sides alias the same
/// blob, and a write through one is visible through the other. The blob is
/// freed when the last view referencing it is dropped.
///
/// Element access (`get`, `set`, `fill`) is host-only. Accelerator-resident
/// views move data through `to_vec`, `write_slice`, `push`, `copy_from` and
/// `to_device`.
pub struct MemArr<T: Pod> {
    blob: Rc<MemBlob<T>>,
    offset: usize,
}

impl<T: Pod> MemArr<T> {
    /// Allocate a new blob of `len` elements (at least 1) on `device`
    pub fn new(len: usize, device: Device) -> Self {
        Self::from_blob(MemBlob::new(len, device))
    }

    /// Allocate a new zero-filled blob of `len` elements on `device`
    pub fn zeroed(len: usize, device: Device) -> Self {
        Self::from_blob(MemBlob::zeroed(len, device))
    }

    /// Allocate on `device` and copy `data` into it
    pub fn from_slice(data: &[T], device: Device) -> Self {
        let arr = Self::new(data.len(), device);
        arr.write_slice(0, data);
        arr
    }

    /// Take ownership of a blob, viewing it from offset 0
    pub fn from_blob(blob: MemBlob<T>) -> Self {
        Self {
            blob: Rc::new(blob),
            offset: 0,
        }
    }

    /// A view sharing this blob, starting `offset` elements further in.
    ///
    /// No bounds check: accesses through the result are checked against the
    /// blob when they happen.
    pub fn sub_view(&self, offset: usize) -> Self {
        Self {
            blob: Rc::clone(&self.blob),
            offset: self.offset + offset,
        }
    }

    /// Rebind this view to alias `other`'s blob and offset.
    ///
    /// The previously referenced blob is released if this was its last view.
    pub fn assign(&mut self, other: &Self) {
        self.blob = Rc::clone(&other.blob);
        self.offset = other.offset;
    }

    /// Device the underlying blob lives on
    #[inline]
    pub fn device(&self) -> Device {
        self.blob.device()
    }

    /// Element offset of this view into its blob
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total elements in the underlying blob
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blob.len()
    }

    /// Elements addressable from this view's offset to the end of the blob
    #[inline]
    pub fn len(&self) -> usize {
        self.blob.len().saturating_sub(self.offset)
    }

    /// Check if no element is addressable from this view
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of views sharing the blob
    #[inline]
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.blob)
    }

    /// Whether both views reference the same blob
    #[inline]
    pub fn shares_blob(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.blob, &other.blob)
    }

    /// Raw device pointer at this view's offset
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.blob.ptr() + (self.offset * std::mem::size_of::<T>()) as u64
    }

    #[track_caller]
    fn check_host(&self) {
        if !self.device().is_host() {
            fatal(Error::DeviceMismatch {
                expected: Device::Host,
                got: self.device(),
            });
        }
    }

    #[track_caller]
    fn check_range(&self, start: usize, count: usize) {
        let end = start.saturating_add(count);
        if end > self.len() {
            fatal(Error::CapacityExceeded {
                requested: end,
                capacity: self.len(),
            });
        }
    }

    #[track_caller]
    fn host_ptr(&self, i: usize) -> *mut T {
        self.check_host();
        if i >= self.len() {
            panic!("{}", Error::out_of_bounds(i, self.len()));
        }
        // SAFETY: offset + i lies inside the blob.
        unsafe { (self.ptr() as *mut T).add(i) }
    }

    /// Read element `i` (relative to this view)
    ///
    /// # Panics
    ///
    /// Panics if the view is not host-resident or `i` is past the blob's end.
    #[inline]
    #[track_caller]
    pub fn get(&self, i: usize) -> T {
        let p = self.host_ptr(i);
        // SAFETY: p is in bounds; no references into the blob are ever handed out.
        unsafe { p.read() }
    }

    /// Write element `i` (relative to this view); visible through every alias
    ///
    /// # Panics
    ///
    /// Panics if the view is not host-resident or `i` is past the blob's end.
    #[inline]
    #[track_caller]
    pub fn set(&self, i: usize, value: T) {
        let p = self.host_ptr(i);
        // SAFETY: as in `get`.
        unsafe { p.write(value) }
    }

    /// Copy `count` elements starting at this view's offset to a host `Vec`
    #[track_caller]
    pub fn to_vec(&self, count: usize) -> Vec<T> {
        self.check_range(0, count);
        let mut result = vec![T::zeroed(); count];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut result);
        // SAFETY: source range checked; destination is our own Vec.
        unsafe {
            runtime::copy_between(
                self.ptr(),
                self.device(),
                bytes.as_mut_ptr() as u64,
                Device::Host,
                bytes.len(),
            )
        };
        result
    }

    /// Copy host data into this view at element `offset`
    #[track_caller]
    pub fn write_slice(&self, offset: usize, data: &[T]) {
        self.check_range(offset, data.len());
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let dst = self.ptr() + (offset * std::mem::size_of::<T>()) as u64;
        // SAFETY: destination range checked.
        unsafe {
            runtime::copy_between(
                bytes.as_ptr() as u64,
                Device::Host,
                dst,
                self.device(),
                bytes.len(),
            )
        };
    }

    /// Copy the full extent of a host-resident view into this one at `offset`.
    ///
    /// # Panics
    ///
    /// Fatal if `src` is not host-resident or `offset + src.len()` exceeds this
    /// view's extent.
    #[track_caller]
    pub fn push(&self, offset: usize, src: &MemArr<T>) {
        push_host(self.ptr(), self.len(), self.device(), offset, src);
    }

    /// Copy `count` elements from `src` (any device) into the start of this view
    #[track_caller]
    pub fn copy_from(&self, src: &MemArr<T>, count: usize) {
        src.check_range(0, count);
        self.check_range(0, count);
        // SAFETY: both ranges checked.
        unsafe {
            runtime::copy_between(
                src.ptr(),
                src.device(),
                self.ptr(),
                self.device(),
                count * std::mem::size_of::<T>(),
            )
        };
    }

    /// Copy the first `count` elements into a fresh blob on `device`
    #[track_caller]
    pub fn to_device(&self, count: usize, device: Device) -> MemArr<T> {
        tracing::debug!(from = %self.device(), to = %device, count, "transfer");
        let dst = MemArr::new(count, device);
        dst.copy_from(self, count);
        dst
    }
}

/// Copy a host-resident view into device memory at `offset` elements.
#[track_caller]
pub(crate) fn push_host<T: Pod>(
    dst: u64,
    dst_len: usize,
    dst_device: Device,
    offset: usize,
    src: &MemArr<T>,
) {
    if !src.device().is_host() {
        fatal(Error::DeviceMismatch {
            expected: Device::Host,
            got: src.device(),
        });
    }
    let count = src.len();
    let end = offset.saturating_add(count);
    if end > dst_len {
        fatal(Error::CapacityExceeded {
            requested: end,
            capacity: dst_len,
        });
    }
    let size = std::mem::size_of::<T>();
    // SAFETY: source is host memory of `count` elements; destination range checked.
    unsafe {
        runtime::copy_between(
            src.ptr(),
            Device::Host,
            dst + (offset * size) as u64,
            dst_device,
            count * size,
        )
    };
}

impl<T: Pod> Clone for MemArr<T> {
    /// Clone aliases the same blob (zero-copy)
    fn clone(&self) -> Self {
        Self {
            blob: Rc::clone(&self.blob),
            offset: self.offset,
        }
    }
}

impl<T: Pod> Add<usize> for &MemArr<T> {
    type Output = MemArr<T>;

    fn add(self, offset: usize) -> MemArr<T> {
        self.sub_view(offset)
    }
}

impl<T: Pod> std::fmt::Debug for MemArr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemArr")
            .field("blob", &*self.blob)
            .field("offset", &self.offset)
            .field("refs", &Rc::strong_count(&self.blob))
            .finish()
    }
}
