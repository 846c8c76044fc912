//! Growable pool of variable-length records

use crate::error::{Error, Result};
use crate::memory::{DeviceBuffer, MemArr};
use crate::runtime::Device;
use bytemuck::Pod;

/// Directory entry locating one record in the pool's flat storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordSpan {
    /// First element of the record
    pub offset: usize,
    /// Number of elements in the record
    pub len: usize,
}

impl RecordSpan {
    /// One past the last element of the record
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Flat element storage holding variable-length records
///
/// Records are appended at `tail` and addressed by index through a directory
/// of [`RecordSpan`]s. Records never move relative to the start of the
/// storage: growth copies the occupied prefix into a larger allocation, so
/// every offset handed out earlier stays valid.
///
/// ```text
/// storage:   [ r0 r0 | r1 r1 r1 | r2 r2 r2 r2 | free ... ]
///                                              ^tail      ^capacity
/// directory: [(0,2), (2,3), (5,4)]
/// ```
pub struct RecordPool<E: Pod> {
    arr: MemArr<E>,
    dir: Vec<RecordSpan>,
    tail: usize,
}

impl<E: Pod> RecordPool<E> {
    /// Create an empty pool on `device` with minimal capacity
    pub fn new(device: Device) -> Self {
        Self::with_capacity(0, device)
    }

    /// Create an empty pool on `device` able to hold `capacity` elements
    /// before growing. Storage holds at least one element.
    pub fn with_capacity(capacity: usize, device: Device) -> Self {
        Self {
            arr: MemArr::zeroed(capacity, device),
            dir: Vec::new(),
            tail: 0,
        }
    }

    /// Number of records
    #[inline]
    pub fn len(&self) -> usize {
        self.dir.len()
    }

    /// Check if the pool holds no records
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dir.is_empty()
    }

    /// First free element
    #[inline]
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Elements the storage can hold without growing
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arr.capacity()
    }

    /// Device the storage lives on
    #[inline]
    pub fn device(&self) -> Device {
        self.arr.device()
    }

    /// Directory of all records, in insertion order
    #[inline]
    pub fn directory(&self) -> &[RecordSpan] {
        &self.dir
    }

    /// Grow storage to hold at least `capacity` elements.
    ///
    /// No-op when the current capacity already suffices. Otherwise the
    /// occupied prefix `[0, tail)` is copied into a new allocation and the old
    /// one is released.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity <= self.capacity() {
            return;
        }
        tracing::debug!(
            from = self.capacity(),
            to = capacity,
            tail = self.tail,
            "growing record pool"
        );
        let grown = MemArr::zeroed(capacity, self.device());
        grown.copy_from(&self.arr, self.tail);
        self.arr = grown;
    }

    /// Append a record of `len` elements and return its index.
    ///
    /// Grows to `max(2 * capacity, tail + len)` when the record does not fit.
    /// The new record's contents are whatever the storage held (zero for
    /// never-used storage).
    pub fn push_back(&mut self, len: usize) -> usize {
        let needed = self.tail + len;
        if needed > self.capacity() {
            self.reserve(needed.max(2 * self.capacity()));
        }
        self.dir.push(RecordSpan {
            offset: self.tail,
            len,
        });
        self.tail = needed;
        self.dir.len() - 1
    }

    /// Directory entry of record `i`
    pub fn span(&self, i: usize) -> Result<RecordSpan> {
        self.dir
            .get(i)
            .copied()
            .ok_or_else(|| Error::out_of_bounds(i, self.dir.len()))
    }

    /// Length of record `i`
    pub fn size_of(&self, i: usize) -> Result<usize> {
        Ok(self.span(i)?.len)
    }

    /// Offset of record `i` in the flat storage
    pub fn offset(&self, i: usize) -> Result<usize> {
        Ok(self.span(i)?.offset)
    }

    /// Zero-copy view starting at record `i`
    pub fn record(&self, i: usize) -> Result<MemArr<E>> {
        Ok(self.arr.sub_view(self.offset(i)?))
    }

    /// Copy record `i` to the host
    pub fn read(&self, i: usize) -> Result<Vec<E>> {
        let span = self.span(i)?;
        Ok(self.arr.sub_view(span.offset).to_vec(span.len))
    }

    /// Overwrite record `i` with `data`, which must match the record's length
    pub fn write(&self, i: usize, data: &[E]) -> Result<()> {
        let span = self.span(i)?;
        if data.len() != span.len {
            return Err(Error::shape_mismatch(&[span.len], &[data.len()]));
        }
        self.arr.write_slice(span.offset, data);
        Ok(())
    }

    /// Copy the occupied prefix `[0, tail)` to the host
    pub fn read_all(&self) -> Vec<E> {
        self.arr.to_vec(self.tail)
    }

    /// Overwrite the occupied prefix `[0, tail)` with `data`
    pub(crate) fn write_prefix(&self, data: &[E]) {
        debug_assert_eq!(data.len(), self.tail);
        self.arr.write_slice(0, data);
    }

    /// Upload the directory to the accelerator as `(offset, len)` pairs
    pub fn directory_mirror(&self) -> DirectoryMirror {
        let flat: Vec<u64> = self
            .dir
            .iter()
            .flat_map(|s| [s.offset as u64, s.len as u64])
            .collect();
        let buffer = DeviceBuffer::new(flat.len());
        if !flat.is_empty() {
            buffer.push(0, &MemArr::from_slice(&flat, Device::Host));
        }
        tracing::debug!(records = self.dir.len(), "mirrored record directory");
        DirectoryMirror {
            buffer,
            records: self.dir.len(),
        }
    }
}

impl<E: Pod> Clone for RecordPool<E> {
    /// Deep copy: the clone owns fresh storage on the same device
    fn clone(&self) -> Self {
        Self {
            arr: self.arr.to_device(self.capacity(), self.device()),
            dir: self.dir.clone(),
            tail: self.tail,
        }
    }
}

impl<E: Pod> std::fmt::Debug for RecordPool<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPool")
            .field("records", &self.dir.len())
            .field("tail", &self.tail)
            .field("capacity", &self.capacity())
            .field("device", &self.device())
            .finish()
    }
}

/// Read-only accelerator copy of a pool directory
///
/// Holds `2 * records` `u64` values laid out as `offset, len` pairs. Only the
/// directory is mirrored, never the record contents. The mirror is a snapshot:
/// later pushes to the pool are not reflected.
#[derive(Debug)]
pub struct DirectoryMirror {
    buffer: DeviceBuffer<u64>,
    records: usize,
}

impl DirectoryMirror {
    /// Number of records mirrored
    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Always [`Device::Accelerator`]
    #[inline]
    pub fn device(&self) -> Device {
        self.buffer.device()
    }

    /// Device pointer to the first `offset` entry
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.buffer.ptr_at(0)
    }

    /// Read the directory back to the host
    pub fn to_spans(&self) -> Vec<RecordSpan> {
        self.buffer
            .to_vec()
            .chunks_exact(2)
            .take(self.records)
            .map(|pair| RecordSpan {
                offset: pair[0] as usize,
                len: pair[1] as usize,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_offsets() {
        let mut pool = RecordPool::<f32>::with_capacity(4, Device::Host);
        assert_eq!(pool.push_back(2), 0);
        assert_eq!(pool.push_back(3), 1);
        assert_eq!(pool.push_back(4), 2);
        assert_eq!(pool.offset(1).unwrap(), 2);
        assert_eq!(pool.offset(2).unwrap(), 5);
        assert_eq!(pool.size_of(2).unwrap(), 4);
        assert_eq!(pool.tail(), 9);
        assert!(pool.capacity() >= 9);
    }

    #[test]
    fn test_growth_policy() {
        let mut pool = RecordPool::<i32>::with_capacity(4, Device::Host);
        pool.push_back(3);
        pool.push_back(2);
        assert_eq!(pool.capacity(), 8);
        pool.push_back(20);
        assert_eq!(pool.capacity(), 25);
    }

    #[test]
    fn test_reserve_is_noop_when_large_enough() {
        let mut pool = RecordPool::<f64>::with_capacity(16, Device::Host);
        let before = Device::Host.stats().total_allocations;
        pool.reserve(8);
        assert_eq!(pool.capacity(), 16);
        assert_eq!(Device::Host.stats().total_allocations, before);
    }

    #[test]
    fn test_growth_preserves_contents() {
        let mut pool = RecordPool::<i64>::with_capacity(2, Device::Accelerator);
        let a = pool.push_back(2);
        pool.write(a, &[7, 8]).unwrap();
        let b = pool.push_back(5);
        pool.write(b, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(pool.read(a).unwrap(), vec![7, 8]);
        assert_eq!(pool.read_all(), vec![7, 8, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_range_errors() {
        let mut pool = RecordPool::<f32>::new(Device::Host);
        pool.push_back(1);
        assert_eq!(pool.size_of(3), Err(Error::out_of_bounds(3, 1)));
        assert_eq!(pool.offset(1), Err(Error::out_of_bounds(1, 1)));
        assert_eq!(
            pool.write(0, &[1.0, 2.0]),
            Err(Error::shape_mismatch(&[1], &[2]))
        );
    }

    #[test]
    fn test_record_view_aliases_storage() {
        let mut pool = RecordPool::<f32>::new(Device::Host);
        pool.push_back(1);
        let i = pool.push_back(2);
        let view = pool.record(i).unwrap();
        view.set(1, 4.5);
        assert_eq!(pool.read(i).unwrap(), vec![0.0, 4.5]);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut pool = RecordPool::<i32>::new(Device::Host);
        let i = pool.push_back(2);
        pool.write(i, &[1, 2]).unwrap();
        let copy = pool.clone();
        pool.write(i, &[3, 4]).unwrap();
        assert_eq!(copy.read(i).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_directory_mirror() {
        let mut pool = RecordPool::<f64>::new(Device::Host);
        pool.push_back(2);
        pool.push_back(0);
        pool.push_back(3);
        let mirror = pool.directory_mirror();
        assert_eq!(mirror.device(), Device::Accelerator);
        assert_eq!(mirror.records(), 3);
        assert_eq!(mirror.to_spans(), pool.directory().to_vec());
    }

    #[test]
    fn test_empty_directory_mirror() {
        let pool = RecordPool::<f32>::new(Device::Host);
        assert!(pool.directory_mirror().to_spans().is_empty());
    }
}
