//! Packed row-major sparse matrix with a cached transpose

use super::entry::PackedEntry;
use super::pool::{DirectoryMirror, RecordPool};
use crate::dtype::Element;
use crate::error::{Error, Result, fatal};
use crate::runtime::Device;
use crate::tensor::Matrix;
use std::cell::OnceCell;
use std::fmt;

/// Row-major sparse matrix storing each row as a run of [`PackedEntry`]s
///
/// Rows are records in a [`RecordPool`]; row `i` is record `i`. Within a row,
/// entries keep the order they were inserted in (ascending column order for
/// matrices built by [`SparseRowMatrix::from_dense`] or by transposition).
///
/// # Cached transpose
///
/// [`SparseRowMatrix::transpose`] builds the transpose on first call and
/// caches it. The cache is **not** invalidated by [`SparseRowMatrix::append_row`]:
/// after appending, `transpose()` keeps returning the transpose of the matrix
/// as it was when the cache was filled. Call
/// [`SparseRowMatrix::invalidate_transpose`] to force a rebuild.
pub struct SparseRowMatrix<T: Element> {
    ncols: usize,
    pool: RecordPool<PackedEntry<T>>,
    transposed: OnceCell<Box<SparseRowMatrix<T>>>,
}

impl<T: Element> SparseRowMatrix<T> {
    /// Create an `nrows x ncols` matrix with every row empty
    pub fn new(nrows: usize, ncols: usize, device: Device) -> Self {
        let mut pool = RecordPool::new(device);
        for _ in 0..nrows {
            pool.push_back(0);
        }
        Self::from_pool(pool, ncols)
    }

    fn from_pool(pool: RecordPool<PackedEntry<T>>, ncols: usize) -> Self {
        Self {
            ncols,
            pool,
            transposed: OnceCell::new(),
        }
    }

    /// Build from per-row column counts and a host fill of all entries.
    ///
    /// `counts[i]` entries of `entries` belong to row `i`, in order.
    fn from_counts(
        counts: &[usize],
        entries: &[PackedEntry<T>],
        ncols: usize,
        device: Device,
    ) -> Self {
        let mut pool = RecordPool::with_capacity(entries.len(), device);
        for &count in counts {
            pool.push_back(count);
        }
        pool.write_prefix(entries);
        Self::from_pool(pool, ncols)
    }

    /// Build from a dense matrix, storing only entries that are not zero.
    ///
    /// The first pass counts nonzeros per row so the pool is allocated once
    /// at its exact final size; the second fills entries in ascending column
    /// order. The result lives on the dense matrix's device.
    ///
    /// # Panics
    ///
    /// Fatal if a column index would not fit [`Element::Index`].
    pub fn from_dense(dense: &Matrix<T>) -> Self {
        let [nrows, ncols] = dense.shape();
        if let Err(err) = PackedEntry::<T>::check_extent("ncols", ncols) {
            fatal(err);
        }
        let values = dense.to_vec();
        let zero = T::zero();

        let counts: Vec<usize> = (0..nrows)
            .map(|i| {
                values[i * ncols..(i + 1) * ncols]
                    .iter()
                    .filter(|&&v| v != zero)
                    .count()
            })
            .collect();

        let mut entries = Vec::with_capacity(counts.iter().sum());
        for i in 0..nrows {
            for j in 0..ncols {
                let v = values[i * ncols + j];
                if v != zero {
                    entries.push(PackedEntry::new(j, v));
                }
            }
        }

        tracing::debug!(nrows, ncols, nnz = entries.len(), "sparse rows from dense");
        Self::from_counts(&counts, &entries, ncols, dense.device())
    }

    /// Build a matrix with `ncols` columns from a sequence of rows, each
    /// given as parallel column-index and value slices.
    pub fn from_entries<I, C, V>(ncols: usize, rows: I, device: Device) -> Result<Self>
    where
        I: IntoIterator<Item = (C, V)>,
        C: AsRef<[usize]>,
        V: AsRef<[T]>,
    {
        let mut matrix = Self::new(0, ncols, device);
        for (cols, values) in rows {
            matrix.append_row(cols.as_ref(), values.as_ref())?;
        }
        Ok(matrix)
    }

    /// Append a new last row holding `values[k]` at column `cols[k]`.
    ///
    /// Entries are stored as given, including explicit zeros. A transpose
    /// cached before this call is left as is.
    pub fn append_row(&mut self, cols: &[usize], values: &[T]) -> Result<()> {
        if cols.len() != values.len() {
            return Err(Error::shape_mismatch(&[cols.len()], &[values.len()]));
        }
        if let Some(&j) = cols.iter().find(|&&j| j >= self.ncols) {
            return Err(Error::out_of_bounds(j, self.ncols));
        }
        PackedEntry::<T>::check_extent("cols", self.ncols)?;
        if self.has_cached_transpose() {
            tracing::debug!(
                row = self.nrows(),
                "appending row while a transpose is cached; the cached transpose is now stale"
            );
        }

        let entries: Vec<PackedEntry<T>> = cols
            .iter()
            .zip(values)
            .map(|(&j, &v)| PackedEntry::new(j, v))
            .collect();
        let i = self.pool.push_back(entries.len());
        self.pool.write(i, &entries)
    }

    /// Number of rows
    #[inline]
    pub fn nrows(&self) -> usize {
        self.pool.len()
    }

    /// Number of columns
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Matrix shape `[nrows, ncols]`
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        [self.nrows(), self.ncols]
    }

    /// Total stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.pool.tail()
    }

    /// Device the packed entries live on
    #[inline]
    pub fn device(&self) -> Device {
        self.pool.device()
    }

    /// Underlying record pool
    #[inline]
    pub fn pool(&self) -> &RecordPool<PackedEntry<T>> {
        &self.pool
    }

    /// Stored entries in row `i`
    pub fn row_nnz(&self, i: usize) -> Result<usize> {
        self.pool.size_of(i)
    }

    /// Copy the entries of row `i` to the host, in stored order
    pub fn row(&self, i: usize) -> Result<Vec<PackedEntry<T>>> {
        self.pool.read(i)
    }

    /// Value stored at `(i, j)`.
    ///
    /// Scans row `i` for column `j`. An absent entry is an error, not an
    /// implicit zero.
    ///
    /// # Errors
    ///
    /// - `IndexOutOfBounds` if `i` or `j` is outside the matrix
    /// - `NotFound` if no entry is stored at `(i, j)`
    pub fn element_lookup(&self, i: usize, j: usize) -> Result<T> {
        if i >= self.nrows() {
            return Err(Error::out_of_bounds(i, self.nrows()));
        }
        if j >= self.ncols {
            return Err(Error::out_of_bounds(j, self.ncols));
        }
        self.row(i)?
            .iter()
            .find(|e| e.col() == j)
            .map(|e| e.value())
            .ok_or(Error::NotFound { row: i, col: j })
    }

    /// Visit every row with its entries, in row order
    pub fn for_each_row(&self, mut f: impl FnMut(usize, &[PackedEntry<T>])) {
        let entries = self.pool.read_all();
        for (i, span) in self.pool.directory().iter().enumerate() {
            f(i, &entries[span.offset..span.end()]);
        }
    }

    /// Visit every stored `(row, col, value)`: rows in order, entries in
    /// stored order within a row
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, T)) {
        self.for_each_row(|i, row| {
            for e in row {
                f(i, e.col(), e.value());
            }
        });
    }

    /// The transpose, built on first call and cached afterwards.
    ///
    /// See the type-level docs: later calls return the cached matrix even if
    /// rows have been appended since.
    ///
    /// # Panics
    ///
    /// Fatal if a row index would not fit [`Element::Index`].
    pub fn transpose(&self) -> &SparseRowMatrix<T> {
        self.transposed
            .get_or_init(|| Box::new(self.build_transpose()))
    }

    /// Two-pass scatter: count entries per column to lay out the target rows,
    /// then drop each entry into its target row at a per-row cursor.
    fn build_transpose(&self) -> Self {
        let nrows = self.nrows();
        // Source rows become packed column indices.
        if let Err(err) = PackedEntry::<T>::check_extent("nrows", nrows) {
            fatal(err);
        }
        let mut counts = vec![0usize; self.ncols];
        self.for_each(|_, j, _| counts[j] += 1);

        let mut cursor = Vec::with_capacity(self.ncols);
        let mut offset = 0;
        for &c in &counts {
            cursor.push(offset);
            offset += c;
        }

        let mut entries = vec![PackedEntry::new(0, T::zero()); offset];
        self.for_each(|i, j, v| {
            entries[cursor[j]] = PackedEntry::new(i, v);
            cursor[j] += 1;
        });

        tracing::debug!(
            nrows = self.ncols,
            ncols = nrows,
            nnz = offset,
            "built transpose"
        );
        Self::from_counts(&counts, &entries, nrows, self.device())
    }

    /// Drop the cached transpose so the next `transpose()` rebuilds it
    pub fn invalidate_transpose(&mut self) {
        self.transposed.take();
    }

    /// Whether a transpose is currently cached
    #[inline]
    pub fn has_cached_transpose(&self) -> bool {
        self.transposed.get().is_some()
    }

    /// Dense copy on the same device, with zero where nothing is stored
    pub fn to_dense(&self) -> Matrix<T> {
        let ncols = self.ncols;
        let mut values = vec![T::zero(); self.nrows() * ncols];
        self.for_each(|i, j, v| values[i * ncols + j] = v);
        Matrix::from_slice(&values, [self.nrows(), ncols], self.device())
    }

    /// Copy to `device`; the transpose cache is not carried over
    pub fn to_device(&self, device: Device) -> Self {
        let entries = self.pool.read_all();
        let counts: Vec<usize> = self.pool.directory().iter().map(|s| s.len).collect();
        Self::from_counts(&counts, &entries, self.ncols, device)
    }

    /// Upload the row directory (not the entries) to the accelerator
    pub fn directory_mirror(&self) -> DirectoryMirror {
        self.pool.directory_mirror()
    }
}

impl<T: Element> Clone for SparseRowMatrix<T> {
    /// Deep copy with an empty transpose cache
    fn clone(&self) -> Self {
        Self::from_pool(self.pool.clone(), self.ncols)
    }
}

impl<T: Element> PartialEq for SparseRowMatrix<T> {
    /// Structural equality: same shape and the same entries in the same order
    /// in every row
    fn eq(&self, other: &Self) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        let lhs = self.pool.read_all();
        let rhs = other.pool.read_all();
        self.pool
            .directory()
            .iter()
            .zip(other.pool.directory())
            .all(|(a, b)| lhs[a.offset..a.end()] == rhs[b.offset..b.end()])
    }
}

impl<T: Element> fmt::Debug for SparseRowMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseRowMatrix")
            .field("shape", &self.shape())
            .field("nnz", &self.nnz())
            .field("dtype", &T::DTYPE)
            .field("device", &self.device())
            .field("cached_transpose", &self.has_cached_transpose())
            .finish()
    }
}

impl<T: Element> fmt::Display for SparseRowMatrix<T> {
    /// One line per row: `i: (col,value)(col,value)...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.pool.read_all();
        for (i, span) in self.pool.directory().iter().enumerate() {
            write!(f, "{i}: ")?;
            for e in &entries[span.offset..span.end()] {
                write!(f, "{e}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseRowMatrix<f32> {
        let dense = Matrix::from_slice(
            &[0.0, 1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0],
            [3, 3],
            Device::Host,
        );
        SparseRowMatrix::from_dense(&dense)
    }

    fn triples(m: &SparseRowMatrix<f32>) -> Vec<(usize, usize, f32)> {
        let mut out = Vec::new();
        m.for_each(|i, j, v| out.push((i, j, v)));
        out
    }

    #[test]
    fn test_from_dense_sizes_pool_exactly() {
        let m = sample();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.pool().capacity(), 3);
        assert_eq!(m.row_nnz(1).unwrap(), 1);
    }

    #[test]
    fn test_for_each_order() {
        assert_eq!(
            triples(&sample()),
            vec![(0, 1, 1.0), (1, 0, 2.0), (2, 2, 3.0)]
        );
    }

    #[test]
    fn test_element_lookup() {
        let m = sample();
        assert_eq!(m.element_lookup(2, 2), Ok(3.0));
        assert_eq!(
            m.element_lookup(0, 0),
            Err(Error::NotFound { row: 0, col: 0 })
        );
        assert_eq!(m.element_lookup(3, 0), Err(Error::out_of_bounds(3, 3)));
        assert_eq!(m.element_lookup(0, 5), Err(Error::out_of_bounds(5, 3)));
    }

    #[test]
    fn test_non_square_from_dense() {
        let dense = Matrix::from_slice(&[0, 4, 0, 5, 6, 0], [2, 3], Device::Host);
        let m = SparseRowMatrix::from_dense(&dense);
        assert_eq!(m.shape(), [2, 3]);
        assert_eq!(m.element_lookup(0, 1), Ok(4));
        assert_eq!(m.element_lookup(1, 1), Ok(6));
        assert_eq!(m.to_dense(), dense);
    }

    #[test]
    fn test_transpose_is_cached() {
        let m = sample();
        assert!(!m.has_cached_transpose());
        let t = m.transpose();
        assert_eq!(triples(t), vec![(0, 1, 2.0), (1, 0, 1.0), (2, 2, 3.0)]);
        let again: *const _ = m.transpose();
        assert!(std::ptr::eq(t, again));
    }

    #[test]
    fn test_append_row_validation() {
        let mut m = SparseRowMatrix::<f64>::new(0, 4, Device::Host);
        assert_eq!(
            m.append_row(&[0, 1], &[1.0]),
            Err(Error::shape_mismatch(&[2], &[1]))
        );
        assert_eq!(
            m.append_row(&[4], &[1.0]),
            Err(Error::out_of_bounds(4, 4))
        );
        m.append_row(&[3, 0], &[1.0, 2.0]).unwrap();
        assert_eq!(m.row(0).unwrap()[0].col(), 3);
        assert_eq!(m.nrows(), 1);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_append_row_rejects_unpackable_width() {
        let wide = u32::MAX as usize + 2;
        let mut m = SparseRowMatrix::<f32>::new(0, wide, Device::Host);
        let err = m.append_row(&[0], &[1.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "cols", .. }));
        assert_eq!(m.nrows(), 0);

        let mut m = SparseRowMatrix::<f64>::new(0, wide, Device::Host);
        m.append_row(&[wide - 1], &[1.0]).unwrap();
        assert_eq!(m.row(0).unwrap()[0].col(), wide - 1);
    }

    #[test]
    fn test_invalidate_transpose() {
        let mut m = sample();
        let _ = m.transpose();
        m.append_row(&[1], &[9.0]).unwrap();
        assert_eq!(m.transpose().nrows(), 3);
        assert_eq!(m.transpose().ncols(), 3);
        m.invalidate_transpose();
        assert_eq!(m.transpose().ncols(), 4);
        assert_eq!(m.transpose().element_lookup(1, 3), Ok(9.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "0: (1,1)\n1: (0,2)\n2: (2,3)\n");
    }

    #[test]
    fn test_accelerator_resident() {
        let dense = Matrix::from_slice(&[1.0f64, 0.0, 0.0, 2.0], [2, 2], Device::Accelerator);
        let m = SparseRowMatrix::from_dense(&dense);
        assert_eq!(m.device(), Device::Accelerator);
        assert_eq!(m.element_lookup(1, 1), Ok(2.0));
        assert_eq!(m.transpose().device(), Device::Accelerator);
        assert_eq!(m.to_device(Device::Host), m);
    }

    #[test]
    fn test_clone_drops_cache() {
        let m = sample();
        let _ = m.transpose();
        let c = m.clone();
        assert!(!c.has_cached_transpose());
        assert_eq!(c, m);
    }
}
