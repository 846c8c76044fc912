//! Associative sparse matrix: one ordered map per row

use super::row::SparseRowMatrix;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::Device;
use crate::tensor::Matrix;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Sparse vector as an ordered map from index to value
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVec<T: Element> {
    entries: BTreeMap<usize, T>,
}

impl<T: Element> Default for SparseVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> SparseVec<T> {
    /// Create an empty vector
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or overwrite the value at `j`
    pub fn set(&mut self, j: usize, value: T) {
        self.entries.insert(j, value);
    }

    /// Stored value at `j`, if any
    pub fn get(&self, j: usize) -> Option<T> {
        self.entries.get(&j).copied()
    }

    /// Remove the value at `j`, returning it
    pub fn remove(&mut self, j: usize) -> Option<T> {
        self.entries.remove(&j)
    }

    /// Number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored `(index, value)` pairs in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.entries.iter().map(|(&j, &v)| (j, v))
    }

    /// Visit stored entries in ascending index order
    pub fn forall_nonzero(&self, mut f: impl FnMut(usize, T)) {
        for (j, v) in self.iter() {
            f(j, v);
        }
    }
}

impl<T: Element> fmt::Display for SparseVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (j, v) in self.iter() {
            write!(f, "({j},{v})")?;
        }
        Ok(())
    }
}

/// Mutable sparse matrix keeping each row as a [`SparseVec`]
///
/// Rows are created on demand: by [`SparseMapMatrix::set`], and also by
/// [`SparseMapMatrix::row`], which hands out a mutable row and creates an
/// empty one if none exists. Use [`SparseMapMatrix::get_row`] for a lookup
/// that never creates state. A missing row or entry reads as zero.
///
/// The matrix is host-only; conversions to dense or packed form produce data
/// on the host.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMapMatrix<T: Element> {
    nrows: usize,
    ncols: usize,
    rows: BTreeMap<usize, SparseVec<T>>,
}

impl<T: Element> SparseMapMatrix<T> {
    /// Create an empty `nrows x ncols` matrix
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            rows: BTreeMap::new(),
        }
    }

    /// Number of rows
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Matrix shape `[nrows, ncols]`
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        [self.nrows, self.ncols]
    }

    fn check_index(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.nrows {
            return Err(Error::out_of_bounds(i, self.nrows));
        }
        if j >= self.ncols {
            return Err(Error::out_of_bounds(j, self.ncols));
        }
        Ok(())
    }

    /// Set entry `(i, j)`, creating row `i` if needed
    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        self.check_index(i, j)?;
        self.rows.entry(i).or_default().set(j, value);
        Ok(())
    }

    /// Value at `(i, j)`, zero if nothing is stored
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        self.check_index(i, j)?;
        Ok(self
            .rows
            .get(&i)
            .and_then(|row| row.get(j))
            .unwrap_or_else(T::zero))
    }

    /// Mutable row `i`, created empty if absent.
    ///
    /// The created row persists even if nothing is written to it.
    pub fn row(&mut self, i: usize) -> Result<&mut SparseVec<T>> {
        if i >= self.nrows {
            return Err(Error::out_of_bounds(i, self.nrows));
        }
        Ok(self.rows.entry(i).or_default())
    }

    /// Row `i` if it exists; never creates one
    pub fn get_row(&self, i: usize) -> Option<&SparseVec<T>> {
        self.rows.get(&i)
    }

    /// Rows that currently exist, including empty ones created by [`Self::row`]
    pub fn rows(&self) -> btree_map::Iter<'_, usize, SparseVec<T>> {
        self.rows.iter()
    }

    /// Total stored entries
    pub fn nnz(&self) -> usize {
        self.rows.values().map(SparseVec::nnz).sum()
    }

    /// Visit stored `(row, col, value)` in ascending row, then column, order
    pub fn forall_nonzero(&self, mut f: impl FnMut(usize, usize, T)) {
        for (&i, row) in &self.rows {
            row.forall_nonzero(|j, v| f(i, j, v));
        }
    }

    /// Dense host copy with zero where nothing is stored
    pub fn dense(&self) -> Matrix<T> {
        let ncols = self.ncols;
        let mut values = vec![T::zero(); self.nrows * ncols];
        self.forall_nonzero(|i, j, v| values[i * ncols + j] = v);
        Matrix::from_slice(&values, self.shape(), Device::Host)
    }

    /// Adjacency matrix of an edge list: every listed `(row, col)` is set to 1.
    ///
    /// The shape is one past the largest row and column index seen, so every
    /// listed pair is in range. An empty list gives a `0 x 0` matrix.
    pub fn from_list(pairs: &[(usize, usize)]) -> Self {
        let nrows = pairs.iter().map(|&(i, _)| i + 1).max().unwrap_or(0);
        let ncols = pairs.iter().map(|&(_, j)| j + 1).max().unwrap_or(0);
        let mut matrix = Self::new(nrows, ncols);
        for &(i, j) in pairs {
            matrix.rows.entry(i).or_default().set(j, T::one());
        }
        matrix
    }

    /// Keep only the strictly positive entries of `dense`.
    ///
    /// Zero and negative values are dropped.
    pub fn from_matrix(dense: &Matrix<T>) -> Self {
        Self::from_dense_where(dense, |v| v > T::zero())
    }

    /// Keep every entry of `dense` that is not zero, negative ones included
    pub fn from_dense(dense: &Matrix<T>) -> Self {
        Self::from_dense_where(dense, |v| v != T::zero())
    }

    fn from_dense_where(dense: &Matrix<T>, keep: impl Fn(T) -> bool) -> Self {
        let [nrows, ncols] = dense.shape();
        let values = dense.to_vec();
        let mut matrix = Self::new(nrows, ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                let v = values[i * ncols + j];
                if keep(v) {
                    matrix.rows.entry(i).or_default().set(j, v);
                }
            }
        }
        matrix
    }

    /// Random symmetric `n x n` adjacency matrix using the thread-local RNG.
    ///
    /// See [`Self::random_symmetric_with_rng`].
    #[cfg(feature = "rand")]
    pub fn random_symmetric(n: usize, p: f64) -> Self {
        Self::random_symmetric_with_rng(n, p, &mut rand::rng())
    }

    /// Random symmetric `n x n` adjacency matrix.
    ///
    /// Each unordered pair `i != j` is included independently with
    /// probability `p`; an included pair is stored at both `(i, j)` and
    /// `(j, i)` with weight 1. The diagonal is never set.
    #[cfg(feature = "rand")]
    pub fn random_symmetric_with_rng<R: rand::Rng>(n: usize, p: f64, rng: &mut R) -> Self {
        let mut matrix = Self::new(n, n);
        for i in 0..n {
            for j in 0..i {
                if rng.random::<f64>() < p {
                    matrix.rows.entry(i).or_default().set(j, T::one());
                    matrix.rows.entry(j).or_default().set(i, T::one());
                }
            }
        }
        tracing::debug!(n, p, nnz = matrix.nnz(), "random symmetric matrix");
        matrix
    }

    /// Transposed copy, rebuilt in full on every call
    pub fn transpose(&self) -> Self {
        let mut t = Self::new(self.ncols, self.nrows);
        self.forall_nonzero(|i, j, v| t.rows.entry(j).or_default().set(i, v));
        t
    }

    /// Packed row-major copy on `device`, rows in ascending column order
    pub fn to_row_matrix(&self, device: Device) -> SparseRowMatrix<T> {
        let mut cols = Vec::new();
        let mut values = Vec::new();
        let mut matrix = SparseRowMatrix::new(0, self.ncols, device);
        for i in 0..self.nrows {
            cols.clear();
            values.clear();
            if let Some(row) = self.rows.get(&i) {
                for (j, v) in row.iter() {
                    cols.push(j);
                    values.push(v);
                }
            }
            // Every stored column is below ncols and the lengths agree.
            if let Err(err) = matrix.append_row(&cols, &values) {
                crate::error::fatal(err);
            }
        }
        matrix
    }
}

impl<T: Element> fmt::Display for SparseMapMatrix<T> {
    /// One line per existing row: `i: (col,value)(col,value)...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in &self.rows {
            writeln!(f, "{i}: {row}")?;
        }
        Ok(())
    }
}
