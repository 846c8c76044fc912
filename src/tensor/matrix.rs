//! Dense row-major matrix over a MemArr

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::memory::MemArr;
use crate::runtime::Device;
use std::fmt;

/// Two-dimensional dense matrix stored row-major in a [`MemArr`]
///
/// `Clone` is zero-copy: the clone aliases the same storage, so writes
/// through either are visible through both. Use [`Matrix::deep_clone`] for an
/// independent copy.
///
/// Element access is host-only; move accelerator-resident matrices with
/// [`Matrix::to_device`] first.
pub struct Matrix<T: Element> {
    data: MemArr<T>,
    shape: [usize; 2],
}

impl<T: Element> Matrix<T> {
    /// Create a zero-filled matrix
    pub fn zeros(shape: [usize; 2], device: Device) -> Self {
        Self {
            data: MemArr::zeroed(shape[0] * shape[1], device),
            shape,
        }
    }

    /// Create a matrix from row-major data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal `shape[0] * shape[1]`.
    /// For a fallible alternative, use [`Self::try_from_slice`].
    pub fn from_slice(data: &[T], shape: [usize; 2], device: Device) -> Self {
        Self::try_from_slice(data, shape, device).expect("Matrix::from_slice failed")
    }

    /// Create a matrix from row-major data (fallible version)
    pub fn try_from_slice(data: &[T], shape: [usize; 2], device: Device) -> Result<Self> {
        let numel = shape[0] * shape[1];
        if data.len() != numel {
            return Err(Error::shape_mismatch(&[numel], &[data.len()]));
        }
        Ok(Self {
            data: MemArr::from_slice(data, device),
            shape,
        })
    }

    /// Wrap existing storage as a matrix of the given shape
    pub fn from_parts(data: MemArr<T>, shape: [usize; 2]) -> Result<Self> {
        let numel = shape[0] * shape[1];
        if data.len() < numel {
            return Err(Error::shape_mismatch(&[numel], &[data.len()]));
        }
        Ok(Self { data, shape })
    }

    /// Fill on the host with `f(index)`, then move to `device`
    fn generate(shape: [usize; 2], device: Device, mut f: impl FnMut(usize) -> T) -> Self {
        let numel = shape[0] * shape[1];
        let values: Vec<T> = (0..numel).map(&mut f).collect();
        Self::from_slice(&values, shape, device)
    }

    /// Create a matrix filled with ones
    pub fn ones(shape: [usize; 2], device: Device) -> Self {
        Self::constant(shape, T::one(), device)
    }

    /// Create a matrix filled with `value`
    pub fn constant(shape: [usize; 2], value: T, device: Device) -> Self {
        Self::generate(shape, device, |_| value)
    }

    /// Create an `n x n` identity matrix
    pub fn identity(n: usize, device: Device) -> Self {
        Self::generate([n, n], device, |k| {
            if k / n == k % n { T::one() } else { T::zero() }
        })
    }

    /// Create a matrix whose entries are their row-major position
    pub fn sequential(shape: [usize; 2], device: Device) -> Self {
        Self::generate(shape, device, T::from_usize)
    }

    /// Create a matrix with uniform random values in [0, 1)
    #[cfg(feature = "rand")]
    pub fn rand(shape: [usize; 2], device: Device) -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        Self::generate(shape, device, |_| T::from_f64(rng.random::<f64>()))
    }

    /// Create a matrix with standard normal random values (mean=0, std=1)
    #[cfg(feature = "rand")]
    pub fn randn(shape: [usize; 2], device: Device) -> Self {
        use rand_distr::{Distribution, StandardNormal};
        let mut rng = rand::rng();
        Self::generate(shape, device, |_| {
            let val: f64 = StandardNormal.sample(&mut rng);
            T::from_f64(val)
        })
    }

    /// Matrix shape `[nrows, ncols]`
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Number of rows
    #[inline]
    pub fn nrows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns
    #[inline]
    pub fn ncols(&self) -> usize {
        self.shape[1]
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape[0] * self.shape[1]
    }

    /// Device the storage lives on
    #[inline]
    pub fn device(&self) -> Device {
        self.data.device()
    }

    /// Underlying storage view
    #[inline]
    pub fn data(&self) -> &MemArr<T> {
        &self.data
    }

    #[track_caller]
    fn linear_index(&self, i: usize, j: usize) -> usize {
        if i >= self.shape[0] {
            panic!("{}", Error::out_of_bounds(i, self.shape[0]));
        }
        if j >= self.shape[1] {
            panic!("{}", Error::out_of_bounds(j, self.shape[1]));
        }
        i * self.shape[1] + j
    }

    /// Read entry `(i, j)`
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range or the matrix is not host-resident.
    #[inline]
    #[track_caller]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data.get(self.linear_index(i, j))
    }

    /// Write entry `(i, j)`
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range or the matrix is not host-resident.
    #[inline]
    #[track_caller]
    pub fn set(&self, i: usize, j: usize, value: T) {
        self.data.set(self.linear_index(i, j), value)
    }

    /// Zero-copy view of row `i` (a sub-view of the storage)
    pub fn row_view(&self, i: usize) -> Result<MemArr<T>> {
        if i >= self.shape[0] {
            return Err(Error::out_of_bounds(i, self.shape[0]));
        }
        Ok(self.data.sub_view(i * self.shape[1]))
    }

    /// Copy into fresh storage on `device`
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            data: self.data.to_device(self.numel(), device),
            shape: self.shape,
        }
    }

    /// Independent copy on the same device
    pub fn deep_clone(&self) -> Self {
        self.to_device(self.device())
    }

    /// Copy the entries to a row-major host `Vec`
    pub fn to_vec(&self) -> Vec<T> {
        self.data.to_vec(self.numel())
    }
}

impl<T: Element> Clone for Matrix<T> {
    /// Clone aliases the same storage (zero-copy)
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            shape: self.shape,
        }
    }
}

impl<T: Element> PartialEq for Matrix<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.to_vec() == other.to_vec()
    }
}

impl<T: Element> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("shape", &self.shape)
            .field("dtype", &T::DTYPE)
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Element> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.to_vec();
        let ncols = self.shape[1];
        for i in 0..self.shape[0] {
            write!(f, "[")?;
            for j in 0..ncols {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", values[i * ncols + j])?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
