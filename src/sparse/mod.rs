//! Sparse matrix storage for numr-arena
//!
//! Two independent engines with different trade-offs:
//!
//! - **[`SparseRowMatrix`]** (packed rows): each row is a contiguous run of
//!   (column, value) [`PackedEntry`]s inside one [`RecordPool`]. Compact,
//!   device-resident, append-only, with a cached transpose.
//!
//! - **[`SparseMapMatrix`]** (map of rows): each row is an ordered map from
//!   column to value. Host-only, freely mutable, with rows created on first
//!   touch. Typically used to build a matrix incrementally before packing it
//!   with [`SparseMapMatrix::to_row_matrix`].
//!
//! # Usage
//!
//! ```
//! # use numr_arena::prelude::*;
//! let dense = Matrix::from_slice(
//!     &[0.0f32, 1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0],
//!     [3, 3],
//!     Device::Host,
//! );
//! let packed = SparseRowMatrix::from_dense(&dense);
//! assert_eq!(packed.element_lookup(2, 2)?, 3.0);
//! assert!(packed.element_lookup(0, 0).is_err());
//! assert_eq!(packed.transpose().element_lookup(0, 1)?, 2.0);
//!
//! let mut map = SparseMapMatrix::<f32>::new(2, 2);
//! map.set(0, 1, 5.0)?;
//! map.set(1, 0, 5.0)?;
//! assert_eq!(map.dense().to_vec(), vec![0.0, 5.0, 5.0, 0.0]);
//! # Ok::<(), numr_arena::error::Error>(())
//! ```

mod entry;
mod map;
mod pool;
mod row;

pub use entry::PackedEntry;
pub use map::{SparseMapMatrix, SparseVec};
pub use pool::{DirectoryMirror, RecordPool, RecordSpan};
pub use row::SparseRowMatrix;
