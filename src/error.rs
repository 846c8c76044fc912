//! Error types for numr-arena

use crate::runtime::Device;
use thiserror::Error;

/// Result type alias using numr-arena's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in arena and sparse-matrix operations
///
/// Range and lookup failures are returned to the caller. Device failures
/// (allocation, push preconditions) are never returned: they go through
/// [`fatal`], which aborts the running operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension (valid indices are `0..size`)
        size: usize,
    },

    /// Entry `(row, col)` has no stored value
    #[error("Element ({row},{col}) not found")]
    NotFound {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
    },

    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Operand lives on the wrong device
    #[error("Device mismatch: expected {expected}, got {got}")]
    DeviceMismatch {
        /// Device the operation requires
        expected: Device,
        /// Device the operand lives on
        got: Device,
    },

    /// Device allocation failed
    #[error("Out of memory: failed to allocate {size} bytes on {device}")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
        /// Device the allocation was attempted on
        device: Device,
    },

    /// Copy would write past the end of the destination
    #[error("Capacity exceeded: requested {requested} elements, capacity {capacity}")]
    CapacityExceeded {
        /// Elements the write would need
        requested: usize,
        /// Elements available
        capacity: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },
}

impl Error {
    /// Create an index out of bounds error
    pub fn out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Whether this error kind is unrecoverable at the arena layer
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::OutOfMemory { .. } | Self::CapacityExceeded { .. } | Self::DeviceMismatch { .. }
        )
    }
}

/// Abort the current operation with an unrecoverable error.
///
/// Device API failures and push precondition violations end here. The error
/// is logged before the panic so it survives even if the panic is caught.
#[cold]
#[track_caller]
pub fn fatal(err: Error) -> ! {
    tracing::error!(error = %err, "fatal arena error");
    panic!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_index_and_bound() {
        let err = Error::out_of_bounds(7, 3);
        assert_eq!(
            err.to_string(),
            "Index 7 out of bounds for dimension of size 3"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(
            Error::OutOfMemory {
                size: 8,
                device: Device::Accelerator
            }
            .is_fatal()
        );
        assert!(!Error::NotFound { row: 0, col: 0 }.is_fatal());
        assert!(!Error::out_of_bounds(1, 0).is_fatal());
    }

    #[test]
    #[should_panic(expected = "Capacity exceeded")]
    fn test_fatal_panics_with_message() {
        fatal(Error::CapacityExceeded {
            requested: 10,
            capacity: 4,
        });
    }
}
