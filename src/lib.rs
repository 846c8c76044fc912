//! # numr-arena
//!
//! **Device-aware memory arenas and sparse matrix storage for Rust.**
//!
//! numr-arena provides reference-counted memory that may live on the host or
//! on an accelerator, zero-copy views into it, and two sparse matrix engines
//! built on top.
//!
//! ## Features
//!
//! - **Arenas**: [`memory::MemArr`] views share one [`memory::MemBlob`]; the
//!   blob is freed exactly once, when its last view goes away
//! - **Cross-device transport**: host/accelerator copies behind one
//!   [`runtime::Runtime`] trait
//! - **Record pools**: variable-length records in one growable allocation
//! - **Packed sparse rows**: (column, value) runs with a cached transpose
//! - **Map sparse rows**: ordered per-row maps for incremental construction
//!
//! ## Quick Start
//!
//! ```
//! use numr_arena::prelude::*;
//!
//! let base = MemArr::<f32>::zeroed(8, Device::Host);
//! base.set(2, 3.0);
//! let view = base.sub_view(2);
//! assert_eq!(view.get(0), 3.0);
//! assert_eq!(base.capacity(), 8);
//!
//! let on_device = base.to_device(8, Device::Accelerator);
//! assert_eq!(on_device.to_vec(8)[2], 3.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `sparse` (default): Record pool and sparse matrix engines
//! - `rand` (default): Random dense fills and random symmetric sparse matrices

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dtype;
pub mod error;
pub mod memory;
pub mod runtime;
#[cfg(feature = "sparse")]
pub mod sparse;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::memory::{DeviceBuffer, MemArr};
    pub use crate::runtime::{AcceleratorRuntime, CpuRuntime, Device, Runtime};
    pub use crate::tensor::Matrix;

    #[cfg(feature = "sparse")]
    pub use crate::sparse::{RecordPool, SparseMapMatrix, SparseRowMatrix, SparseVec};
}
