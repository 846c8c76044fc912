//! Dense matrix type
//!
//! [`Matrix`] is the dense counterpart every sparse conversion reads from or
//! writes to. It stores its entries row-major in a [`MemArr`](crate::memory::MemArr),
//! so cloning and row views are zero-copy.

mod matrix;

pub use matrix::Matrix;
