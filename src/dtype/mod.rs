//! Data type tags for arena elements
//!
//! `DType` is the runtime tag of an element type; [`Element`] connects the
//! Rust scalar types to it.

mod element;

pub use element::Element;

use std::fmt;

/// Element types a matrix or arena may hold
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 64-bit floating point
    F64,
    /// 32-bit floating point
    F32,
    /// 64-bit signed integer
    I64,
    /// 32-bit signed integer
    I32,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 | Self::I64 => 8,
            Self::F32 | Self::I32 => 4,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::I64 => "i64",
            Self::I32 => "i32",
        };
        f.write_str(name)
    }
}
