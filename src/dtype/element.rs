//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::fmt::{Debug, Display};

mod sealed {
    pub trait Sealed {}

    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for i64 {}
    impl Sealed for i32 {}
}

/// Trait for types that can be elements of a matrix or arena
///
/// # Bounds
/// - `Pod + Zeroable` - Raw byte transfer between devices (bytemuck)
/// - `PartialOrd` - Sign tests for positive-only conversions
///
/// The trait is sealed: [`Element::Index`] must have exactly the size and
/// alignment of `Self` so that packed sparse entries carry no padding.
pub trait Element:
    sealed::Sealed
    + Copy
    + Pod
    + Zeroable
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + 'static
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Unsigned integer of the same width, used to store column indices
    /// next to values of this type.
    type Index: Pod + Debug + PartialEq + Eq;

    /// Largest column index representable by [`Element::Index`]
    const MAX_INDEX: usize;

    /// Encode a column index. Callers check against `MAX_INDEX` first.
    fn encode_index(i: usize) -> Self::Index;

    /// Decode a stored column index
    fn decode_index(ix: Self::Index) -> usize;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Convert from an element count or position
    fn from_usize(v: usize) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;
}

macro_rules! impl_element {
    ($t:ty, $dtype:expr, $index:ty, $zero:expr, $one:expr) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;

            type Index = $index;

            const MAX_INDEX: usize = if (<$index>::MAX as u128) < (usize::MAX as u128) {
                <$index>::MAX as usize
            } else {
                usize::MAX
            };

            #[inline]
            fn encode_index(i: usize) -> $index {
                i as $index
            }

            #[inline]
            fn decode_index(ix: $index) -> usize {
                ix as usize
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }

            #[inline]
            fn from_usize(v: usize) -> Self {
                v as $t
            }

            #[inline]
            fn zero() -> Self {
                $zero
            }

            #[inline]
            fn one() -> Self {
                $one
            }
        }
    };
}

impl_element!(f64, DType::F64, u64, 0.0, 1.0);
impl_element!(f32, DType::F32, u32, 0.0, 1.0);
impl_element!(i64, DType::I64, u64, 0, 1);
impl_element!(i32, DType::I32, u32, 0, 1);
