//! Packed (column, value) pair stored in sparse rows

use crate::dtype::Element;
use crate::error::{Error, Result};
use bytemuck::{Pod, Zeroable};
use std::fmt;

/// One stored nonzero: a column index next to its value
///
/// The index type has the value type's size and alignment, so an entry is
/// exactly two value-widths with no padding and a row is a flat run of
/// entries.
#[repr(C)]
#[derive(Clone, Copy, PartialEq)]
pub struct PackedEntry<T: Element> {
    col: T::Index,
    value: T,
}

// SAFETY: `#[repr(C)]` with two Pod fields of identical size and alignment
// (enforced by the sealed `Element` impls), so there is no padding and every
// bit pattern is valid.
unsafe impl<T: Element> Zeroable for PackedEntry<T> {}
unsafe impl<T: Element> Pod for PackedEntry<T> {}

impl<T: Element> PackedEntry<T> {
    /// Check that every index in `0..extent` can be packed.
    ///
    /// `arg` names the dimension in the returned error.
    pub fn check_extent(arg: &'static str, extent: usize) -> Result<()> {
        if extent > 0 && extent - 1 > T::MAX_INDEX {
            return Err(Error::invalid_argument(
                arg,
                format!(
                    "{extent} exceeds the {} index range (max {})",
                    T::DTYPE,
                    T::MAX_INDEX
                ),
            ));
        }
        Ok(())
    }

    /// Pack a column index with its value
    ///
    /// Callers validate the extent with [`PackedEntry::check_extent`].
    #[inline]
    pub fn new(col: usize, value: T) -> Self {
        debug_assert!(col <= T::MAX_INDEX);
        Self {
            col: T::encode_index(col),
            value,
        }
    }

    /// Column index
    #[inline]
    pub fn col(&self) -> usize {
        T::decode_index(self.col)
    }

    /// Stored value
    #[inline]
    pub fn value(&self) -> T {
        self.value
    }
}

impl<T: Element> fmt::Debug for PackedEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?})", self.col(), self.value)
    }
}

impl<T: Element> fmt::Display for PackedEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col(), self.value)
    }
}
