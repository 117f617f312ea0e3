//! N-dimensional affine coordinate transformations.
//!
//! [Affine] holds a square matrix and an offset, mapping `x ↦ A·x + b`.
//! It can be composed, inverted, flattened into a parameter vector,
//! and differentiated with respect to those parameters.
//! [Identity], [Translate] and [Scale] implement the same [Transformation] capabilities
//! and convert into an [Affine].
use smallvec::{SmallVec, smallvec};

mod error;
pub use error::TransformError;

pub mod transforms;
pub use transforms::{Affine, Identity, Scale, Translate};

mod alloc;
pub use alloc::AllocatingTransformation;

mod traits;
pub use traits::{TransformKind, Transformation};
mod matrix;
pub use matrix::{Matrix, MatrixBuilder, SINGULAR_TOLERANCE};

#[cfg(feature = "ndarray")]
mod nd;
#[cfg(feature = "ndarray")]
pub use nd::NdTransformation;

pub const COORD_SIZE: usize = 6;

/// A short vector type alias for convenience,
/// which may be replaced by arrayvec/smallvec/tinyvec in future
/// as an optimisation.
pub type ShortVec<T> = SmallVec<[T; COORD_SIZE]>;

/// Convenience function for turning a slice of sliceables into a vec of slices.
/// Allocates a new vec.
pub(crate) fn as_refs<T, Inner: AsRef<[T]>>(input: &[Inner]) -> Vec<&[T]> {
    input.iter().map(|v| v.as_ref()).collect()
}

/// Convenience function for turning a mut slice of sliceables into a vec of mut slices.
/// Allocates a new vec.
pub(crate) fn as_muts<T, Inner: AsMut<[T]>>(input: &mut [Inner]) -> Vec<&mut [T]> {
    input.iter_mut().map(|v| v.as_mut()).collect()
}

pub(crate) fn vec_of_vec<T: Copy>(outer_len: usize, inner_len: usize, val: T) -> Vec<Vec<T>> {
    vec![vec![val; inner_len]; outer_len]
}

pub(crate) fn vec_of_shortvec<T: Copy>(outer_len: usize, inner_len: usize, val: T) -> Vec<ShortVec<T>> {
    vec![smallvec![val; inner_len]; outer_len]
}
