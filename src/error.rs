use thiserror::Error;

/// Errors raised when building or mutating a transformation.
///
/// Inverting a singular transformation is not an error in itself:
/// [crate::Affine::inverse] reports it as `None`.
/// [TransformError::SingularMatrix] only surfaces from operations which
/// cannot continue without an inverse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("matrix is singular and has no inverse")]
    SingularMatrix,

    #[error("axis {axis} is out of range for a {ndim}-dimensional transform")]
    AxisOutOfRange { axis: usize, ndim: usize },

    #[error("axis {axis} given twice; a plane needs two distinct axes")]
    RepeatedAxis { axis: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("rotation axis has zero length")]
    ZeroRotationAxis,

    #[error("expected {expected} parameters, got {actual}")]
    InvalidParameterLength { expected: usize, actual: usize },

    #[error("invalid matrix shape: {0}")]
    InvalidMatrixShape(String),

    #[error("{0} is not finite")]
    NonFinite(&'static str),
}
