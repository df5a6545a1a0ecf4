//! Error types for shelfscout.

use thiserror::Error;

/// Result alias for shelfscout operations.
pub type ShelfResult<T> = std::result::Result<T, ShelfError>;

/// Precondition violations reported by the post-processing stages.
///
/// Degenerate inputs (no peaks, no product pixels, no candidates) are not
/// errors; every stage returns a well-defined fallback for them instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ShelfError {
    /// Grid width or height is zero, or their product overflows.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// A flat buffer does not hold exactly the number of elements required.
    #[error("buffer length mismatch: expected {expected} elements, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },
    /// Two grids that must share a shape do not.
    #[error(
        "shape mismatch for {context}: expected {expected_width}x{expected_height}, \
         got {got_width}x{got_height}"
    )]
    ShapeMismatch {
        context: &'static str,
        expected_width: usize,
        expected_height: usize,
        got_width: usize,
        got_height: usize,
    },
    /// A configuration value is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    /// A grid element is non-finite or outside the range its type allows.
    #[error("value {value} at index {index} out of range for {context}")]
    ValueOutOfRange {
        context: &'static str,
        index: usize,
        value: f32,
    },
    /// Image encoding or writing failed.
    #[error("image io failed: {reason}")]
    ImageIo { reason: String },
}
