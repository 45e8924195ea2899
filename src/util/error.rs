//! Error types for ringmatch.

use thiserror::Error;

/// Result alias for ringmatch operations.
pub type RingMatchResult<T> = std::result::Result<T, RingMatchError>;

/// Errors that can occur before a matching run starts.
///
/// Every variant is raised during synchronous validation; once workers are
/// running the computation cannot fail.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RingMatchError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer does not cover the described image.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Ring geometry (radius, count, increment) is unusable.
    #[error("invalid ring geometry: {reason}")]
    InvalidGeometry { reason: &'static str },
    /// A matching parameter is out of range.
    #[error("invalid match config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// A ring of the given radius centered at `(x, y)` leaves the image.
    #[error("ring of radius {radius} at ({x}, {y}) exceeds {img_width}x{img_height} image")]
    RingOutOfBounds {
        x: usize,
        y: usize,
        radius: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A ring vector does not have the shape the rasterizer implies.
    #[error("ring vector shape mismatch: {reason}")]
    ShapeMismatch { reason: String },
    /// Image decoding or encoding failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
}
