//! Error types for every layer that can fail.
//!
//! Geometry and spectrum evaluation are total, so only the matrix layer, the
//! render scheduler and the two external collaborators (TGA files and JSON
//! scene descriptions) have error types.

use std::io;

/// Failures of the linear algebra layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MathError {
    /// Closed-form determinant and inverse only exist for sizes 1 to 3.
    #[error("determinant and inverse are only implemented for sizes up to 3, got {0}")]
    UnsupportedSize(usize),

    #[error("matrix is not invertible (zero determinant)")]
    NonInvertible,
}

/// Failures of a render job.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("invalid render options: {0}")]
    InvalidOptions(String),

    /// A single pixel unit failed. Other pixels were still processed.
    #[error("pixel at row {row}, column {col} failed: {message}")]
    PixelFailed { row: usize, col: usize, message: String },

    /// The job finished, but at least one pixel unit failed.
    #[error("render failed on {failures} pixel(s); first failure: {first}")]
    Failed { failures: usize, first: Box<RenderError> },

    #[error("render job was cancelled")]
    Cancelled,

    #[error("render job was lost: {0}")]
    Lost(String),
}

/// Failures reading or writing TGA image containers.
#[derive(Debug, thiserror::Error)]
pub enum TgaError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported TGA image type {0}")]
    UnsupportedImageType(u8),

    #[error("image of {width}x{height} does not fit a TGA header")]
    TooLarge { width: usize, height: usize },

    #[error("expected {expected} bytes of pixel data, got {actual}")]
    DataLength { expected: usize, actual: usize },
}

/// Failures building a scene from a JSON description.
#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("failed to read scene description: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse scene description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown spectrum `{0}`")]
    UnknownSpectrum(String),

    #[error("unknown material `{0}`")]
    UnknownMaterial(String),

    #[error("spectrum `{0}` is defined in terms of itself")]
    CyclicSpectrum(String),

    #[error("invalid transform: {0}")]
    Transform(#[from] MathError),

    #[error("invalid scene description: {0}")]
    Invalid(String),
}
