//! Error types for frame validation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Frame has a zero dimension
    #[error("empty frame ({width}x{height})")]
    EmptyFrame { width: usize, height: usize },

    /// Pixel buffer is shorter than width * height * channels
    #[error("frame buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}

pub type Result<T> = core::result::Result<T, DetectError>;
