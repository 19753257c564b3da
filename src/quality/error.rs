//! Error types for the quality gate.

use thiserror::Error;

/// Errors raised while turning submitted bytes into pixels.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    /// The submission carried no bytes at all.
    #[error("Image payload is empty")]
    Empty,

    /// The bytes decoded to an image with zero width or height.
    #[error("Image has no pixels")]
    NoPixels,

    /// The bytes are not an image in any supported format.
    #[error("Image decode error: {0}")]
    Malformed(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}
