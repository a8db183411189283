//! Pixel Tensor Library
//!
//! Decodes uploaded image bytes into RGB pixel tensors.
//! Supports:
//! - Still images (PNG, JPEG, WebP, BMP, ...) as height x width x 3
//! - Single-frame animations (GIF) as 1 x height x width x 3
//! - Rank normalization back to height x width x 3 before classification

pub mod decode;
pub mod tensor;

pub use decode::{decode_image, DecodedImage, RGB_CHANNELS};
pub use tensor::{BatchPixels, PixelTensor, Pixels, RgbTensor};

use thiserror::Error;

/// Decode error types
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Image data is empty")]
    Empty,

    #[error("Unsupported or malformed image: {0}")]
    Format(String),

    #[error("Unsupported channel count {0}, only 3 is supported")]
    UnsupportedChannels(u8),

    #[error("Animated image has more than one frame, expected a single frame")]
    MultiFrame,

    #[error("Image canvas {width}x{height} exceeds the decode memory limit")]
    TooLarge { width: u32, height: u32 },

    #[error("Invalid tensor shape {0:?}")]
    Shape(Vec<usize>),
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        DecodeError::Format(e.to_string())
    }
}
