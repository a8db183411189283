//! Rank-tagged pixel tensors
//!
//! Pixel arrays can only be wrapped through the checked constructors on
//! [`PixelTensor`], so every tensor in circulation has 3 channels and, when
//! batched, a batch of exactly one.

use image::RgbImage;
use ndarray::{Array3, Array4, Axis};

use crate::decode::RGB_CHANNELS;
use crate::DecodeError;

/// Decoded RGB pixel data, tagged by rank
#[derive(Debug, Clone, PartialEq)]
pub enum PixelTensor {
    /// height x width x 3
    ThreeDimensional(Pixels),
    /// 1 x height x width x 3
    BatchOfOne(BatchPixels),
}

/// height x width x 3 array
#[derive(Debug, Clone, PartialEq)]
pub struct Pixels(Array3<u8>);

impl Pixels {
    pub fn as_array(&self) -> &Array3<u8> {
        &self.0
    }
}

/// 1 x height x width x 3 array
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPixels(Array4<u8>);

impl BatchPixels {
    pub fn as_array(&self) -> &Array4<u8> {
        &self.0
    }
}

impl PixelTensor {
    /// Wrap a height x width x channels array
    pub fn three_dimensional(pixels: Array3<u8>) -> Result<Self, DecodeError> {
        if pixels.shape()[2] != RGB_CHANNELS as usize {
            return Err(DecodeError::Shape(pixels.shape().to_vec()));
        }
        Ok(PixelTensor::ThreeDimensional(Pixels(pixels)))
    }

    /// Wrap a batch x height x width x channels array whose batch is exactly 1
    pub fn batch_of_one(pixels: Array4<u8>) -> Result<Self, DecodeError> {
        let shape = pixels.shape();
        if shape[0] != 1 || shape[3] != RGB_CHANNELS as usize {
            return Err(DecodeError::Shape(shape.to_vec()));
        }
        Ok(PixelTensor::BatchOfOne(BatchPixels(pixels)))
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        match self {
            PixelTensor::ThreeDimensional(_) => 3,
            PixelTensor::BatchOfOne(_) => 4,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            PixelTensor::ThreeDimensional(p) => p.0.shape(),
            PixelTensor::BatchOfOne(p) => p.0.shape(),
        }
    }

    /// Drop the batch axis if present
    pub fn into_rgb(self) -> RgbTensor {
        match self {
            PixelTensor::ThreeDimensional(p) => RgbTensor(p.0),
            PixelTensor::BatchOfOne(p) => RgbTensor(p.0.index_axis_move(Axis(0), 0)),
        }
    }
}

/// Rank-3 RGB tensor, the only shape the classifier accepts
#[derive(Debug, Clone, PartialEq)]
pub struct RgbTensor(Array3<u8>);

impl RgbTensor {
    pub fn height(&self) -> u32 {
        self.0.shape()[0] as u32
    }

    pub fn width(&self) -> u32 {
        self.0.shape()[1] as u32
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some([self.0[[y, x, 0]], self.0[[y, x, 1]], self.0[[y, x, 2]]])
    }

    pub fn as_array(&self) -> &Array3<u8> {
        &self.0
    }

    /// Copy into an `image` buffer for resizing
    pub fn to_rgb_image(&self) -> Result<RgbImage, DecodeError> {
        let raw: Vec<u8> = self.0.iter().copied().collect();
        RgbImage::from_raw(self.width(), self.height(), raw)
            .ok_or_else(|| DecodeError::Shape(self.0.shape().to_vec()))
    }
}

impl From<PixelTensor> for RgbTensor {
    fn from(t: PixelTensor) -> Self {
        t.into_rgb()
    }
}
