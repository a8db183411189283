//! Image bytes to pixel tensor decoding

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageDecoder, ImageFormat, Limits, RgbImage};
use ndarray::{Array3, Axis};
use tracing::debug;

use crate::tensor::PixelTensor;
use crate::DecodeError;

/// Channel count of every decoded tensor
pub const RGB_CHANNELS: u8 = 3;

/// Largest RGBA frame buffer an animated image may need, same as the still-image default
pub const MAX_FRAME_BYTES: u64 = 512 * 1024 * 1024;

/// Result of decoding an upload
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixel data coerced to RGB
    pub tensor: PixelTensor,
    /// Detected container format
    pub format: ImageFormat,
    /// Channel count of the source before coercion
    pub source_channels: u8,
}

impl DecodedImage {
    /// Whether the source had to be converted to reach 3 channels
    pub fn was_coerced(&self) -> bool {
        self.source_channels != RGB_CHANNELS
    }
}

/// Decode raw bytes into a pixel tensor with `channels` channels.
///
/// The container format is sniffed from the content. Animated GIFs decode to a
/// frame batch and are only accepted when they hold exactly one frame. Sources
/// with other channel layouts (gray, gray+alpha, RGBA) are converted to RGB.
pub fn decode_image(bytes: &[u8], channels: u8) -> Result<DecodedImage, DecodeError> {
    if channels != RGB_CHANNELS {
        return Err(DecodeError::UnsupportedChannels(channels));
    }
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let format = image::guess_format(bytes)?;
    let decoded = match format {
        ImageFormat::Gif => decode_frames(bytes)?,
        _ => decode_still(bytes, format)?,
    };

    if decoded.was_coerced() {
        debug!(
            "Coerced {:?} image from {} to {} channels",
            format, decoded.source_channels, RGB_CHANNELS
        );
    }
    Ok(decoded)
}

fn decode_still(bytes: &[u8], format: ImageFormat) -> Result<DecodedImage, DecodeError> {
    let img = image::load_from_memory_with_format(bytes, format)?;
    let source_channels = img.color().channel_count();
    let pixels = rgb_to_array(img.to_rgb8())?;

    Ok(DecodedImage {
        tensor: PixelTensor::three_dimensional(pixels)?,
        format,
        source_channels,
    })
}

fn decode_frames(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let mut decoder = GifDecoder::new(Cursor::new(bytes))?;

    // Every frame is expanded to the full canvas, so check the canvas before decoding any
    let (width, height) = decoder.dimensions();
    if u64::from(width) * u64::from(height) * 4 > MAX_FRAME_BYTES {
        return Err(DecodeError::TooLarge { width, height });
    }
    let mut limits = Limits::default();
    limits.max_alloc = Some(MAX_FRAME_BYTES);
    decoder.set_limits(limits)?;

    // A second frame is enough to reject the upload
    let mut frames = decoder
        .into_frames()
        .take(2)
        .collect::<Result<Vec<_>, _>>()?;
    if frames.len() > 1 {
        return Err(DecodeError::MultiFrame);
    }
    let Some(frame) = frames.pop() else {
        return Err(DecodeError::Format("GIF contains no frames".to_string()));
    };

    // GIF frames are always expanded to RGBA
    let rgb = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
    let pixels = rgb_to_array(rgb)?.insert_axis(Axis(0));

    Ok(DecodedImage {
        tensor: PixelTensor::batch_of_one(pixels)?,
        format: ImageFormat::Gif,
        source_channels: 4,
    })
}

fn rgb_to_array(rgb: RgbImage) -> Result<Array3<u8>, DecodeError> {
    let (width, height) = rgb.dimensions();
    let shape = (height as usize, width as usize, RGB_CHANNELS as usize);
    Array3::from_shape_vec(shape, rgb.into_raw())
        .map_err(|_| DecodeError::Shape(vec![shape.0, shape.1, shape.2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, GrayImage, Luma, Rgb, RgbaImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    fn gif_bytes(frame_count: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            for i in 0..frame_count {
                let rgba = RgbaImage::from_pixel(4, 3, image::Rgba([10 * i as u8, 200, 30, 255]));
                encoder
                    .encode_frame(Frame::from_parts(rgba, 0, 0, Delay::from_numer_denom_ms(100, 1)))
                    .unwrap();
            }
        }
        buf
    }

    #[test]
    fn test_decode_png_rgb() {
        let img = RgbImage::from_fn(5, 2, |x, y| Rgb([x as u8, y as u8, 9]));
        let decoded = decode_image(&png_bytes(DynamicImage::ImageRgb8(img)), 3).unwrap();

        assert_eq!(decoded.format, ImageFormat::Png);
        assert!(!decoded.was_coerced());
        assert_eq!(decoded.tensor.rank(), 3);
        assert_eq!(decoded.tensor.shape(), &[2, 5, 3]);

        let rgb = decoded.tensor.into_rgb();
        assert_eq!(rgb.get_pixel(4, 1), Some([4, 1, 9]));
    }

    #[test]
    fn test_grayscale_coerced_to_rgb() {
        let gray = GrayImage::from_pixel(3, 3, Luma([77]));
        let decoded = decode_image(&png_bytes(DynamicImage::ImageLuma8(gray)), 3).unwrap();

        assert_eq!(decoded.source_channels, 1);
        assert!(decoded.was_coerced());
        assert_eq!(decoded.tensor.shape(), &[3, 3, 3]);
        assert_eq!(decoded.tensor.into_rgb().get_pixel(0, 0), Some([77, 77, 77]));
    }

    #[test]
    fn test_rgba_alpha_dropped() {
        let rgba = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 128]));
        let decoded = decode_image(&png_bytes(DynamicImage::ImageRgba8(rgba)), 3).unwrap();

        assert_eq!(decoded.source_channels, 4);
        assert_eq!(decoded.tensor.shape(), &[2, 2, 3]);
    }

    #[test]
    fn test_single_frame_gif_is_batch_of_one() {
        let decoded = decode_image(&gif_bytes(1), 3).unwrap();

        assert_eq!(decoded.format, ImageFormat::Gif);
        assert_eq!(decoded.tensor.rank(), 4);
        assert_eq!(decoded.tensor.shape(), &[1, 3, 4, 3]);
        assert_eq!(decoded.tensor.into_rgb().height(), 3);
    }

    #[test]
    fn test_multi_frame_gif_rejected() {
        let result = decode_image(&gif_bytes(3), 3);
        assert!(matches!(result, Err(DecodeError::MultiFrame)));
    }

    #[test]
    fn test_huge_gif_canvas_rejected_before_decoding() {
        // 1x1 frames on a 16000x16000 logical screen
        let mut bytes = gif_bytes(4);
        bytes[6..8].copy_from_slice(&16000u16.to_le_bytes());
        bytes[8..10].copy_from_slice(&16000u16.to_le_bytes());

        let start = std::time::Instant::now();
        let result = decode_image(&bytes, 3);

        assert!(matches!(
            result,
            Err(DecodeError::TooLarge { width: 16000, height: 16000 })
        ));
        assert!(start.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_gif_canvas_within_budget_still_decodes() {
        let mut bytes = gif_bytes(1);
        // Widen the canvas, the 4x3 frame sits in its top-left corner
        bytes[6..8].copy_from_slice(&8u16.to_le_bytes());

        let decoded = decode_image(&bytes, 3).unwrap();
        assert_eq!(decoded.tensor.shape(), &[1, 3, 8, 3]);
    }

    #[test]
    fn test_text_is_not_an_image() {
        let result = decode_image(b"hello, this is not an image\n", 3);
        assert!(matches!(result, Err(DecodeError::Format(_))));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(decode_image(&[], 3), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_only_three_channels_supported() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(1, 1)));
        assert!(matches!(decode_image(&bytes, 4), Err(DecodeError::UnsupportedChannels(4))));
    }

    #[test]
    fn test_truncated_png() {
        let bytes = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(8, 8)));
        let result = decode_image(&bytes[..bytes.len() / 2], 3);
        assert!(matches!(result, Err(DecodeError::Format(_))));
    }
}
