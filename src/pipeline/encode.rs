//! Lossy image encoding: `DynamicImage` → JPEG bytes.
//!
//! JPEG is the only output format: both the compressed PDF (as `DCTDecode`
//! image XObjects) and the convert archive embed the encoded bytes as-is,
//! without re-decoding.

use crate::config::Quality;
use image::codecs::jpeg;
use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";

/// An encoded page or image.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Colour channels in the JPEG stream: 1 (gray), 3 (RGB) or 4 (CMYK).
    pub components: u8,
    pub quality: Quality,
}

impl EncodedImage {
    /// PDF colour space name matching `components`.
    pub fn color_space(&self) -> &'static str {
        match self.components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct EncodeError(pub String);

impl From<image::ImageError> for EncodeError {
    fn from(e: image::ImageError) -> Self {
        EncodeError(e.to_string())
    }
}

/// Encodes pixels at a lossy quality factor.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, image: &DynamicImage, quality: Quality) -> Result<EncodedImage, EncodeError>;
}

/// Baseline JPEG via the `image` crate. Alpha is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn encode(&self, image: &DynamicImage, quality: Quality) -> Result<EncodedImage, EncodeError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut buf = Vec::new();
        jpeg::JpegEncoder::new_with_quality(&mut buf, quality.as_jpeg_quality())
            .encode_image(&rgb)?;

        debug!(
            "Encoded {}x{} image at {} → {} bytes",
            width,
            height,
            quality,
            buf.len()
        );
        Ok(EncodedImage {
            bytes: buf,
            width,
            height,
            components: 3,
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn noise(w: u32, h: u32) -> DynamicImage {
        let mut seed = 0x2545_f491_u32;
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |_, _| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let [a, b, c, _] = seed.to_le_bytes();
            Rgb([a, b, c])
        }))
    }

    #[test]
    fn encodes_valid_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
        let out = JpegEncoder.encode(&img, Quality::new(0.7)).unwrap();
        assert_eq!((out.width, out.height), (10, 10));
        assert_eq!(out.color_space(), "DeviceRGB");
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.width(), 10);
    }

    #[test]
    fn alpha_is_dropped() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 10])));
        assert!(JpegEncoder.encode(&img, Quality::new(0.5)).is_ok());
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let img = noise(64, 64);
        let low = JpegEncoder.encode(&img, Quality::new(0.1)).unwrap();
        let high = JpegEncoder.encode(&img, Quality::new(1.0)).unwrap();
        assert!(low.len() <= high.len(), "{} > {}", low.len(), high.len());
    }

    #[test]
    fn color_space_follows_components() {
        let mut img = JpegEncoder.encode(&noise(2, 2), Quality::new(0.5)).unwrap();
        img.components = 1;
        assert_eq!(img.color_space(), "DeviceGray");
        img.components = 4;
        assert_eq!(img.color_space(), "DeviceCMYK");
    }
}
