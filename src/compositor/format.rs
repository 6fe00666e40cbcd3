//! Output image formats and encoding.

use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error::{Error, Result};
use crate::tile::EncodedImage;

// ============================================================================
// ImageFormat
// ============================================================================

/// Image format for captures and composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless, larger file size).
    #[default]
    Png,
    /// JPEG format with quality (0-100).
    Jpeg(u8),
}

impl ImageFormat {
    /// Creates PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// Creates JPEG format with quality (0-100).
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) => "image/jpeg",
        }
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpg",
        }
    }

    /// Returns the format string for the protocol.
    #[must_use]
    pub fn format_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpeg",
        }
    }

    /// Returns the quality value if JPEG.
    #[must_use]
    pub fn quality(&self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(*q),
        }
    }

    /// Encodes an RGBA canvas in this format.
    ///
    /// JPEG drops the alpha channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodeFailed`] if the encoder rejects the canvas.
    pub fn encode(&self, canvas: &RgbaImage) -> Result<EncodedImage> {
        let (width, height) = canvas.dimensions();
        let mut buf = Vec::new();

        let written = match self {
            Self::Png => PngEncoder::new(&mut buf).write_image(
                canvas.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            Self::Jpeg(quality) => {
                let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut buf, (*quality).max(1)).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            }
        };
        written.map_err(|e| Error::encode_failed(e.to_string()))?;

        Ok(EncodedImage::new(self.mime_type(), buf))
    }
}

/// Quality used when a format name carries none.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

impl FromStr for ImageFormat {
    type Err = Error;

    /// Parses `png`, `jpeg` or `jpg`, case-insensitively. `jpg` is an alias
    /// for `jpeg` at [`DEFAULT_JPEG_QUALITY`].
    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::jpeg(DEFAULT_JPEG_QUALITY)),
            other => Err(Error::invalid_argument(format!(
                "unsupported image format '{other}'; expected png, jpeg or jpg"
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
