//! Encoded images and captured tiles.
//!
//! Both the capture primitive's output and the final composite travel as
//! [`EncodedImage`]: raw encoded bytes plus a MIME type, convertible to and
//! from `data:` URLs.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use image::RgbaImage;

use crate::error::{Error, Result};

// ============================================================================
// EncodedImage
// ============================================================================

/// An encoded image payload (PNG, JPEG, ...).
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl EncodedImage {
    /// Creates an encoded image from raw bytes.
    #[inline]
    #[must_use]
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Parses a base64 `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the URL is not a base64 data URL
    /// or the payload is not valid base64.
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| Error::invalid_argument("not a data URL"))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::invalid_argument("data URL has no payload separator"))?;

        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::invalid_argument("data URL is not base64-encoded"))?;

        let bytes = Base64Standard
            .decode(payload)
            .map_err(|e| Error::invalid_argument(format!("invalid base64 payload: {e}")))?;

        Ok(Self::new(mime_type, bytes))
    }

    /// Renders as a base64 `data:` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            Base64Standard.encode(&self.bytes)
        )
    }

    /// Returns the MIME type.
    #[inline]
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the encoded bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the image, returning the encoded bytes.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ============================================================================
// Tile
// ============================================================================

/// One viewport capture taken at a specific scroll offset.
///
/// The index is the tile's position in the session; tiles are drawn in
/// index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Position in the capture sequence.
    pub index: usize,
    /// Vertical scroll offset the tile was captured at.
    pub offset: u32,
    /// Encoded viewport image.
    pub image: EncodedImage,
}

impl Tile {
    /// Creates a tile.
    #[inline]
    #[must_use]
    pub fn new(index: usize, offset: u32, image: EncodedImage) -> Self {
        Self {
            index,
            offset,
            image,
        }
    }

    /// Decodes the tile into RGBA pixels.
    ///
    /// CPU-bound; run on the blocking pool from async code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TileDecodeFailed`] for malformed or unsupported data.
    pub fn decode(&self) -> Result<RgbaImage> {
        image::load_from_memory(self.image.bytes())
            .map(|decoded| decoded.to_rgba8())
            .map_err(|e| Error::decode_failed(self.index, e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
