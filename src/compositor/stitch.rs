//! Tile stitching.

use futures_util::future::try_join_all;
use image::{RgbaImage, imageops};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::capture::PageDimensions;
use crate::error::{Error, Result};
use crate::tile::{EncodedImage, Tile};

use super::format::ImageFormat;

// ============================================================================
// Placement
// ============================================================================

/// Where one tile landed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Tile index.
    pub index: usize,
    /// Top edge on the canvas.
    pub y: u32,
    /// Decoded tile height.
    pub height: u32,
}

// ============================================================================
// Composite
// ============================================================================

/// A stitched full-page canvas.
#[derive(Debug, Clone)]
pub struct Composite {
    canvas: RgbaImage,
    placements: Vec<Placement>,
}

impl Composite {
    /// Returns the canvas.
    #[inline]
    #[must_use]
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Returns tile placements in draw order.
    #[inline]
    #[must_use]
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Canvas width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Canvas height.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Returns `true` for a zero-area composite.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Consumes the composite and encodes its canvas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodeFailed`] if the encoder rejects the canvas,
    /// which includes zero-area composites.
    pub async fn encode(self, format: ImageFormat) -> Result<EncodedImage> {
        if self.is_empty() {
            return Err(Error::encode_failed("composite has zero area"));
        }

        let canvas = self.canvas;
        spawn_blocking(move || format.encode(&canvas))
            .await
            .map_err(|e| Error::encode_failed(e.to_string()))?
    }
}

// ============================================================================
// Compositor
// ============================================================================

/// Assembles ordered tiles into one full-page image.
///
/// Tiles are decoded concurrently on the blocking pool. Drawing starts only
/// after every decode resolved, and follows tile order regardless of which
/// decode finished first.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compositor;

impl Compositor {
    /// Creates a compositor.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Stitches `tiles` onto a `full_width` x `full_height` canvas.
    ///
    /// Each tile is drawn at `(0, y)` where `y` is the sum of the decoded
    /// heights of all earlier tiles. A tile whose real height differs from
    /// the viewport height therefore shifts every later tile. Pixels outside
    /// the canvas are clipped.
    ///
    /// A zero-area target returns an empty composite without decoding.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the canvas would exceed
    ///   [`MAX_CANVAS_PIXELS`](crate::capture::MAX_CANVAS_PIXELS); nothing is
    ///   decoded or allocated
    /// - [`Error::TileDecodeFailed`] if any tile fails to decode; no partial
    ///   composite is produced
    pub async fn stitch(
        &self,
        mut tiles: Vec<Tile>,
        full_width: u32,
        full_height: u32,
    ) -> Result<Composite> {
        if full_width == 0 || full_height == 0 {
            debug!(full_width, full_height, "Zero-area composite, nothing to draw");
            return Ok(Composite {
                canvas: RgbaImage::new(full_width, full_height),
                placements: Vec::new(),
            });
        }

        PageDimensions::new(full_width, full_height).ensure_drawable()?;
        tiles.sort_by_key(|tile| tile.index);

        let decoded = try_join_all(tiles.into_iter().map(|tile| async move {
            let index = tile.index;
            spawn_blocking(move || tile.decode().map(|pixels| (index, pixels)))
                .await
                .map_err(|e| Error::decode_failed(index, e.to_string()))?
        }))
        .await?;

        let mut canvas = RgbaImage::new(full_width, full_height);
        let mut placements = Vec::with_capacity(decoded.len());
        let mut y: u32 = 0;

        for (index, pixels) in decoded {
            imageops::overlay(&mut canvas, &pixels, 0, i64::from(y));
            placements.push(Placement {
                index,
                y,
                height: pixels.height(),
            });
            y = y.saturating_add(pixels.height());
        }

        debug!(
            width = full_width,
            height = full_height,
            tiles = placements.len(),
            drawn_height = y,
            "Composite stitched"
        );

        Ok(Composite { canvas, placements })
    }
}

// ============================================================================
// Tests
// ============================================================================
