//! Page and viewport geometry.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest canvas a session may target, in pixels (16384 x 16384).
pub const MAX_CANVAS_PIXELS: u64 = 16_384 * 16_384;

// ============================================================================
// PageDimensions
// ============================================================================

/// Full scrollable extent of a document, in CSS pixels.
///
/// Measured once at the start of a capture session and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PageDimensions {
    /// Maximum scrollable width.
    pub width: u32,
    /// Maximum scrollable height.
    pub height: u32,
}

impl PageDimensions {
    /// Creates page dimensions.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Canvas area in pixels.
    #[inline]
    #[must_use]
    pub const fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Rejects pages whose canvas would exceed [`MAX_CANVAS_PIXELS`].
    ///
    /// Dimensions come from the page, so this runs before anything is
    /// allocated from them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an oversized canvas.
    pub fn ensure_drawable(&self) -> Result<()> {
        if self.pixel_count() > MAX_CANVAS_PIXELS {
            return Err(Error::invalid_argument(format!(
                "page {}x{} exceeds the {MAX_CANVAS_PIXELS} pixel canvas limit",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Number of viewport-height steps needed to cover the page.
    ///
    /// At least one tile is always captured, so a zero-height page yields 1.
    #[must_use]
    pub const fn tile_count(&self, viewport_height: u32) -> usize {
        if viewport_height == 0 {
            return 0;
        }
        if self.height == 0 {
            return 1;
        }
        self.height.div_ceil(viewport_height) as usize
    }
}

// ============================================================================
// Viewport
// ============================================================================

/// Visible window size (`innerWidth` x `innerHeight`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Viewport {
    /// Visible width.
    pub width: u32,
    /// Visible height; also the scroll step.
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// ============================================================================
// DocumentMetrics
// ============================================================================

/// Raw size sources reported by the browser.
///
/// Browsers disagree on which box reports the true scrollable size, so the
/// page size is the maximum across all of them. Missing fields read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetrics {
    /// `document.documentElement.scrollWidth`.
    pub root_scroll_width: u32,
    /// `document.documentElement.scrollHeight`.
    pub root_scroll_height: u32,
    /// `document.documentElement.offsetWidth`.
    pub root_offset_width: u32,
    /// `document.documentElement.offsetHeight`.
    pub root_offset_height: u32,
    /// `document.documentElement.clientWidth`.
    pub root_client_width: u32,
    /// `document.documentElement.clientHeight`.
    pub root_client_height: u32,
    /// `document.body.scrollWidth`.
    pub body_scroll_width: u32,
    /// `document.body.scrollHeight`.
    pub body_scroll_height: u32,
    /// `document.body.offsetWidth`.
    pub body_offset_width: u32,
    /// `document.body.offsetHeight`.
    pub body_offset_height: u32,
    /// `window.innerWidth`.
    pub inner_width: u32,
    /// `window.innerHeight`.
    pub inner_height: u32,
}

impl DocumentMetrics {
    /// Reduces the size sources to the page extent.
    #[must_use]
    pub fn page_dimensions(&self) -> PageDimensions {
        let width = [
            self.root_scroll_width,
            self.body_scroll_width,
            self.root_offset_width,
            self.body_offset_width,
            self.root_client_width,
        ]
        .into_iter()
        .max()
        .unwrap_or_default();

        let height = [
            self.root_scroll_height,
            self.body_scroll_height,
            self.root_offset_height,
            self.body_offset_height,
            self.root_client_height,
        ]
        .into_iter()
        .max()
        .unwrap_or_default();

        PageDimensions { width, height }
    }

    /// Returns the visible viewport.
    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.inner_width, self.inner_height)
    }
}

// ============================================================================
// Tests
// ============================================================================
