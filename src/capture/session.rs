//! Per-session capture state.

use crate::identifiers::SessionId;
use crate::tile::{EncodedImage, Tile};

use super::dimensions::{PageDimensions, Viewport};

// ============================================================================
// CaptureSession
// ============================================================================

/// Transient state of one capture: offset, target size and collected tiles.
///
/// Created when a capture starts and consumed by [`CaptureSession::finish`].
#[derive(Debug)]
pub struct CaptureSession {
    id: SessionId,
    dimensions: PageDimensions,
    viewport: Viewport,
    offset: u32,
    tiles: Vec<Tile>,
}

impl CaptureSession {
    /// Starts a session for a page of `dimensions` seen through `viewport`.
    #[must_use]
    pub fn new(dimensions: PageDimensions, viewport: Viewport) -> Self {
        Self {
            id: SessionId::next(),
            dimensions,
            viewport,
            offset: 0,
            tiles: Vec::new(),
        }
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the page dimensions measured at session start.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> PageDimensions {
        self.dimensions
    }

    /// Current vertical scroll offset.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Index the next tile will receive.
    #[inline]
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.tiles.len()
    }

    /// Records a capture taken at the current offset and advances one viewport.
    pub fn push(&mut self, image: EncodedImage) {
        let tile = Tile::new(self.tiles.len(), self.offset, image);
        self.tiles.push(tile);
        self.offset = self.offset.saturating_add(self.viewport.height);
    }

    /// Returns `true` while the offset is still inside the page.
    #[inline]
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.offset < self.dimensions.height
    }

    /// Consumes the session into its result.
    #[must_use]
    pub fn finish(self) -> CaptureResult {
        CaptureResult {
            session_id: self.id,
            tiles: self.tiles,
            full_width: self.dimensions.width,
            full_height: self.dimensions.height,
        }
    }
}

// ============================================================================
// CaptureResult
// ============================================================================

/// Ordered tiles plus the full page size, handed to the compositor.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// Session that produced the tiles.
    pub session_id: SessionId,
    /// Tiles in strictly increasing offset order.
    pub tiles: Vec<Tile>,
    /// Full page width.
    pub full_width: u32,
    /// Full page height.
    pub full_height: u32,
}

// ============================================================================
// Tests
// ============================================================================
