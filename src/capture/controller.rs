//! The scroll-and-capture loop.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::tile::EncodedImage;

use super::document::{CapturePrimitive, Document};
use super::session::{CaptureResult, CaptureSession};
use super::settle::{FixedDelay, SettleStrategy};

// ============================================================================
// CaptureController
// ============================================================================

/// Drives one full-page capture: scroll, settle, capture, advance.
///
/// Captures are strictly sequential; the next scroll only happens after the
/// previous capture resolved.
///
/// # Example
///
/// ```ignore
/// let controller = CaptureController::new(document, primitive)
///     .with_capture_timeout(Some(Duration::from_secs(5)));
///
/// let result = controller.capture_full_page().await?;
/// println!("{} tiles for {}x{}", result.tiles.len(), result.full_width, result.full_height);
/// ```
pub struct CaptureController<D, C, S = FixedDelay> {
    document: D,
    primitive: C,
    settle: S,
    capture_timeout: Option<Duration>,
}

impl<D, C> CaptureController<D, C, FixedDelay>
where
    D: Document,
    C: CapturePrimitive,
{
    /// Creates a controller with the default settle delay.
    #[must_use]
    pub fn new(document: D, primitive: C) -> Self {
        Self {
            document,
            primitive,
            settle: FixedDelay::default(),
            capture_timeout: None,
        }
    }
}

impl<D, C, S> CaptureController<D, C, S>
where
    D: Document,
    C: CapturePrimitive,
    S: SettleStrategy,
{
    /// Replaces the settle strategy.
    #[must_use]
    pub fn with_settle<T: SettleStrategy>(self, settle: T) -> CaptureController<D, C, T> {
        CaptureController {
            document: self.document,
            primitive: self.primitive,
            settle,
            capture_timeout: self.capture_timeout,
        }
    }

    /// Bounds each capture round-trip. `None` waits indefinitely.
    #[must_use]
    pub fn with_capture_timeout(mut self, capture_timeout: Option<Duration>) -> Self {
        self.capture_timeout = capture_timeout;
        self
    }

    /// Captures the whole document as an ordered tile sequence.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the viewport height is zero or the page
    ///   exceeds [`MAX_CANVAS_PIXELS`](super::MAX_CANVAS_PIXELS)
    /// - [`Error::PlatformCaptureFailed`] if any capture fails or times out;
    ///   the session is aborted and collected tiles are dropped
    /// - Document errors from measuring or scrolling are propagated as-is
    pub async fn capture_full_page(&self) -> Result<CaptureResult> {
        let dimensions = self.document.measure_document().await?;
        let viewport = self.document.viewport().await?;

        if viewport.height == 0 {
            return Err(Error::invalid_argument(
                "viewport height is zero; scrolling cannot advance",
            ));
        }
        dimensions.ensure_drawable()?;

        let mut session = CaptureSession::new(dimensions, viewport);

        info!(
            session_id = %session.id(),
            width = dimensions.width,
            height = dimensions.height,
            viewport_height = viewport.height,
            expected_tiles = dimensions.tile_count(viewport.height),
            "Starting full-page capture"
        );

        loop {
            let offset = session.offset();
            let index = session.next_index();

            self.document.scroll_to(0, offset).await?;
            self.settle.settle().await;

            let image = self.capture_tile(index).await?;
            debug!(session_id = %session.id(), index, offset, "Tile captured");
            session.push(image);

            if !session.has_more() {
                break;
            }
        }

        let result = session.finish();
        info!(
            session_id = %result.session_id,
            tiles = result.tiles.len(),
            "Full-page capture complete"
        );

        Ok(result)
    }

    /// Requests one capture, applying the optional timeout.
    async fn capture_tile(&self, index: usize) -> Result<EncodedImage> {
        let capture = self.primitive.capture_visible();

        let outcome = match self.capture_timeout {
            Some(limit) => timeout(limit, capture).await.map_err(|_| {
                Error::capture_failed(
                    index,
                    format!("no response within {}ms", limit.as_millis()),
                )
            })?,
            None => capture.await,
        };

        outcome.map_err(|e| match e {
            Error::PlatformCaptureFailed { message, .. } => Error::capture_failed(index, message),
            other => Error::capture_failed(index, other.to_string()),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
