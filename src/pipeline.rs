//! Session orchestration: capture, stitch, upload.
//!
//! [`Pipeline::run`] plays the privileged context. It spawns the page
//! context with a [`CaptureController`], asks it for the full page, serves
//! its capture requests with the platform primitive, then stitches and
//! uploads the result.
//!
//! Only one session runs at a time; a second trigger while one is in flight
//! fails with [`Error::SessionInProgress`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bridge::{self, ContentCommand, PrivilegedClient, PrivilegedCommand, Responder};
use crate::capture::{CaptureController, CapturePrimitive, CaptureResult, Document, FixedDelay};
use crate::compositor::{Compositor, Placement};
use crate::config::CaptureConfig;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::tile::EncodedImage;
use crate::upload::Uploader;

// ============================================================================
// UploadOutcome
// ============================================================================

/// What happened to the composite after stitching.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The server accepted the upload and replied with this JSON.
    Delivered(Value),
    /// The upload failed; the composite itself was complete.
    Failed(String),
    /// Nothing was uploaded because the page had zero area.
    Skipped,
}

impl UploadOutcome {
    /// Returns `true` if the upload was delivered.
    #[inline]
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

// ============================================================================
// SessionReport
// ============================================================================

/// Summary of one finished capture session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Session ID.
    pub session_id: SessionId,
    /// Number of tiles captured.
    pub tile_count: usize,
    /// Composite width.
    pub width: u32,
    /// Composite height.
    pub height: u32,
    /// Where each tile was drawn.
    pub placements: Vec<Placement>,
    /// Upload result.
    pub upload: UploadOutcome,
}

// ============================================================================
// SessionGuard
// ============================================================================

/// Holds the single session slot until dropped.
struct SessionGuard {
    active: Arc<AtomicBool>,
}

impl SessionGuard {
    fn acquire(active: &Arc<AtomicBool>) -> Result<Self> {
        active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::SessionInProgress)?;

        Ok(Self {
            active: Arc::clone(active),
        })
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs capture sessions end to end.
pub struct Pipeline {
    config: CaptureConfig,
    compositor: Compositor,
    uploader: Arc<dyn Uploader>,
    active: Arc<AtomicBool>,
}

impl Pipeline {
    /// Creates a pipeline that uploads through `uploader`.
    #[must_use]
    pub fn new(config: CaptureConfig, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            config,
            compositor: Compositor::new(),
            uploader,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Returns the uploader.
    #[inline]
    #[must_use]
    pub fn uploader(&self) -> &Arc<dyn Uploader> {
        &self.uploader
    }

    /// Returns `true` while a session is running.
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Runs one capture session.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionInProgress`] if another session is running
    /// - [`Error::PlatformCaptureFailed`] if a capture fails
    /// - [`Error::TileDecodeFailed`] if a tile does not decode; nothing is uploaded
    /// - [`Error::EncodeFailed`] if the composite cannot be encoded
    ///
    /// Upload failures do not fail the session; they are logged and reported
    /// in [`SessionReport::upload`].
    pub async fn run<D, P>(&self, document: D, primitive: P) -> Result<SessionReport>
    where
        D: Document + 'static,
        P: CapturePrimitive,
    {
        let _guard = SessionGuard::acquire(&self.active)?;

        let captured = self.collect(document, &primitive).await?;
        let session_id = captured.session_id;
        let tile_count = captured.tiles.len();

        let composite = self
            .compositor
            .stitch(captured.tiles, captured.full_width, captured.full_height)
            .await?;

        let (width, height) = (composite.width(), composite.height());
        let placements = composite.placements().to_vec();

        let upload = if composite.is_empty() {
            info!(%session_id, "Zero-area page, skipping upload");
            UploadOutcome::Skipped
        } else {
            let encoded = composite.encode(self.config.format).await?;
            let data_url = encoded.to_data_url();
            debug!(%session_id, bytes = encoded.bytes().len(), "Composite encoded");

            match self.uploader.upload_image(&data_url).await {
                Ok(response) => UploadOutcome::Delivered(response),
                Err(e) => {
                    warn!(%session_id, error = %e, "Upload failed");
                    UploadOutcome::Failed(e.to_string())
                }
            }
        };

        info!(
            %session_id,
            tiles = tile_count,
            width,
            height,
            delivered = upload.is_delivered(),
            "Capture session finished"
        );

        Ok(SessionReport {
            session_id,
            tile_count,
            width,
            height,
            placements,
            upload,
        })
    }

    /// Runs the page context and serves its capture requests until it replies.
    async fn collect<D, P>(&self, document: D, primitive: &P) -> Result<CaptureResult>
    where
        D: Document + 'static,
        P: CapturePrimitive,
    {
        let (privileged_caller, mut privileged_inbox) = bridge::channel(1);
        let (content_caller, content_inbox) = bridge::channel(1);

        let controller = CaptureController::new(document, PrivilegedClient::new(privileged_caller))
            .with_settle(FixedDelay::new(self.config.settle_delay))
            .with_capture_timeout(self.config.capture_timeout);

        let page = tokio::spawn(bridge::serve_content(content_inbox, controller));

        // The in-flight capture is polled next to the reply, so a capture the
        // page context already gave up on is dropped instead of awaited.
        let result = {
            let reply = content_caller.call(ContentCommand::CaptureFullPage);
            tokio::pin!(reply);

            let mut capture: Option<BoxFuture<'_, Result<EncodedImage>>> = None;
            let mut responder: Option<Responder<EncodedImage>> = None;

            loop {
                tokio::select! {
                    result = &mut reply => {
                        if capture.is_some() {
                            debug!("Abandoning capture the page context stopped waiting for");
                        }
                        break result;
                    }

                    captured = in_flight(&mut capture), if capture.is_some() => {
                        capture = None;
                        if let Some(responder) = responder.take() {
                            responder.respond(captured);
                        }
                    }

                    Some((command, reply_slot)) = privileged_inbox.recv(), if capture.is_none() => {
                        match command {
                            PrivilegedCommand::CaptureVisible => {
                                capture = Some(primitive.capture_visible());
                                responder = Some(reply_slot);
                            }
                        }
                    }
                }
            }
        };

        drop(content_caller);
        if let Err(e) = page.await {
            warn!(error = %e, "Page context task ended abnormally");
        }

        result
    }
}

/// Awaits the in-flight capture. Only polled while one exists.
async fn in_flight(
    capture: &mut Option<BoxFuture<'_, Result<EncodedImage>>>,
) -> Result<EncodedImage> {
    match capture {
        Some(capture) => capture.await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::error::ErrorKind;
    use crate::testing::{FakePrimitive, PALETTE, RecordingUploader, SyntheticDocument};

    fn config() -> CaptureConfig {
        CaptureConfig::builder()
            .upload_endpoint("http://127.0.0.1:9/upload")
            .settle_delay(Duration::ZERO)
            .build()
            .expect("config")
    }

    fn decode_data_url(data_url: &str) -> image::RgbaImage {
        let encoded = EncodedImage::from_data_url(data_url).expect("data url");
        image::load_from_memory(encoded.bytes())
            .expect("decode")
            .to_rgba8()
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let uploader = Arc::new(RecordingUploader::default());
        let pipeline = Pipeline::new(config(), uploader.clone());
        let document = Arc::new(SyntheticDocument::new(800, 2500, 1000));
        let primitive = FakePrimitive::new(800, 1000);

        let report = pipeline
            .run(Arc::clone(&document), primitive)
            .await
            .expect("session");

        assert_eq!(document.scrolls(), vec![(0, 0), (0, 1000), (0, 2000)]);
        assert_eq!(report.tile_count, 3);
        assert_eq!((report.width, report.height), (800, 2500));
        let ys: Vec<u32> = report.placements.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![0, 1000, 2000]);
        assert!(report.upload.is_delivered());

        let images = uploader.images();
        assert_eq!(images.len(), 1);
        assert!(images[0].starts_with("data:image/png;base64,"));

        let composite = decode_data_url(&images[0]);
        assert_eq!(composite.dimensions(), (800, 2500));
        assert_eq!(composite.get_pixel(10, 500).0, PALETTE[0]);
        assert_eq!(composite.get_pixel(10, 1500).0, PALETTE[1]);
        assert_eq!(composite.get_pixel(10, 2100).0, PALETTE[2]);
        assert!(!pipeline.is_busy());
    }

    #[tokio::test]
    async fn test_decode_failure_skips_upload() {
        let uploader = Arc::new(RecordingUploader::default());
        let pipeline = Pipeline::new(config(), uploader.clone());
        let document = Arc::new(SyntheticDocument::new(100, 300, 100));
        let primitive = FakePrimitive::new(100, 100).garbage_at(1);

        let err = pipeline.run(document, primitive).await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::TileDecodeFailed));
        assert!(matches!(err, Error::TileDecodeFailed { index: 1, .. }));
        assert!(uploader.images().is_empty());
        assert!(!pipeline.is_busy());
    }

    #[tokio::test]
    async fn test_capture_failure_aborts_without_upload() {
        let uploader = Arc::new(RecordingUploader::default());
        let pipeline = Pipeline::new(config(), uploader.clone());
        let document = Arc::new(SyntheticDocument::new(100, 300, 100));
        let primitive = FakePrimitive::new(100, 100).failing_at(0);

        let err = tokio_test::assert_err!(pipeline.run(document, primitive).await);

        assert_eq!(err.kind(), Some(ErrorKind::PlatformCaptureFailed));
        assert!(uploader.images().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported_not_raised() {
        let uploader = Arc::new(RecordingUploader::failing());
        let pipeline = Pipeline::new(config(), uploader);
        let document = Arc::new(SyntheticDocument::new(50, 50, 100));

        let report =
            tokio_test::assert_ok!(pipeline.run(document, FakePrimitive::new(50, 100)).await);

        assert_eq!(report.tile_count, 1);
        assert!(matches!(report.upload, UploadOutcome::Failed(ref m) if m.contains("unreachable")));
    }

    #[tokio::test]
    async fn test_zero_area_page_skips_upload() {
        let uploader = Arc::new(RecordingUploader::default());
        let pipeline = Pipeline::new(config(), uploader.clone());
        let document = Arc::new(SyntheticDocument::new(800, 0, 600));

        let report = pipeline
            .run(document, FakePrimitive::new(800, 600))
            .await
            .expect("session");

        assert_eq!(report.tile_count, 1);
        assert_eq!(report.upload, UploadOutcome::Skipped);
        assert!(uploader.images().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_timeout_bounds_stalled_session() {
        let config = CaptureConfig::builder()
            .upload_endpoint("http://127.0.0.1:9/upload")
            .settle_delay(Duration::ZERO)
            .capture_timeout(Duration::from_millis(500))
            .build()
            .expect("config");
        let uploader = Arc::new(RecordingUploader::default());
        let pipeline = Pipeline::new(config, uploader.clone());
        let document = Arc::new(SyntheticDocument::new(100, 300, 100));

        let outcome = tokio::time::timeout(
            Duration::from_secs(60),
            pipeline.run(document, FakePrimitive::new(100, 100).stalling()),
        )
        .await
        .expect("session ends once the capture timeout fires");

        let err = outcome.unwrap_err();
        assert!(matches!(err, Error::PlatformCaptureFailed { index: 0, .. }));
        assert!(uploader.images().is_empty());
        assert!(!pipeline.is_busy());
    }

    /// Blocks every capture until released.
    struct GatedPrimitive {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CapturePrimitive for GatedPrimitive {
        async fn capture_visible(&self) -> Result<EncodedImage> {
            self.entered.notify_one();
            self.release.notified().await;
            FakePrimitive::new(10, 10).capture_visible().await
        }
    }

    #[tokio::test]
    async fn test_second_trigger_rejected_while_busy() {
        let uploader = Arc::new(RecordingUploader::default());
        let pipeline = Arc::new(Pipeline::new(config(), uploader.clone()));
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let first = {
            let pipeline = Arc::clone(&pipeline);
            let primitive = GatedPrimitive {
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            };
            tokio::spawn(async move {
                pipeline
                    .run(Arc::new(SyntheticDocument::new(10, 10, 10)), primitive)
                    .await
            })
        };

        entered.notified().await;
        assert!(pipeline.is_busy());

        let second = pipeline
            .run(
                Arc::new(SyntheticDocument::new(10, 10, 10)),
                FakePrimitive::new(10, 10),
            )
            .await;
        assert!(matches!(second, Err(Error::SessionInProgress)));

        release.notify_one();
        let report = first.await.expect("join").expect("first session");
        assert!(report.upload.is_delivered());
        assert_eq!(uploader.images().len(), 1);
        assert!(!pipeline.is_busy());
    }
}
