//! Synthetic documents, fake capture primitives, uploaders and a fake
//! extension for tests.

use std::future::pending;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::capture::{CapturePrimitive, Document, PageDimensions, Viewport};
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::tile::EncodedImage;
use crate::upload::{PageDump, Uploader};

/// Distinct fill colors, one per capture call.
pub(crate) const PALETTE: [[u8; 4]; 4] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 0, 255],
];

/// Encodes a solid-color PNG.
pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
        .expect("encode png");
    buf
}

// ============================================================================
// SyntheticDocument
// ============================================================================

/// A static page of fixed size that records every scroll.
pub(crate) struct SyntheticDocument {
    dimensions: PageDimensions,
    viewport: Viewport,
    scrolls: Mutex<Vec<(u32, u32)>>,
}

impl SyntheticDocument {
    pub(crate) fn new(width: u32, height: u32, viewport_height: u32) -> Self {
        Self {
            dimensions: PageDimensions::new(width, height),
            viewport: Viewport::new(width, viewport_height),
            scrolls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn scrolls(&self) -> Vec<(u32, u32)> {
        self.scrolls.lock().clone()
    }
}

#[async_trait]
impl Document for SyntheticDocument {
    async fn measure_document(&self) -> Result<PageDimensions> {
        Ok(self.dimensions)
    }

    async fn viewport(&self) -> Result<Viewport> {
        Ok(self.viewport)
    }

    async fn scroll_to(&self, x: u32, y: u32) -> Result<()> {
        self.scrolls.lock().push((x, y));
        Ok(())
    }
}

// ============================================================================
// FakePrimitive
// ============================================================================

/// Returns solid PNG viewports, colored by call index from [`PALETTE`].
pub(crate) struct FakePrimitive {
    width: u32,
    height: u32,
    calls: AtomicUsize,
    fail_at: Option<usize>,
    garbage_at: Option<usize>,
    stall: bool,
}

impl FakePrimitive {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: AtomicUsize::new(0),
            fail_at: None,
            garbage_at: None,
            stall: false,
        }
    }

    /// A 1x1 primitive for tests that only count tiles.
    pub(crate) fn empty() -> Self {
        Self::new(1, 1)
    }

    /// Rejects the capture with the given call index.
    pub(crate) fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Returns undecodable bytes for the given call index.
    pub(crate) fn garbage_at(mut self, index: usize) -> Self {
        self.garbage_at = Some(index);
        self
    }

    /// Never resolves.
    pub(crate) fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapturePrimitive for FakePrimitive {
    async fn capture_visible(&self) -> Result<EncodedImage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.stall {
            pending::<()>().await;
        }
        if self.fail_at == Some(call) {
            return Err(Error::protocol("tab is not visible"));
        }
        if self.garbage_at == Some(call) {
            return Ok(EncodedImage::new("image/png", b"definitely not a png".to_vec()));
        }

        let color = PALETTE[call % PALETTE.len()];
        Ok(EncodedImage::new(
            "image/png",
            png_bytes(self.width, self.height, color),
        ))
    }
}

// ============================================================================
// RecordingUploader
// ============================================================================

/// Records every upload; optionally fails them all.
#[derive(Default)]
pub(crate) struct RecordingUploader {
    images: Mutex<Vec<String>>,
    dumps: Mutex<Vec<PageDump>>,
    fail: bool,
}

impl RecordingUploader {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn images(&self) -> Vec<String> {
        self.images.lock().clone()
    }

    pub(crate) fn dumps(&self) -> Vec<PageDump> {
        self.dumps.lock().clone()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload_image(&self, data_url: &str) -> Result<Value> {
        if self.fail {
            return Err(Error::upload_failed("server unreachable"));
        }
        self.images.lock().push(data_url.to_string());
        Ok(json!({ "status": "ok" }))
    }

    async fn upload_dump(&self, dump: &PageDump) -> Result<Value> {
        if self.fail {
            return Err(Error::upload_failed("server unreachable"));
        }
        self.dumps.lock().push(dump.clone());
        Ok(json!({ "status": "ok" }))
    }
}

// ============================================================================
// FakeExtension
// ============================================================================

/// WebSocket client standing in for the browser extension.
///
/// Sends READY on connect and answers every request through `respond`
/// with `Ok(result)` or `Err(message)`. Events queued with
/// [`FakeExtension::send_event`] are forwarded as they come.
pub(crate) struct FakeExtension {
    events_tx: mpsc::UnboundedSender<Value>,
    task: JoinHandle<()>,
}

impl FakeExtension {
    pub(crate) const SESSION_ID: u64 = 9;

    pub(crate) async fn connect<F>(url: &str, tab_id: u32, respond: F) -> Self
    where
        F: Fn(&str, &Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let (mut ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("connect to host");

        let ready = json!({
            "id": RequestId::ready(),
            "type": "success",
            "result": { "tabId": tab_id, "sessionId": Self::SESSION_ID },
        });
        ws.send(Message::Text(ready.to_string().into()))
            .await
            .expect("send READY");

        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Value>();

        let task = tokio::spawn(async move {
            loop {
                let outgoing = tokio::select! {
                    message = ws.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            let request: Value = serde_json::from_str(&text).expect("request json");
                            let method = request["method"].as_str().unwrap_or_default();
                            match respond(method, &request["params"]) {
                                Ok(result) => json!({
                                    "id": request["id"],
                                    "type": "success",
                                    "result": result,
                                }),
                                Err(message) => json!({
                                    "id": request["id"],
                                    "type": "error",
                                    "error": "command failed",
                                    "message": message,
                                }),
                            }
                        }
                        Some(Ok(_)) => continue,
                        _ => break,
                    },
                    event = events_rx.recv() => match event {
                        Some(event) => event,
                        None => {
                            let _ = ws.close(None).await;
                            break;
                        }
                    },
                };

                if ws.send(Message::Text(outgoing.to_string().into())).await.is_err() {
                    break;
                }
            }
        });

        Self { events_tx, task }
    }

    /// Queues an event such as `action.clicked`.
    pub(crate) fn send_event(&self, method: &str, params: Value) {
        let event = json!({
            "id": RequestId::generate(),
            "type": "event",
            "method": method,
            "params": params,
        });
        let _ = self.events_tx.send(event);
    }

    /// Closes the WebSocket and waits for the client task to finish.
    pub(crate) async fn close(self) {
        drop(self.events_tx);
        let _ = self.task.await;
    }
}
