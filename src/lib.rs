//! Page Capture - Full-page browser screenshots.
//!
//! This library captures an entire web page, not just the visible part, by
//! scrolling through it one viewport at a time, stitching the viewport
//! captures into a single image, and uploading the result.
//!
//! # Architecture
//!
//! A capture session spans two contexts that share nothing and talk over a
//! typed request/response [`bridge`]:
//!
//! - **Page context**: [`CaptureController`] measures the document, scrolls,
//!   waits for the page to settle, and asks for each viewport capture
//! - **Privileged context**: [`Pipeline`] serves those capture requests with
//!   the platform [`CapturePrimitive`], then stitches with the [`Compositor`]
//!   and uploads through an [`Uploader`]
//!
//! The browser itself is driven by a small WebExtension (see `extension/`)
//! that connects to the [`Host`] over WebSocket. Clicking the toolbar
//! button starts a session for the active tab.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use page_capture::{CaptureConfig, Host, HttpUploader, Pipeline, Result};
//! use page_capture::transport::PendingServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = CaptureConfig::builder()
//!         .upload_endpoint("http://localhost:8888/upload")
//!         .build()?;
//!
//!     let uploader = HttpUploader::from_config(&config)?;
//!     let server = PendingServer::bind(config.bind_ip, config.port).await?;
//!     let pipeline = Arc::new(Pipeline::new(config, Arc::new(uploader)));
//!
//!     // Runs a session per toolbar click until the listener fails
//!     Host::new(pipeline).serve(server).await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capture`] | Scroll/capture loop and the capabilities it needs |
//! | [`compositor`] | Tile stitching and image encoding |
//! | [`upload`] | Upload collaborator and request bodies |
//! | [`pipeline`] | Session orchestration |
//! | [`bridge`] | Message passing between the two contexts |
//! | [`remote`] | Extension-backed tab and event host |
//! | [`config`] | Validated configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | WebSocket message types (internal) |
//! | [`transport`] | WebSocket transport layer (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Message passing between the page and privileged contexts.
pub mod bridge;

/// Scroll/capture loop.
///
/// - [`CaptureController`] - Drives one session over a [`Document`]
/// - [`SettleStrategy`] - Pause between scroll and capture
pub mod capture;

/// Tile stitching and image encoding.
pub mod compositor;

/// Capture configuration.
///
/// Use [`CaptureConfig::builder()`] to create a validated configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Session orchestration.
pub mod pipeline;

/// WebSocket protocol message types.
///
/// Internal module defining command/response/event structures.
pub mod protocol;

/// Extension-backed browser binding.
pub mod remote;

/// Encoded images and tiles.
pub mod tile;

/// WebSocket transport layer.
///
/// Internal module handling WebSocket server and connection management.
pub mod transport;

/// Upload collaborator.
pub mod upload;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Capture types
pub use capture::{
    CaptureController, CapturePrimitive, CaptureResult, Document, DocumentMetrics, FixedDelay,
    Immediate, PageDimensions, SettleStrategy, Viewport,
};

// Compositor types
pub use compositor::{Composite, Compositor, ImageFormat, Placement};

// Configuration
pub use config::{CaptureConfig, CaptureConfigBuilder};

// Error types
pub use error::{Error, ErrorKind, Result};

// Identifier types
pub use identifiers::{RequestId, SessionId, TabId};

// Pipeline types
pub use pipeline::{Pipeline, SessionReport, UploadOutcome};

// Remote binding
pub use remote::{Host, RemoteTab};

// Tile types
pub use tile::{EncodedImage, Tile};

// Upload types
pub use upload::{HttpUploader, PageDump, Uploader};
