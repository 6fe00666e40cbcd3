//! A browser tab driven over the extension connection.
//!
//! [`RemoteTab`] is both the [`Document`] the scroll loop measures and
//! scrolls, and the [`CapturePrimitive`] that grabs the visible viewport.
//!
//! # Example
//!
//! ```ignore
//! let (connection, ready) = server.accept().await?;
//! let tab = RemoteTab::new(connection, ready.tab_id.expect("active tab"));
//!
//! let report = pipeline.run(tab.clone(), tab).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use crate::capture::{CapturePrimitive, Document, DocumentMetrics, PageDimensions, Viewport};
use crate::compositor::ImageFormat;
use crate::error::Result;
use crate::identifiers::TabId;
use crate::protocol::{Command, DocumentCommand, PageCommand, Request, TabsCommand};
use crate::tile::EncodedImage;
use crate::transport::Connection;
use crate::upload::PageDump;

// ============================================================================
// RemoteTab
// ============================================================================

/// A handle to one tab in the connected browser.
#[derive(Clone)]
pub struct RemoteTab {
    connection: Connection,
    tab_id: TabId,
    tile_format: ImageFormat,
}

impl fmt::Debug for RemoteTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTab")
            .field("tab_id", &self.tab_id)
            .field("tile_format", &self.tile_format)
            .finish_non_exhaustive()
    }
}

impl RemoteTab {
    /// Creates a handle capturing PNG tiles.
    #[must_use]
    pub fn new(connection: Connection, tab_id: TabId) -> Self {
        Self {
            connection,
            tab_id,
            tile_format: ImageFormat::Png,
        }
    }

    /// Sets the format the browser encodes each viewport in.
    #[inline]
    #[must_use]
    pub fn with_tile_format(mut self, format: ImageFormat) -> Self {
        self.tile_format = format;
        self
    }

    /// Returns the tab ID.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }
}

// ============================================================================
// RemoteTab - Commands
// ============================================================================

impl RemoteTab {
    /// Reads every document size source in one round-trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the reply is malformed.
    pub async fn measure_metrics(&self) -> Result<DocumentMetrics> {
        let metrics: DocumentMetrics = self
            .call(Command::Document(DocumentCommand::Measure))
            .await?;
        debug!(tab_id = %self.tab_id, ?metrics, "Document measured");
        Ok(metrics)
    }

    /// Serializes the page contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the reply is malformed.
    pub async fn dump_page(&self) -> Result<PageDump> {
        let dump: PageDump = self.call(Command::Page(PageCommand::Dump)).await?;
        debug!(
            tab_id = %self.tab_id,
            html_len = dump.html.len(),
            scripts = dump.scripts.len(),
            "Page dumped"
        );
        Ok(dump)
    }

    /// Runs a command in this tab and decodes its result.
    async fn call<T: DeserializeOwned>(&self, command: Command) -> Result<T> {
        let request = Request::new(self.tab_id, command);
        self.connection.send(request).await?.parse_result()
    }
}

// ============================================================================
// Document
// ============================================================================

#[async_trait]
impl Document for RemoteTab {
    async fn measure_document(&self) -> Result<PageDimensions> {
        Ok(self.measure_metrics().await?.page_dimensions())
    }

    async fn viewport(&self) -> Result<Viewport> {
        Ok(self.measure_metrics().await?.viewport())
    }

    async fn scroll_to(&self, x: u32, y: u32) -> Result<()> {
        debug!(tab_id = %self.tab_id, x, y, "Scrolling to");

        let _: IgnoredAny = self
            .call(Command::Document(DocumentCommand::ScrollTo { x, y }))
            .await?;
        Ok(())
    }
}

// ============================================================================
// CapturePrimitive
// ============================================================================

/// Result of `tabs.captureVisible`.
#[derive(Deserialize)]
struct CapturedViewport {
    #[serde(rename = "dataUrl")]
    data_url: String,
}

#[async_trait]
impl CapturePrimitive for RemoteTab {
    async fn capture_visible(&self) -> Result<EncodedImage> {
        let command = Command::Tabs(TabsCommand::CaptureVisible {
            format: self.tile_format.format_str().to_string(),
            quality: self.tile_format.quality(),
        });

        let captured: CapturedViewport = self.call(command).await?;
        EncodedImage::from_data_url(&captured.data_url)
    }
}

// ============================================================================
// Tests
// ============================================================================
