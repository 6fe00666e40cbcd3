//! Capability traits at the page/privileged boundary.
//!
//! The controller never touches a browser directly. It sees the page through
//! [`Document`] and obtains pixels through [`CapturePrimitive`], so the scroll
//! loop runs unchanged against a remote tab, the in-process bridge, or a
//! synthetic document in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::tile::EncodedImage;

use super::dimensions::{PageDimensions, Viewport};

// ============================================================================
// Document
// ============================================================================

/// Live page state as seen from the page context.
#[async_trait]
pub trait Document: Send + Sync {
    /// Measures the full scrollable extent of the document.
    async fn measure_document(&self) -> Result<PageDimensions>;

    /// Returns the visible viewport size.
    async fn viewport(&self) -> Result<Viewport>;

    /// Scrolls the document to an absolute position.
    async fn scroll_to(&self, x: u32, y: u32) -> Result<()>;
}

#[async_trait]
impl<T: Document + ?Sized> Document for Arc<T> {
    async fn measure_document(&self) -> Result<PageDimensions> {
        (**self).measure_document().await
    }

    async fn viewport(&self) -> Result<Viewport> {
        (**self).viewport().await
    }

    async fn scroll_to(&self, x: u32, y: u32) -> Result<()> {
        (**self).scroll_to(x, y).await
    }
}

// ============================================================================
// CapturePrimitive
// ============================================================================

/// Privileged screen capture of the currently visible viewport.
#[async_trait]
pub trait CapturePrimitive: Send + Sync {
    /// Captures the visible viewport of the active tab.
    async fn capture_visible(&self) -> Result<EncodedImage>;
}

#[async_trait]
impl<T: CapturePrimitive + ?Sized> CapturePrimitive for Arc<T> {
    async fn capture_visible(&self) -> Result<EncodedImage> {
        (**self).capture_visible().await
    }
}
