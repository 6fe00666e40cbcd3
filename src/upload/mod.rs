//! Upload collaborator.
//!
//! The composite leaves the crate through an [`Uploader`]. [`HttpUploader`]
//! POSTs `{"image": "<data URL>"}` as JSON; tests substitute recording fakes.
//! Uploads are never retried.

// ============================================================================
// Submodules
// ============================================================================

mod http;
mod payload;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::HttpUploader;
pub use payload::{ImageUpload, PageDump, PageVariables};

// ============================================================================
// Uploader
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Destination for finished composites and page dumps.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads a composite given as a `data:` URL. Returns the server's JSON reply.
    async fn upload_image(&self, data_url: &str) -> Result<Value>;

    /// Uploads a page dump. Returns the server's JSON reply.
    async fn upload_dump(&self, dump: &PageDump) -> Result<Value>;
}
