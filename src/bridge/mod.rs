//! Message passing between the page context and the privileged context.
//!
//! The two contexts run as separate tasks and share nothing. Each direction
//! is a typed [`channel`]:
//!
//! ```text
//! ┌────────────────────┐   ContentCommand::CaptureFullPage   ┌──────────────────┐
//! │ Privileged context │ ──────────────────────────────────► │ Page context     │
//! │                    │                                     │                  │
//! │ capture primitive  │ ◄────────────────────────────────── │ CaptureController│
//! │ compositor, upload │  PrivilegedCommand::CaptureVisible  │ (scroll loop)    │
//! └────────────────────┘                                     └──────────────────┘
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod channel;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Caller, Inbox, Responder, channel};

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tracing::debug;

use crate::capture::{CaptureController, CapturePrimitive, CaptureResult, Document, SettleStrategy};
use crate::error::Result;
use crate::tile::EncodedImage;

// ============================================================================
// Messages
// ============================================================================

/// Requests from the page context to the privileged context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegedCommand {
    /// Capture the currently visible viewport.
    CaptureVisible,
}

/// Requests from the privileged context to the page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCommand {
    /// Run the full scroll/capture loop and return every tile.
    CaptureFullPage,
}

/// Caller half held by the page context.
pub type PrivilegedCaller = Caller<PrivilegedCommand, EncodedImage>;

/// Caller half held by the privileged context.
pub type ContentCaller = Caller<ContentCommand, CaptureResult>;

// ============================================================================
// PrivilegedClient
// ============================================================================

/// Capture primitive that forwards to the privileged context.
///
/// This is what the page-context controller captures through.
#[derive(Clone)]
pub struct PrivilegedClient {
    caller: PrivilegedCaller,
}

impl PrivilegedClient {
    /// Wraps a caller half.
    #[inline]
    #[must_use]
    pub fn new(caller: PrivilegedCaller) -> Self {
        Self { caller }
    }
}

#[async_trait]
impl CapturePrimitive for PrivilegedClient {
    async fn capture_visible(&self) -> Result<EncodedImage> {
        self.caller.call(PrivilegedCommand::CaptureVisible).await
    }
}

// ============================================================================
// Page Context
// ============================================================================

/// Serves [`ContentCommand`]s until the privileged side hangs up.
pub async fn serve_content<D, C, S>(
    mut inbox: Inbox<ContentCommand, CaptureResult>,
    controller: CaptureController<D, C, S>,
) where
    D: Document,
    C: CapturePrimitive,
    S: SettleStrategy,
{
    while let Some((command, responder)) = inbox.recv().await {
        debug!(?command, "Page context received command");
        match command {
            ContentCommand::CaptureFullPage => {
                responder.respond(controller.capture_full_page().await);
            }
        }
    }

    debug!("Page context closed");
}

// ============================================================================
// Tests
// ============================================================================
