//! Wire messages exchanged with the capture extension.
//!
//! Three shapes travel over the socket, all JSON text frames:
//!
//! - [`Request`]: host to extension, `{id, tabId, method, params}`
//! - [`Response`]: extension to host, `{id, type: "success" | "error", ...}`
//! - [`Event`]: extension to host, `{id, type: "event", method, params}`
//!
//! Methods are named `module.methodName` (`document.measure`,
//! `tabs.captureVisible`, `page.dump`, `action.clicked`). The first frame on
//! every connection is a READY response with the nil UUID and
//! `{tabId, sessionId}`.

// ============================================================================
// Submodules
// ============================================================================

/// Commands the host can run.
pub mod command;

/// User actions reported by the extension.
pub mod event;

/// Requests and responses.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, DocumentCommand, PageCommand, TabsCommand};
pub use event::{Event, ParsedEvent};
pub use request::{Request, Response, ResponseType};
