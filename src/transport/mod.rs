//! WebSocket link to the browser extension.
//!
//! The host listens; the extension dials in, announces itself with READY,
//! and then answers commands and reports user actions as events.
//!
//! ```text
//!  host                                   extension (background script)
//!  PendingServer::bind ── listening
//!                       ◄──── dial ws://127.0.0.1:8765
//!  PendingServer::accept ◄─── READY {tabId, sessionId}
//!  Connection::send ─────────► {id, tabId, method, params}
//!                       ◄──── {id, type: success|error, ...}
//!  EventHandler         ◄──── {type: event, method, params}
//! ```
//!
//! A dropped extension is picked up again by calling
//! [`PendingServer::accept`] once more.

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// WebSocket server the extension connects to.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, EventHandler, ReadyData};
pub use server::PendingServer;
