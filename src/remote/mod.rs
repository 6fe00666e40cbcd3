//! Remote browser binding.
//!
//! The bundled extension (see `extension/`) connects to the host over
//! WebSocket and executes commands in the page. This module turns that
//! connection into the capabilities the capture pipeline needs.
//!
//! | Type | Role |
//! |------|------|
//! | [`RemoteTab`] | `Document` + `CapturePrimitive` for one tab |
//! | [`Host`] | Event loop mapping extension events to sessions |

// ============================================================================
// Submodules
// ============================================================================

mod host;
mod tab;

// ============================================================================
// Re-exports
// ============================================================================

pub use host::Host;
pub use tab::RemoteTab;
