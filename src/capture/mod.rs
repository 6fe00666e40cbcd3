//! Capture Controller: page measurement and the scroll/capture loop.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dimensions` | Page, viewport and raw document metrics |
//! | `document` | [`Document`] and [`CapturePrimitive`] capabilities |
//! | `settle` | Wait strategies between scroll and capture |
//! | `session` | Per-session state and result |
//! | `controller` | The scroll/capture loop |
//!
//! # Example
//!
//! ```ignore
//! let controller = CaptureController::new(tab.clone(), tab)
//!     .with_settle(FixedDelay::new(Duration::from_millis(250)));
//!
//! let result = controller.capture_full_page().await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod controller;
mod dimensions;
mod document;
mod session;
mod settle;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::CaptureController;
pub use dimensions::{DocumentMetrics, MAX_CANVAS_PIXELS, PageDimensions, Viewport};
pub use document::{CapturePrimitive, Document};
pub use session::{CaptureResult, CaptureSession};
pub use settle::{DEFAULT_SETTLE_DELAY, FixedDelay, Immediate, SettleStrategy};
