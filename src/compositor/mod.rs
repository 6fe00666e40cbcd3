//! Compositor: decodes tiles and stitches them into one full-page image.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `format` | Output formats and canvas encoding |
//! | `stitch` | [`Compositor`], [`Composite`] and [`Placement`] |

// ============================================================================
// Submodules
// ============================================================================

mod format;
mod stitch;

// ============================================================================
// Re-exports
// ============================================================================

pub use format::{DEFAULT_JPEG_QUALITY, ImageFormat};
pub use stitch::{Composite, Compositor, Placement};
