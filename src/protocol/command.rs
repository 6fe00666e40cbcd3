//! Command definitions organized by module.
//!
//! Commands follow `module.methodName` format.
//!
//! # Command Modules
//!
//! | Module | Commands |
//! |--------|----------|
//! | `document` | Measure, scroll |
//! | `tabs` | Visible-viewport capture |
//! | `page` | Page dump |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by module.
///
/// This enum wraps module-specific command enums for unified serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Document module commands.
    Document(DocumentCommand),
    /// Tabs module commands.
    Tabs(TabsCommand),
    /// Page module commands.
    Page(PageCommand),
}

impl Command {
    /// Returns the `module.methodName` string of this command.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Document(DocumentCommand::Measure) => "document.measure",
            Self::Document(DocumentCommand::ScrollTo { .. }) => "document.scrollTo",
            Self::Tabs(TabsCommand::CaptureVisible { .. }) => "tabs.captureVisible",
            Self::Page(PageCommand::Dump) => "page.dump",
        }
    }
}

// ============================================================================
// Document Commands
// ============================================================================

/// Document module commands, executed in the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum DocumentCommand {
    /// Report every document size source plus the viewport.
    ///
    /// Result: `DocumentMetrics` in camelCase.
    #[serde(rename = "document.measure")]
    Measure,

    /// Scroll the window to an absolute position.
    #[serde(rename = "document.scrollTo")]
    ScrollTo {
        /// Horizontal position in pixels.
        x: u32,
        /// Vertical position in pixels.
        y: u32,
    },
}

// ============================================================================
// Tabs Commands
// ============================================================================

/// Tabs module commands, executed by the extension background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum TabsCommand {
    /// Capture the visible viewport of the tab.
    ///
    /// Result: `{"dataUrl": "data:image/...;base64,..."}`.
    #[serde(rename = "tabs.captureVisible")]
    CaptureVisible {
        /// `png` or `jpeg`.
        format: String,
        /// JPEG quality (0-100).
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
    },
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page module commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Serialize the page contents.
    ///
    /// Result: a `PageDump`.
    #[serde(rename = "page.dump")]
    Dump,
}

// ============================================================================
// Tests
// ============================================================================
