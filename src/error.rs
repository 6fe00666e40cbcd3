//! Error types for page capture.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use page_capture::{Result, Error};
//!
//! async fn example(pipeline: &Pipeline, tab: RemoteTab) -> Result<()> {
//!     let report = pipeline.run(tab.clone(), tab).await?;
//!     println!("{} tiles", report.tile_count);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Pipeline | [`Error::PlatformCaptureFailed`], [`Error::TileDecodeFailed`], [`Error::UploadFailed`] |
//! | Session | [`Error::SessionInProgress`], [`Error::EncodeFailed`] |
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// ErrorKind
// ============================================================================

/// Closed classification of capture pipeline failures.
///
/// Every pipeline stage fails with exactly one of these kinds.
/// Errors outside the pipeline (configuration, transport) have no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The privileged capture primitive failed or timed out.
    PlatformCaptureFailed,
    /// A tile could not be decoded into an image.
    TileDecodeFailed,
    /// The final upload request failed.
    UploadFailed,
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// Visible-viewport capture failed.
    ///
    /// Returned when the capture primitive rejects while collecting a tile.
    /// The session is aborted and collected tiles are dropped.
    #[error("Capture of tile {index} failed: {message}")]
    PlatformCaptureFailed {
        /// Sequence index of the tile being captured.
        index: usize,
        /// Description of the capture failure.
        message: String,
    },

    /// Tile decoding failed.
    ///
    /// Returned when a tile payload is malformed or in an unsupported format.
    #[error("Failed to decode tile {index}: {message}")]
    TileDecodeFailed {
        /// Sequence index of the tile.
        index: usize,
        /// Decoder error message.
        message: String,
    },

    /// Upload request failed.
    ///
    /// Returned by uploaders. The pipeline logs and reports it without
    /// failing the session.
    #[error("Upload failed: {message}")]
    UploadFailed {
        /// Description of the upload failure.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// A capture session is already running.
    #[error("A capture session is already in progress")]
    SessionInProgress,

    /// Composite encoding failed.
    #[error("Failed to encode composite: {message}")]
    EncodeFailed {
        /// Encoder error message.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when capture configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the extension.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection or bridge closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Command request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a platform capture failure for the tile at `index`.
    #[inline]
    pub fn capture_failed(index: usize, message: impl Into<String>) -> Self {
        Self::PlatformCaptureFailed {
            index,
            message: message.into(),
        }
    }

    /// Creates a tile decode failure for the tile at `index`.
    #[inline]
    pub fn decode_failed(index: usize, message: impl Into<String>) -> Self {
        Self::TileDecodeFailed {
            index,
            message: message.into(),
        }
    }

    /// Creates an upload failure.
    #[inline]
    pub fn upload_failed(message: impl Into<String>) -> Self {
        Self::UploadFailed {
            message: message.into(),
        }
    }

    /// Creates an encode failure.
    #[inline]
    pub fn encode_failed(message: impl Into<String>) -> Self {
        Self::EncodeFailed {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the pipeline failure kind, if this is a pipeline error.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::PlatformCaptureFailed { .. } => Some(ErrorKind::PlatformCaptureFailed),
            Self::TileDecodeFailed { .. } => Some(ErrorKind::TileDecodeFailed),
            Self::UploadFailed { .. } => Some(ErrorKind::UploadFailed),
            _ => None,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ChannelClosed(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind as IoErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::capture_failed(2, "tab not visible");
        assert_eq!(err.to_string(), "Capture of tile 2 failed: tab not visible");

        let err = Error::decode_failed(1, "bad magic");
        assert_eq!(err.to_string(), "Failed to decode tile 1: bad magic");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::capture_failed(0, "x").kind(),
            Some(ErrorKind::PlatformCaptureFailed)
        );
        assert_eq!(
            Error::decode_failed(0, "x").kind(),
            Some(ErrorKind::TileDecodeFailed)
        );
        assert_eq!(Error::upload_failed("x").kind(), Some(ErrorKind::UploadFailed));
        assert_eq!(Error::config("x").kind(), None);
        assert_eq!(Error::SessionInProgress.kind(), None);
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::request_timeout(RequestId::generate(), 5000);
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(Error::connection_timeout(30_000).is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::connection_timeout(1000).is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(IoErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
