//! Command requests and their replies.
//!
//! Every [`Request`] names one tab. The extension answers each with exactly
//! one [`Response`] carrying the same `id`; the READY handshake is the only
//! response without a request.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, TabId};

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command addressed to one tab.
///
/// ```json
/// { "id": "uuid", "tabId": 1, "method": "document.scrollTo", "params": { "x": 0, "y": 800 } }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Correlation ID echoed by the response.
    pub id: RequestId,

    /// Tab the command runs in.
    #[serde(rename = "tabId")]
    pub tab_id: TabId,

    /// Method and params, flattened into the message.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a request with a fresh correlation ID.
    #[inline]
    #[must_use]
    pub fn new(tab_id: TabId, command: Command) -> Self {
        Self {
            id: RequestId::generate(),
            tab_id,
            command,
        }
    }

    /// Returns the `module.methodName` this request invokes.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &'static str {
        self.command.method()
    }
}

// ============================================================================
// Response
// ============================================================================

/// The extension's reply to a [`Request`].
///
/// ```json
/// { "id": "uuid", "type": "success", "result": { "dataUrl": "data:image/png;base64,..." } }
/// { "id": "uuid", "type": "error", "error": "capture-failed", "message": "Tab is not visible" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// ID of the request being answered.
    pub id: RequestId,

    /// Outcome.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Payload of a success.
    #[serde(default)]
    pub result: Option<Value>,

    /// Short error code of a failure.
    #[serde(default)]
    pub error: Option<String>,

    /// Human-readable failure detail.
    #[serde(default)]
    pub message: Option<String>,
}

impl Response {
    /// Returns `true` if the command succeeded.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Returns the payload of a success. A success without payload is `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] carrying the extension's error code and
    /// message if the command failed.
    pub fn into_result(self) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Error => Err(Error::protocol(match (self.error, self.message) {
                (Some(code), Some(message)) => format!("{code}: {message}"),
                (Some(detail), None) | (None, Some(detail)) => detail,
                (None, None) => "extension reported an unspecified error".to_string(),
            })),
        }
    }

    /// Deserializes the payload of a success into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the command failed, or [`Error::Json`]
    /// if the payload does not have the shape of `T`.
    pub fn parse_result<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_result()?;
        Ok(serde_json::from_value(value)?)
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response outcome discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// The command ran.
    Success,
    /// The command failed in the extension.
    Error,
}

// ============================================================================
// Tests
// ============================================================================
