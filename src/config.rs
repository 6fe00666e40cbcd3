//! Capture configuration.
//!
//! Provides a fluent builder with validation, mirroring how the rest of the
//! crate is configured.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use page_capture::{CaptureConfig, ImageFormat};
//!
//! # fn example() -> page_capture::Result<()> {
//! let config = CaptureConfig::builder()
//!     .upload_endpoint("https://uploads.example.com/upload")
//!     .settle_delay(Duration::from_millis(250))
//!     .format(ImageFormat::jpeg(85))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use url::Url;

use crate::capture::DEFAULT_SETTLE_DELAY;
use crate::compositor::ImageFormat;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default port the extension connects to.
pub const DEFAULT_PORT: u16 = 8765;

// ============================================================================
// CaptureConfig
// ============================================================================

/// Validated configuration for capture sessions and the extension host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Pause after each scroll before capturing.
    pub settle_delay: Duration,
    /// Bound on each capture round-trip. `None` waits indefinitely.
    pub capture_timeout: Option<Duration>,
    /// Format of the uploaded composite.
    pub format: ImageFormat,
    /// Endpoint receiving `{"image": ...}` uploads.
    pub upload_endpoint: Url,
    /// Endpoint receiving page dumps. Defaults to the upload endpoint.
    pub dump_endpoint: Url,
    /// Address the extension host binds to.
    pub bind_ip: IpAddr,
    /// Port the extension host binds to. `0` picks a random port.
    pub port: u16,
}

impl CaptureConfig {
    /// Creates a new configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::new()
    }
}

// ============================================================================
// CaptureConfigBuilder
// ============================================================================

/// Builder for [`CaptureConfig`].
#[derive(Debug, Default, Clone)]
pub struct CaptureConfigBuilder {
    settle_delay: Option<Duration>,
    capture_timeout: Option<Duration>,
    format: ImageFormat,
    upload_endpoint: Option<String>,
    dump_endpoint: Option<String>,
    bind_ip: Option<IpAddr>,
    port: Option<u16>,
}

impl CaptureConfigBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause between scroll and capture (default 100ms).
    #[inline]
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    /// Bounds each capture round-trip.
    #[inline]
    #[must_use]
    pub fn capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = Some(timeout);
        self
    }

    /// Sets the composite format (default PNG).
    #[inline]
    #[must_use]
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the upload endpoint. Required.
    #[inline]
    #[must_use]
    pub fn upload_endpoint(mut self, url: impl Into<String>) -> Self {
        self.upload_endpoint = Some(url.into());
        self
    }

    /// Sets a separate page-dump endpoint.
    #[inline]
    #[must_use]
    pub fn dump_endpoint(mut self, url: impl Into<String>) -> Self {
        self.dump_endpoint = Some(url.into());
        self
    }

    /// Sets the host bind address (default 127.0.0.1).
    #[inline]
    #[must_use]
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = Some(ip);
        self
    }

    /// Sets the host port (default 8765).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the upload endpoint is missing
    /// - [`Error::Config`] if an endpoint is not an absolute http(s) URL
    /// - [`Error::Config`] if the capture timeout is zero
    pub fn build(self) -> Result<CaptureConfig> {
        let upload_endpoint = self.validate_upload_endpoint()?;
        let dump_endpoint = match &self.dump_endpoint {
            Some(raw) => parse_endpoint(raw)?,
            None => upload_endpoint.clone(),
        };

        if self.capture_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("Capture timeout must be greater than zero"));
        }

        Ok(CaptureConfig {
            settle_delay: self.settle_delay.unwrap_or(DEFAULT_SETTLE_DELAY),
            capture_timeout: self.capture_timeout,
            format: self.format,
            upload_endpoint,
            dump_endpoint,
            bind_ip: self.bind_ip.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: self.port.unwrap_or(DEFAULT_PORT),
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl CaptureConfigBuilder {
    /// Validates the upload endpoint configuration.
    fn validate_upload_endpoint(&self) -> Result<Url> {
        let raw = self.upload_endpoint.as_deref().ok_or_else(|| {
            Error::config(
                "Upload endpoint is required. Use .upload_endpoint() to set it.\n\
                 Example: CaptureConfig::builder().upload_endpoint(\"https://example.com/upload\")",
            )
        })?;

        parse_endpoint(raw)
    }
}

/// Parses an absolute http(s) URL.
fn parse_endpoint(raw: &str) -> Result<Url> {
    let url =
        Url::parse(raw).map_err(|e| Error::config(format!("Invalid endpoint '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::config(format!(
            "Endpoint '{raw}' must use http or https, not {other}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
