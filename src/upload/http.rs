//! HTTP upload over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::CaptureConfig;
use crate::error::{Error, Result};

use super::Uploader;
use super::payload::{ImageUpload, PageDump};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for one upload request.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// HttpUploader
// ============================================================================

/// POSTs JSON bodies to fixed endpoints.
///
/// The JSON response is logged and returned; it is not otherwise interpreted.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    image_endpoint: Url,
    dump_endpoint: Url,
}

impl HttpUploader {
    /// Creates an uploader posting both images and dumps to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            dump_endpoint: endpoint.clone(),
            image_endpoint: endpoint,
        })
    }

    /// Creates an uploader for the configured image and dump endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        Ok(Self::new(config.upload_endpoint.clone())?
            .with_dump_endpoint(config.dump_endpoint.clone()))
    }

    /// Posts page dumps to a separate endpoint.
    #[must_use]
    pub fn with_dump_endpoint(mut self, endpoint: Url) -> Self {
        self.dump_endpoint = endpoint;
        self
    }

    /// Returns the image endpoint.
    #[inline]
    #[must_use]
    pub fn image_endpoint(&self) -> &Url {
        &self.image_endpoint
    }

    /// Returns the dump endpoint.
    #[inline]
    #[must_use]
    pub fn dump_endpoint(&self) -> &Url {
        &self.dump_endpoint
    }

    /// Posts `body` as JSON and parses the JSON response.
    async fn post_json<T: Serialize + ?Sized + Sync>(&self, url: &Url, body: &T) -> Result<Value> {
        debug!(endpoint = %url, "Posting upload");

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upload_failed(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upload_failed(format!(
                "{url} responded with {status}"
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::upload_failed(format!("invalid JSON response from {url}: {e}")))?;

        info!(endpoint = %url, response = %value, "Upload succeeded");
        Ok(value)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload_image(&self, data_url: &str) -> Result<Value> {
        self.post_json(&self.image_endpoint, &ImageUpload { image: data_url })
            .await
    }

    async fn upload_dump(&self, dump: &PageDump) -> Result<Value> {
        self.post_json(&self.dump_endpoint, dump).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use serde_json::json;
    use tiny_http::{Header, Response, Server};
    use tokio::sync::oneshot;

    use crate::error::ErrorKind;

    /// Received request: (method, path, content type, body).
    type Received = (String, String, Option<String>, String);

    /// Serves exactly one request with `status` and `body`, reporting what it got.
    fn serve_once(status: u16, body: &'static str) -> (Url, oneshot::Receiver<Received>) {
        let server = Server::http("127.0.0.1:0").expect("bind test server");
        let addr = server.server_addr().to_ip().expect("ip listener");
        let (tx, rx) = oneshot::channel();

        thread::spawn(move || {
            if let Ok(mut request) = server.recv() {
                let content_type = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Content-Type"))
                    .map(|h| h.value.to_string());
                let mut received = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut received)
                    .expect("read body");
                let _ = tx.send((
                    request.method().to_string(),
                    request.url().to_string(),
                    content_type,
                    received,
                ));

                let header: Header = "Content-Type: application/json".parse().expect("header");
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        let url = Url::parse(&format!("http://{addr}/upload")).expect("url");
        (url, rx)
    }

    #[tokio::test]
    async fn test_upload_image_posts_json() -> anyhow::Result<()> {
        let (url, received) = serve_once(200, r#"{"id": 42}"#);
        let uploader = HttpUploader::new(url)?;

        let response = uploader.upload_image("data:image/png;base64,AA==").await?;
        assert_eq!(response, json!({ "id": 42 }));

        let (method, path, content_type, body) = received.await?;
        assert_eq!(method, "POST");
        assert_eq!(path, "/upload");
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let body: Value = serde_json::from_str(&body)?;
        assert_eq!(body, json!({ "image": "data:image/png;base64,AA==" }));
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_server_error_is_upload_failed() {
        let (url, _received) = serve_once(500, r#"{"error": "boom"}"#);
        let uploader = HttpUploader::new(url).expect("uploader");

        let err = uploader.upload_image("data:,").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UploadFailed));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_upload_non_json_response_is_upload_failed() {
        let (url, _received) = serve_once(200, "not json");
        let uploader = HttpUploader::new(url).expect("uploader");

        let err = uploader.upload_image("data:,").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UploadFailed));
    }

    #[tokio::test]
    async fn test_upload_dump_uses_dump_endpoint() {
        let (url, received) = serve_once(200, r#"{"ok": true}"#);
        let image_url = Url::parse("http://127.0.0.1:9/unused").expect("url");
        let uploader = HttpUploader::new(image_url)
            .expect("uploader")
            .with_dump_endpoint(url);

        let dump = PageDump {
            html: "<html></html>".into(),
            ..Default::default()
        };
        uploader.upload_dump(&dump).await.expect("upload");

        let (_, _, _, body) = received.await.expect("request");
        let body: Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(body["html"], "<html></html>");
        assert!(body["variables"]["localStorage"].is_array());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upload_failed() {
        let server = Server::http("127.0.0.1:0").expect("bind");
        let addr = server.server_addr().to_ip().expect("ip listener");
        drop(server);

        let url = Url::parse(&format!("http://{addr}/upload")).expect("url");
        let err = HttpUploader::new(url)
            .expect("uploader")
            .upload_image("data:,")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UploadFailed));
    }

    #[test]
    fn test_from_config_endpoints() {
        let config = CaptureConfig::builder()
            .upload_endpoint("https://uploads.example.com/upload")
            .dump_endpoint("https://uploads.example.com/receive-dump")
            .build()
            .expect("config");

        let uploader = HttpUploader::from_config(&config).expect("uploader");
        assert_eq!(uploader.image_endpoint().path(), "/upload");
        assert_eq!(uploader.dump_endpoint().path(), "/receive-dump");
    }
}
