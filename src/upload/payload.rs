//! Upload request bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// ImageUpload
// ============================================================================

/// Body of the composite upload: `{"image": "<data URL>"}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImageUpload<'a> {
    /// The composite as a base64 `data:` URL.
    pub image: &'a str,
}

// ============================================================================
// PageDump
// ============================================================================

/// Serialized page contents produced by the extension's page dumper.
///
/// Entry shapes inside the arrays are decided by the dumper and forwarded
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageDump {
    /// `document.documentElement.outerHTML`.
    pub html: String,
    /// Script entries.
    pub scripts: Vec<Value>,
    /// Stylesheet entries.
    pub stylesheets: Vec<Value>,
    /// Names of globals and storage keys.
    pub variables: PageVariables,
    /// Image entries.
    pub images: Vec<Value>,
    /// Link entries.
    pub links: Vec<Value>,
    /// Everything else the dumper reports (url, title, cookies, metadata).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Key listings of the page's global scope and web storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageVariables {
    /// `Object.keys(window)`.
    pub global: Vec<String>,
    /// `Object.keys(localStorage)`.
    pub local_storage: Vec<String>,
    /// `Object.keys(sessionStorage)`.
    pub session_storage: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_image_upload_body() {
        let body = ImageUpload {
            image: "data:image/png;base64,AA==",
        };
        let json = serde_json::to_value(body).expect("serialize");
        assert_eq!(json, json!({ "image": "data:image/png;base64,AA==" }));
    }

    #[test]
    fn test_page_dump_wire_shape() {
        let json = json!({
            "html": "<html></html>",
            "scripts": [{ "src": "app.js", "type": "", "content": "" }],
            "stylesheets": [],
            "variables": {
                "global": ["app"],
                "localStorage": ["token"],
                "sessionStorage": []
            },
            "images": [],
            "links": [{ "href": "/about", "text": "About" }]
        });

        let dump: PageDump = serde_json::from_value(json.clone()).expect("parse");
        assert_eq!(dump.variables.local_storage, vec!["token".to_string()]);
        assert_eq!(dump.links.len(), 1);
        assert_eq!(serde_json::to_value(&dump).expect("serialize"), json);
    }

    #[test]
    fn test_page_dump_missing_fields_default() {
        let dump: PageDump = serde_json::from_str(r#"{"html": "<p>"}"#).expect("parse");
        assert_eq!(dump.html, "<p>");
        assert!(dump.scripts.is_empty());
        assert!(dump.variables.global.is_empty());
    }

    #[test]
    fn test_page_dump_keeps_metadata() {
        let json = json!({
            "url": "https://example.com/",
            "title": "Example",
            "html": "<html></html>",
            "cookies": [{ "name": "sid", "value": "1" }]
        });

        let dump: PageDump = serde_json::from_value(json).expect("parse");
        assert_eq!(dump.metadata["title"], "Example");
        assert!(!dump.metadata.contains_key("html"));

        let back = serde_json::to_value(&dump).expect("serialize");
        assert_eq!(back["url"], "https://example.com/");
        assert_eq!(back["cookies"][0]["name"], "sid");
    }
}
