//! Wire types shared with the inspector UI
//!
//! Everything here is produced fresh per decode call and handed back by value.

use serde::{Deserialize, Serialize};

use crate::body::headers::HeaderSet;

/// Parsed `Content-Type` header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeInfo {
    /// Lowercased primary type (e.g. `text/html`)
    pub mime_type: Option<String>,
    /// Lowercased `charset` parameter, quotes stripped
    pub charset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Empty,
    Text,
    Binary,
}

/// What the UI should show for a captured body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DisplayResult {
    pub kind: BodyKind,
    /// Logical body size: `Content-Length`, or the decoded payload length
    pub size: u64,
    /// Resolved MIME type (override or header)
    pub content_type: Option<String>,
    /// Raw `Content-Encoding` header value
    pub content_encoding: Option<String>,
    /// Present exactly when `kind` is `text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Charset the text was decoded with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Set when fewer bytes were materialized than `size`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Format detected from magic bytes, for binary bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_type: Option<String>,
}

impl DisplayResult {
    pub fn empty(content_type: Option<String>, content_encoding: Option<String>) -> Self {
        Self {
            kind: BodyKind::Empty,
            size: 0,
            content_type,
            content_encoding,
            text: None,
            charset: None,
            truncated: false,
            warning: None,
            detected_type: None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == BodyKind::Text
    }

    pub fn is_binary(&self) -> bool {
        self.kind == BodyKind::Binary
    }

    /// Append a warning, keeping any already present.
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        self.warning = Some(match self.warning.take() {
            Some(existing) => format!("{}; {}", existing, warning),
            None => warning,
        });
    }
}

/// A captured response body as recorded by the traffic inspector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedBody {
    /// Base64 payload; absent when the response had no body
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub headers: HeaderSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_absent_fields() {
        let result = DisplayResult::empty(None, None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "empty");
        assert_eq!(json["size"], 0);
        assert!(json.get("text").is_none());
        assert!(json.get("truncated").is_none());
        assert!(json.get("warning").is_none());
    }

    #[test]
    fn warnings_are_merged() {
        let mut result = DisplayResult::empty(None, None);
        result.push_warning("first");
        result.push_warning("second");
        assert_eq!(result.warning.as_deref(), Some("first; second"));
    }

    #[test]
    fn captured_body_defaults() {
        let capture: CapturedBody = serde_json::from_str("{}").unwrap();
        assert_eq!(capture.body, None);
        assert!(capture.headers.is_empty());
    }
}
