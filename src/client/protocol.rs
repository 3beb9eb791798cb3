//! Request/response types exchanged with the platform under test
//!
//! Bodies are kept as `serde_json::Value` because the harness makes no
//! assumptions about the remote data model beyond what a case asserts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// HTTP methods a test case may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Parse a method name as found in OpenAPI documents (any case)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file part of a multipart upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilePart {
    /// Form field name (default: "file")
    #[serde(default = "default_file_field")]
    pub field: String,
    pub filename: String,
    pub content: String,
    #[serde(default = "default_mime")]
    pub mime: String,
}

fn default_file_field() -> String {
    "file".to_string()
}

fn default_mime() -> String {
    "text/plain".to_string()
}

/// Request payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart {
        fields: BTreeMap<String, String>,
        file: Option<FilePart>,
    },
}

/// A request against the platform, relative to the active base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// "GET /api/agents" form used in messages and reports
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A response as seen by assertions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `{}` when empty, `{"raw_response": text}` when not JSON
    pub body: Value,
    pub elapsed_ms: f64,
}

impl ApiResponse {
    /// Build from raw body text, tolerating non-JSON payloads
    pub fn from_text(status: u16, text: &str, elapsed_ms: f64) -> Self {
        let body = if text.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(text)
                .unwrap_or_else(|_| serde_json::json!({ "raw_response": text }))
        };
        Self {
            status,
            body,
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
