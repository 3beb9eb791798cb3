//! OpenAPI endpoint discovery

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::client::{ApiRequest, Transport};
use crate::common::{Error, Result};

/// Operations listed under an OpenAPI path item
const METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// One `METHOD /path` operation; orders by path, then method
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Endpoint {
    pub path: String,
    pub method: String,
}

impl Endpoint {
    /// Parse "GET /api/agents"; a bare path means GET
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line.split_once(char::is_whitespace) {
            Some((method, path)) => Some(Self {
                method: method.to_uppercase(),
                path: path.trim().to_string(),
            }),
            None if line.starts_with('/') => Some(Self {
                method: "GET".to_string(),
                path: line.to_string(),
            }),
            None => None,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Comparison of one category's expected endpoints with what the API lists
#[derive(Debug, Clone, Serialize)]
pub struct EndpointValidation {
    pub category: String,
    pub expected_count: usize,
    pub discovered_count: usize,
    pub matching: Vec<Endpoint>,
    pub missing: Vec<Endpoint>,
}

impl EndpointValidation {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Fetch the OpenAPI document and list its operations, sorted
pub async fn discover_endpoints(
    transport: &dyn Transport,
    openapi_path: &str,
) -> Result<Vec<Endpoint>> {
    let response = transport.send(&ApiRequest::get(openapi_path)).await?;
    if !response.is_success() {
        return Err(Error::http(
            "GET",
            &crate::common::join_url(transport.base_url(), openapi_path),
            &format!("OpenAPI document unavailable (HTTP {})", response.status),
        ));
    }
    let endpoints = endpoints_from_openapi(&response.body);
    tracing::info!(count = endpoints.len(), "discovered endpoints");
    Ok(endpoints)
}

/// Every operation in an OpenAPI document's `paths`
pub fn endpoints_from_openapi(doc: &Value) -> Vec<Endpoint> {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut found = BTreeSet::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for method in METHODS {
            if item.contains_key(*method) {
                found.insert(Endpoint {
                    method: method.to_uppercase(),
                    path: path.clone(),
                });
            }
        }
    }
    found.into_iter().collect()
}

/// Compare a category's expected endpoints with the discovered set
pub fn validate(category: &str, expected: &[String], discovered: &[Endpoint]) -> EndpointValidation {
    let expected: Vec<Endpoint> = expected.iter().filter_map(|e| Endpoint::parse(e)).collect();
    let (matching, missing): (Vec<Endpoint>, Vec<Endpoint>) = expected
        .iter()
        .cloned()
        .partition(|endpoint| discovered.contains(endpoint));

    EndpointValidation {
        category: category.to_string(),
        expected_count: expected.len(),
        discovered_count: discovered.len(),
        matching,
        missing,
    }
}
