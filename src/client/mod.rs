//! HTTP access to the platform under test
//!
//! The runner only talks to the remote API through the `Transport` trait,
//! so suites can be exercised against a scripted backend in tests.

mod http;
pub mod protocol;

use async_trait::async_trait;

use crate::common::Result;

pub use http::HttpTransport;
pub use protocol::{ApiRequest, ApiResponse, FilePart, Method, RequestBody};

/// Something that can answer API requests
#[async_trait]
pub trait Transport: Send + Sync {
    /// Base URL requests are resolved against
    fn base_url(&self) -> &str;

    /// Perform one logical request (including any transport-level retries)
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for dispatcher tests

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::{ApiRequest, ApiResponse, Transport};
    use crate::common::{Error, Result};

    /// Answers by "METHOD /path"; unknown routes get 404
    #[derive(Default)]
    pub struct ScriptedTransport {
        routes: HashMap<String, (u16, Value)>,
        unreachable: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, line: &str, status: u16, body: Value) -> Self {
            self.routes.insert(line.to_string(), (status, body));
            self
        }

        /// Every request fails at the transport level
        pub fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        fn base_url(&self) -> &str {
            "http://mock"
        }

        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            let line = request.line();
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(line.clone());
            }
            if self.unreachable {
                return Err(Error::http(
                    request.method.as_str(),
                    &format!("http://mock{}", request.path),
                    "connection refused",
                ));
            }
            let (status, body) = self
                .routes
                .get(&line)
                .cloned()
                .unwrap_or((404, serde_json::json!({"detail": "Not Found"})));
            Ok(ApiResponse {
                status,
                body,
                elapsed_ms: 5.0,
            })
        }
    }
}
