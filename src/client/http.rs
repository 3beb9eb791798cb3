//! reqwest-backed transport
//!
//! Every request carries the configured authentication headers and the
//! per-request timeout. Transport failures (connection refused, timeouts)
//! are retried up to `max_retries` attempts; HTTP status codes never are.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::{Duration, Instant};

use crate::common::config::ApiConfig;
use crate::common::{join_url, Error, Result};

use super::protocol::{ApiRequest, ApiResponse, Method, RequestBody};
use super::Transport;

/// HTTP transport for the platform under test
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpTransport {
    /// Build a transport pointed at `config.base_url`
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.authentication.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid value for header '{}': {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("automatos-harness/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout,
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Build a transport against the first reachable URL
    ///
    /// Probes the health endpoint on `base_url` and then each fallback URL.
    /// If nothing answers, `base_url` is kept so that every case records the
    /// connection failure instead of the run aborting.
    pub async fn resolve(config: &ApiConfig) -> Result<Self> {
        let mut transport = Self::new(config)?;

        let candidates = std::iter::once(&config.base_url).chain(config.fallback_urls.iter());
        for candidate in candidates {
            transport.base_url = candidate.trim_end_matches('/').to_string();
            match transport.probe(&config.health_path).await {
                Ok(status) if (200..300).contains(&status) => {
                    tracing::info!(url = %transport.base_url, "API reachable");
                    return Ok(transport);
                }
                Ok(status) => {
                    tracing::warn!(url = %candidate, status, "health probe returned non-success");
                }
                Err(e) => {
                    tracing::warn!(url = %candidate, error = %e, "health probe failed");
                }
            }
        }

        tracing::warn!(
            url = %config.base_url,
            "no API URL answered the health probe, continuing with the primary URL"
        );
        transport.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(transport)
    }

    /// Single-attempt health probe; returns the HTTP status
    pub async fn probe(&self, health_path: &str) -> Result<u16> {
        let url = join_url(&self.base_url, health_path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_error("GET", &url, e))?;
        Ok(response.status().as_u16())
    }

    fn map_error(&self, method: &str, url: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                method: method.to_string(),
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            Error::http(method, url, e)
        }
    }

    fn build(&self, request: &ApiRequest, url: &str) -> Result<reqwest::RequestBuilder> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart { fields, file } => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                if let Some(file) = file {
                    let part = reqwest::multipart::Part::text(file.content.clone())
                        .file_name(file.filename.clone())
                        .mime_str(&file.mime)
                        .map_err(|e| {
                            Error::Config(format!("Invalid mime type '{}': {}", file.mime, e))
                        })?;
                    form = form.part(file.field.clone(), part);
                }
                builder.multipart(form)
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = join_url(&self.base_url, &request.path);
        let method = request.method.as_str();
        let mut attempt = 1;

        loop {
            let start = Instant::now();
            let outcome = match self.build(request, &url)?.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    response
                        .text()
                        .await
                        .map(|text| {
                            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                            ApiResponse::from_text(status, &text, elapsed_ms)
                        })
                        .map_err(|e| self.map_error(method, &url, e))
                }
                Err(e) => Err(self.map_error(method, &url, e)),
            };

            match outcome {
                Ok(response) => {
                    tracing::debug!(
                        method,
                        url = %url,
                        status = response.status,
                        elapsed_ms = response.elapsed_ms,
                        "API call"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    tracing::debug!(method, url = %url, attempt, error = %e, "retrying request");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    tracing::debug!(method, url = %url, attempt, error = %e, "request failed");
                    return Err(e);
                }
            }
        }
    }
}
