//! Error types for the test harness
//!
//! Only configuration and suite-definition errors abort a run. HTTP and
//! assertion errors are captured per test case and end up in the report.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file '{path}': {message}")]
    ConfigParse { path: String, message: String },

    #[error("Unknown environment '{0}'. Supported environments: dev, staging, prod")]
    UnknownEnvironment(String),

    // === Suite Errors ===
    #[error("Invalid test suite '{path}': {message}")]
    SuiteParse { path: String, message: String },

    #[error("Suites directory '{0}' not found")]
    SuitesDirMissing(String),

    #[error("Fixture '{0}' not found in test_data")]
    FixtureNotFound(String),

    #[error("Unresolved variable '{0}'")]
    UnresolvedVariable(String),

    // === HTTP Errors ===
    #[error("Request {method} {url} failed: {message}")]
    Http {
        method: String,
        url: String,
        message: String,
    },

    #[error("Request {method} {url} timed out after {secs} seconds")]
    Timeout { method: String, url: String, secs: u64 },

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Report rendering failed: {0}")]
    Report(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an HTTP transport error
    pub fn http(method: &str, url: &str, message: impl ToString) -> Self {
        Self::Http {
            method: method.to_string(),
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a file write error
    pub fn file_write(path: &std::path::Path, error: impl ToString) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_mentions_request_line() {
        let err = Error::http("GET", "http://localhost:8000/health", "connection refused");
        let message = err.to_string();
        assert!(message.contains("GET http://localhost:8000/health"));
        assert!(message.contains("connection refused"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_assertion_is_not_transient() {
        assert!(!Error::TestAssertion("boom".to_string()).is_transient());
    }
}
