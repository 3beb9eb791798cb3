//! Common utilities shared by the runner, client and reports

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use config::{Environment, HarnessConfig};
pub use error::{Error, Result};

/// Join a base URL and an endpoint path without doubling or dropping slashes
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
