//! Configuration and log locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/automatos-harness/`
//! - macOS: `~/Library/Application Support/automatos-harness/`
//! - Windows: `%APPDATA%\automatos-harness\`

use std::path::{Path, PathBuf};

/// Name used for the config and data directories
const APP_NAME: &str = "automatos-harness";

/// Config file looked up in the working directory before the platform path
const LOCAL_CONFIG: &str = "harness.yaml";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// A `harness.yaml` in the current directory wins over the platform file.
pub fn config_path() -> Option<PathBuf> {
    let local = Path::new(LOCAL_CONFIG);
    if local.exists() {
        return Some(local.to_path_buf());
    }
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}
