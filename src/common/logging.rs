//! Logging and tracing configuration
//!
//! Console output of the run itself (per-case lines, the summary) is
//! printed directly; tracing carries diagnostics. When a log directory is
//! configured, a full-detail copy of the diagnostics is written to
//! `harness.log` there for the downstream fix pipeline to pick up.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name of the log file inside the log directory
pub const LOG_FILE: &str = "harness.log";

/// Keeps the non-blocking file writer flushing until dropped
pub struct LogGuard {
    _file: Option<WorkerGuard>,
    pub log_file: Option<PathBuf>,
}

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies.
pub fn init_cli(verbose: bool, log_dir: Option<&Path>) -> LogGuard {
    let default_filter = if verbose {
        "harness=debug,warn"
    } else {
        "harness=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file_setup = log_dir.and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            Some((writer, guard, dir.join(LOG_FILE)))
        }
        Err(e) => {
            eprintln!("Warning: Could not create log directory {}: {}", dir.display(), e);
            None
        }
    });

    match file_setup {
        Some((writer, guard, path)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            // A second init (tests, embedding) is harmless
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init();

            LogGuard {
                _file: Some(guard),
                log_file: Some(path),
            }
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init();

            LogGuard {
                _file: None,
                log_file: None,
            }
        }
    }
}
