//! Automatos AI API test harness
//!
//! This library runs black-box test suites against the platform's HTTP
//! API and produces machine- and human-readable reports.

pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod report;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{TestRunResult, TestSuite};
