//! API Test Runner
//!
//! Loads declarative YAML suites, runs their cases against the platform
//! through a `Transport`, and folds the outcomes into a `TestRunResult`
//! that the report writers consume.

pub mod assertions;
pub mod discovery;
pub mod result;
mod runner;
pub mod suite;
pub mod vars;

pub use result::{CaseStatus, RunStatus, SuiteResult, TestCaseResult, TestRunResult};
pub use runner::{
    print_summary, validate_fixtures, Dispatcher, ModuleRun, ModuleSequenceResult, RunOptions,
};
pub use suite::{discover, select, TestLevel, TestSuite};
