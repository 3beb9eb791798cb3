//! CLI command definitions
//!
//! Defines the clap commands for the test harness.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::Environment;
use crate::testing::TestLevel;

/// Options accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (default: ./harness.yaml, then the user config dir)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Target environment (falls back to TEST_ENVIRONMENT, then dev)
    #[arg(long, short, value_enum, global = true)]
    pub environment: Option<Environment>,

    /// Verbose output and debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run test suites against the API
    Run(RunArgs),

    /// List discovered test suites
    #[command(alias = "ls")]
    List {
        /// Only list suites of this level
        #[arg(long, value_enum)]
        level: Option<TestLevel>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve the API URL and report its health
    Check,

    /// List endpoints from the OpenAPI document and compare with expectations
    Discover {
        /// Only validate this expected_endpoints category
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Only run suites whose name contains this text
    #[arg(long, short)]
    pub filter: Option<String>,

    /// Only run suites of this level
    #[arg(long, short, value_enum)]
    pub level: Option<TestLevel>,

    /// Write report files to the reports directory
    #[arg(long)]
    pub reports: bool,

    /// Run suites concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Run the configured module sequence, exporting each module's results
    #[arg(long)]
    pub module_sequence: bool,

    /// Also write the JSON report to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Directory for per-module exports (default: reports.export_dir or <reports>/modules)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}
