//! JSON report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::common::{Error, Result};
use crate::testing::result::{PerformanceSummary, RunStatus, SuiteResult, TestRunResult};
use crate::testing::TestLevel;

/// Everything about a run except its suites
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub environment: &'a str,
    pub filter: Option<&'a str>,
    pub level: Option<TestLevel>,
    pub base_url: &'a str,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub success_rate: f64,
    pub threshold: f64,
    pub duration: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: RunStatus,
    pub performance: &'a PerformanceSummary,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata<'a> {
    pub generated_at: DateTime<Utc>,
    pub harness_version: &'static str,
    pub environment: &'a str,
}

/// Document written to `test_report_<run_id>.json`
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub run_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub summary: RunSummary<'a>,
    pub suites: &'a [SuiteResult],
    pub metadata: ReportMetadata<'a>,
}

impl<'a> JsonReport<'a> {
    pub fn new(run: &'a TestRunResult) -> Self {
        Self {
            run_id: &run.run_id,
            timestamp: run.started_at,
            summary: RunSummary {
                environment: &run.environment,
                filter: run.filter.as_deref(),
                level: run.level,
                base_url: &run.base_url,
                total: run.total,
                passed: run.passed,
                failed: run.failed,
                skipped: run.skipped,
                success_rate: round2(run.success_rate),
                threshold: run.threshold,
                duration: round2(run.duration),
                started_at: run.started_at,
                completed_at: run.completed_at,
                status: run.status,
                performance: &run.performance,
            },
            suites: &run.suites,
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                harness_version: env!("CARGO_PKG_VERSION"),
                environment: &run.environment,
            },
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn render(run: &TestRunResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport::new(run))?)
}

/// Write the JSON report to `path`, creating parent directories
pub fn write(run: &TestRunResult, path: &Path) -> Result<()> {
    let content = render(run)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::file_write(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| Error::file_write(path, e))
}
