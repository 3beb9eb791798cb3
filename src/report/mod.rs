//! Report artifacts
//!
//! A finished `TestRunResult` is written as JSON, markdown, JUnit XML and
//! a standalone HTML page into the reports directory, named after the run id so that repeated
//! runs never overwrite each other.

pub mod html;
pub mod json;
pub mod junit;
pub mod markdown;

use std::path::{Path, PathBuf};

use crate::common::config::ReportFormat;
use crate::common::{Error, Result};
use crate::testing::TestRunResult;

/// File name of a run's artifact in the given format
pub fn file_name(format: ReportFormat, run_id: &str) -> String {
    match format {
        ReportFormat::Json => format!("test_report_{}.json", run_id),
        ReportFormat::Markdown => format!("test_report_{}.md", run_id),
        ReportFormat::Junit => format!("junit_results_{}.xml", run_id),
        ReportFormat::Html => format!("test_report_{}.html", run_id),
    }
}

/// Write one artifact per format into `dir`; returns the written paths
pub fn write_all(run: &TestRunResult, dir: &Path, formats: &[ReportFormat]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| Error::file_write(dir, e))?;

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = dir.join(file_name(*format, &run.run_id));
        match format {
            ReportFormat::Json => json::write(run, &path)?,
            ReportFormat::Markdown => write_text(&path, &markdown::render(run))?,
            ReportFormat::Junit => write_text(&path, &junit::render(run)?)?,
            ReportFormat::Html => write_text(&path, &html::render(run))?,
        }
        tracing::info!(path = %path.display(), "wrote report");
        written.push(path);
    }
    Ok(written)
}

/// Export one module's run as `<dir>/<module>.json`
pub fn export_module(run: &TestRunResult, dir: &Path, module: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", sanitize(module)));
    json::write(run, &path)?;
    tracing::info!(module, path = %path.display(), "exported module results");
    Ok(path)
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| Error::file_write(path, e))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::config::PerformanceConfig;
    use crate::testing::result::{CaseStatus, RunContext, SuiteResult, TestCaseResult};
    use crate::testing::TestLevel;
    use chrono::Utc;

    fn case(name: &str, path: &str, status: CaseStatus, error: Option<&str>) -> TestCaseResult {
        TestCaseResult {
            run_id: "20250101_120000_abcd1234".to_string(),
            suite: "documents".to_string(),
            name: name.to_string(),
            status,
            duration: 0.05,
            error_message: error.map(str::to_string),
            method: "GET".to_string(),
            path: path.to_string(),
            status_code: match status {
                CaseStatus::Passed => Some(200),
                CaseStatus::Failed => Some(500),
                CaseStatus::Skipped => None,
            },
            response_time_ms: match status {
                CaseStatus::Skipped => None,
                _ => Some(42.0),
            },
        }
    }

    /// One passed, one failed (HTTP 500), one skipped
    pub(crate) fn sample_run() -> TestRunResult {
        let suite = SuiteResult::new(
            "documents",
            TestLevel::Integration,
            Some("Document management".to_string()),
            70.0,
            0.2,
            vec![
                case("list documents", "/api/documents", CaseStatus::Passed, None),
                case(
                    "analytics overview",
                    "/api/documents/analytics/overview",
                    CaseStatus::Failed,
                    Some(
                        "Test assertion failed: GET /api/documents/analytics/overview: \
                         expected status 200, got HTTP 500 - {\"detail\":\"down\"}",
                    ),
                ),
                case(
                    "get document",
                    "/api/documents/${document_id}",
                    CaseStatus::Skipped,
                    Some("unresolved variable 'document_id'"),
                ),
            ],
        );
        TestRunResult::aggregate(
            RunContext {
                run_id: "20250101_120000_abcd1234".to_string(),
                environment: "dev".to_string(),
                filter: Some("documents".to_string()),
                level: None,
                base_url: "http://localhost:8000".to_string(),
                threshold: 70.0,
                started_at: Utc::now(),
            },
            vec![suite],
            &PerformanceConfig::default(),
        )
    }

    #[test]
    fn test_write_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();
        let written = write_all(
            &run,
            dir.path(),
            &[
                ReportFormat::Json,
                ReportFormat::Markdown,
                ReportFormat::Junit,
                ReportFormat::Html,
            ],
        )
        .unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "test_report_20250101_120000_abcd1234.json",
                "test_report_20250101_120000_abcd1234.md",
                "junit_results_20250101_120000_abcd1234.xml",
                "test_report_20250101_120000_abcd1234.html",
            ]
        );
        assert!(written.iter().all(|p| p.exists()));

        let html = std::fs::read_to_string(&written[3]).unwrap();
        assert!(html.contains("20250101_120000_abcd1234"));
        assert!(html.contains(r#"<section id="summary""#));
        assert!(html.contains(r#"<section id="suites">"#));
        assert!(html.contains(r#"<section id="failures">"#));
        assert!(html.contains("got HTTP 500"));
    }

    #[test]
    fn test_write_selected_formats_only() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_all(&sample_run(), dir.path(), &[ReportFormat::Markdown]).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_export_module() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_module(&sample_run(), &dir.path().join("export"), "documents").unwrap();
        assert_eq!(path, dir.path().join("export").join("documents.json"));
        assert!(path.exists());
        assert_eq!(sanitize("a/b c"), "a_b_c");
    }
}
