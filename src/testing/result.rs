//! Result model for a test run
//!
//! Results are built once and never mutated afterwards: case results are
//! collected into a suite result, suites into a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::config::PerformanceConfig;

use super::suite::TestLevel;

/// Outcome of a single case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

/// Outcome of a run against its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Result of one case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub run_id: String,
    pub suite: String,
    pub name: String,
    pub status: CaseStatus,
    /// Seconds
    pub duration: f64,
    pub error_message: Option<String>,
    pub method: String,
    pub path: String,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<f64>,
}

/// Result of one suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub level: TestLevel,
    pub description: Option<String>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub success_rate: f64,
    pub threshold: f64,
    pub passed_threshold: bool,
    /// Seconds
    pub duration: f64,
    pub cases: Vec<TestCaseResult>,
}

/// Response time statistics over every case that got an HTTP response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_requests: usize,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub fast_responses: usize,
    pub slow_responses: usize,
}

/// Aggregate result of one dispatcher invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunResult {
    pub run_id: String,
    pub environment: String,
    pub filter: Option<String>,
    pub level: Option<TestLevel>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub success_rate: f64,
    pub threshold: f64,
    /// Seconds
    pub duration: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: RunStatus,
    pub performance: PerformanceSummary,
    pub suites: Vec<SuiteResult>,
}

/// Percentage of passed cases; 0 for an empty run
pub fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

struct Counts {
    passed: usize,
    failed: usize,
    skipped: usize,
}

fn count<'a>(cases: impl Iterator<Item = &'a TestCaseResult>) -> Counts {
    let mut counts = Counts {
        passed: 0,
        failed: 0,
        skipped: 0,
    };
    for case in cases {
        match case.status {
            CaseStatus::Passed => counts.passed += 1,
            CaseStatus::Failed => counts.failed += 1,
            CaseStatus::Skipped => counts.skipped += 1,
        }
    }
    counts
}

impl SuiteResult {
    pub fn new(
        name: &str,
        level: TestLevel,
        description: Option<String>,
        threshold: f64,
        duration: f64,
        cases: Vec<TestCaseResult>,
    ) -> Self {
        let counts = count(cases.iter());
        let total = cases.len();
        let success_rate = success_rate(counts.passed, total);
        Self {
            name: name.to_string(),
            level,
            description,
            total,
            passed: counts.passed,
            failed: counts.failed,
            skipped: counts.skipped,
            success_rate,
            threshold,
            passed_threshold: total == 0 || success_rate >= threshold,
            duration,
            cases,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestCaseResult> {
        self.cases
            .iter()
            .filter(|case| case.status == CaseStatus::Failed)
    }
}

impl PerformanceSummary {
    pub fn from_cases<'a>(
        cases: impl Iterator<Item = &'a TestCaseResult>,
        config: &PerformanceConfig,
    ) -> Self {
        let times: Vec<f64> = cases.filter_map(|case| case.response_time_ms).collect();
        if times.is_empty() {
            return Self::default();
        }

        let sum: f64 = times.iter().sum();
        let round = |v: f64| (v * 100.0).round() / 100.0;
        Self {
            total_requests: times.len(),
            avg_response_time_ms: round(sum / times.len() as f64),
            min_response_time_ms: round(times.iter().cloned().fold(f64::INFINITY, f64::min)),
            max_response_time_ms: round(times.iter().cloned().fold(0.0, f64::max)),
            fast_responses: times
                .iter()
                .filter(|t| **t < config.excellent_response_time_ms)
                .count(),
            slow_responses: times
                .iter()
                .filter(|t| **t > config.acceptable_response_time_ms)
                .count(),
        }
    }
}

/// Everything needed to close a run besides its suites
pub struct RunContext {
    pub run_id: String,
    pub environment: String,
    pub filter: Option<String>,
    pub level: Option<TestLevel>,
    pub base_url: String,
    pub threshold: f64,
    pub started_at: DateTime<Utc>,
}

impl TestRunResult {
    /// Aggregate suite results into a run
    ///
    /// An empty run counts as passed: nothing was selected, nothing failed.
    pub fn aggregate(
        ctx: RunContext,
        suites: Vec<SuiteResult>,
        performance: &PerformanceConfig,
    ) -> Self {
        let completed_at = Utc::now();
        let counts = count(suites.iter().flat_map(|s| s.cases.iter()));
        let total = counts.passed + counts.failed + counts.skipped;
        let rate = success_rate(counts.passed, total);
        let status = if total == 0 || rate >= ctx.threshold {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        };
        let duration = (completed_at - ctx.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            run_id: ctx.run_id,
            environment: ctx.environment,
            filter: ctx.filter,
            level: ctx.level,
            base_url: ctx.base_url,
            total,
            passed: counts.passed,
            failed: counts.failed,
            skipped: counts.skipped,
            success_rate: rate,
            threshold: ctx.threshold,
            duration,
            started_at: ctx.started_at,
            completed_at,
            status,
            performance: PerformanceSummary::from_cases(
                suites.iter().flat_map(|s| s.cases.iter()),
                performance,
            ),
            suites,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    pub fn cases(&self) -> impl Iterator<Item = &TestCaseResult> {
        self.suites.iter().flat_map(|s| s.cases.iter())
    }
}

/// Unique id for one invocation: timestamp plus a random suffix
pub fn new_run_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(status: CaseStatus, response_time_ms: Option<f64>) -> TestCaseResult {
        TestCaseResult {
            run_id: "r".to_string(),
            suite: "s".to_string(),
            name: "c".to_string(),
            status,
            duration: 0.01,
            error_message: None,
            method: "GET".to_string(),
            path: "/health".to_string(),
            status_code: response_time_ms.map(|_| 200),
            response_time_ms,
        }
    }

    fn ctx(threshold: f64) -> RunContext {
        RunContext {
            run_id: "r".to_string(),
            environment: "dev".to_string(),
            filter: None,
            level: None,
            base_url: "http://mock".to_string(),
            threshold,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_success_rate_zero_total() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(3, 4), 75.0);
    }

    #[test]
    fn test_counts_add_up() {
        let suite = SuiteResult::new(
            "s",
            TestLevel::Integration,
            None,
            70.0,
            0.1,
            vec![
                case(CaseStatus::Passed, Some(10.0)),
                case(CaseStatus::Failed, Some(3000.0)),
                case(CaseStatus::Skipped, None),
                case(CaseStatus::Passed, Some(50.0)),
            ],
        );
        assert_eq!(suite.passed + suite.failed + suite.skipped, suite.total);
        assert_eq!(suite.success_rate, 50.0);
        assert!(!suite.passed_threshold);
        assert_eq!(suite.failures().count(), 1);

        let run = TestRunResult::aggregate(ctx(50.0), vec![suite], &PerformanceConfig::default());
        assert_eq!(run.total, 4);
        assert_eq!(run.passed + run.failed + run.skipped, run.total);
        assert!(run.is_passed());
        assert_eq!(run.performance.total_requests, 3);
        assert_eq!(run.performance.fast_responses, 2);
        assert_eq!(run.performance.slow_responses, 1);
        assert_eq!(run.performance.min_response_time_ms, 10.0);
        assert_eq!(run.performance.max_response_time_ms, 3000.0);
    }

    #[test]
    fn test_empty_run_passes() {
        let run = TestRunResult::aggregate(ctx(85.0), Vec::new(), &PerformanceConfig::default());
        assert_eq!(run.total, 0);
        assert_eq!(run.success_rate, 0.0);
        assert_eq!(run.status, RunStatus::Passed);
        assert_eq!(run.performance, PerformanceSummary::default());
    }

    #[test]
    fn test_below_threshold_fails() {
        let suite = SuiteResult::new(
            "s",
            TestLevel::Integration,
            None,
            85.0,
            0.0,
            vec![case(CaseStatus::Passed, None), case(CaseStatus::Failed, None)],
        );
        let run = TestRunResult::aggregate(ctx(85.0), vec![suite], &PerformanceConfig::default());
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let now = Utc::now();
        let a = new_run_id(now);
        let b = new_run_id(now);
        assert_ne!(a, b);
        assert!(a.starts_with(&now.format("%Y%m%d_").to_string()));
    }
}
