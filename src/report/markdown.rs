//! Markdown summary report

use std::fmt::Write;

use crate::testing::result::{RunStatus, TestRunResult};

pub fn render(run: &TestRunResult) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, run);
    out
}

fn write_report(out: &mut String, run: &TestRunResult) -> std::fmt::Result {
    let headline = match run.status {
        RunStatus::Passed => "✅ PASSED",
        RunStatus::Failed => "❌ FAILED",
    };

    writeln!(out, "# Automatos AI API Test Report")?;
    writeln!(out)?;
    writeln!(out, "**Status:** {}", headline)?;
    writeln!(out)?;
    writeln!(out, "- **Run ID:** `{}`", run.run_id)?;
    writeln!(out, "- **Environment:** {}", run.environment)?;
    writeln!(out, "- **API:** {}", run.base_url)?;
    if let Some(filter) = &run.filter {
        writeln!(out, "- **Filter:** {}", filter)?;
    }
    if let Some(level) = run.level {
        writeln!(out, "- **Level:** {}", level)?;
    }
    writeln!(out, "- **Started:** {}", run.started_at.to_rfc3339())?;
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|--------|-------|")?;
    writeln!(out, "| Total | {} |", run.total)?;
    writeln!(out, "| Passed | {} |", run.passed)?;
    writeln!(out, "| Failed | {} |", run.failed)?;
    writeln!(out, "| Skipped | {} |", run.skipped)?;
    writeln!(out, "| Success Rate | {:.1}% |", run.success_rate)?;
    writeln!(out, "| Threshold | {:.1}% |", run.threshold)?;
    writeln!(out, "| Duration | {:.2}s |", run.duration)?;
    writeln!(out)?;

    if !run.suites.is_empty() {
        writeln!(out, "## Suites")?;
        writeln!(out)?;
        writeln!(out, "| Suite | Level | Passed | Failed | Skipped | Success Rate | Status |")?;
        writeln!(out, "|-------|-------|--------|--------|---------|--------------|--------|")?;
        for suite in &run.suites {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {:.1}% | {} |",
                suite.name,
                suite.level,
                suite.passed,
                suite.failed,
                suite.skipped,
                suite.success_rate,
                if suite.passed_threshold { "✅" } else { "❌" }
            )?;
        }
        writeln!(out)?;
    }

    let failures: Vec<_> = run.suites.iter().flat_map(|suite| suite.failures()).collect();
    if !failures.is_empty() {
        writeln!(out, "## Failures")?;
        writeln!(out)?;
        for case in failures {
            writeln!(
                out,
                "- **{} / {}** (`{} {}`): {}",
                case.suite,
                case.name,
                case.method,
                case.path,
                case.error_message.as_deref().unwrap_or("no error message")
            )?;
        }
        writeln!(out)?;
    }

    let perf = &run.performance;
    if perf.total_requests > 0 {
        writeln!(out, "## Performance")?;
        writeln!(out)?;
        writeln!(out, "| Metric | Value |")?;
        writeln!(out, "|--------|-------|")?;
        writeln!(out, "| Requests | {} |", perf.total_requests)?;
        writeln!(out, "| Average | {:.2}ms |", perf.avg_response_time_ms)?;
        writeln!(out, "| Min | {:.2}ms |", perf.min_response_time_ms)?;
        writeln!(out, "| Max | {:.2}ms |", perf.max_response_time_ms)?;
        writeln!(out, "| Fast | {} |", perf.fast_responses)?;
        writeln!(out, "| Slow | {} |", perf.slow_responses)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_run;

    #[test]
    fn test_markdown_sections() {
        let md = render(&sample_run());
        assert!(md.contains("**Status:** ❌ FAILED"));
        assert!(md.contains("| Total | 3 |"));
        assert!(md.contains("| documents | integration | 1 | 1 | 1 | 33.3% | ❌ |"));
        assert!(md.contains("## Failures"));
        assert!(md.contains("`GET /api/documents/analytics/overview`"));
        assert!(md.contains("HTTP 500"));
        assert!(md.contains("## Performance"));
    }
}
