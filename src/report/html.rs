//! Standalone HTML report
//!
//! One self-contained page: metric cards, a success bar against the
//! threshold, a per-suite table, every case row and the failures.

use std::fmt::Write;

use crate::testing::result::{CaseStatus, RunStatus, SuiteResult, TestRunResult};

pub fn render(run: &TestRunResult) -> String {
    let (status_text, status_class) = match run.status {
        RunStatus::Passed => ("PASSED", "passed"),
        RunStatus::Failed => ("FAILED", "failed"),
    };

    let mut suites_html = String::new();
    for suite in &run.suites {
        suites_html.push_str(&suite_row(suite));
    }

    let mut cases_html = String::new();
    for suite in &run.suites {
        cases_html.push_str(&suite_cases(suite));
    }

    let failures: Vec<_> = run.suites.iter().flat_map(|suite| suite.failures()).collect();
    let failures_html = if failures.is_empty() {
        String::new()
    } else {
        let mut items = String::new();
        for case in failures {
            let _ = write!(
                items,
                r#"
                <li>
                    <div class="failure-title">{} / {} <code>{} {}</code></div>
                    <div class="error-message">{}</div>
                </li>"#,
                html_escape(&case.suite),
                html_escape(&case.name),
                html_escape(&case.method),
                html_escape(&case.path),
                html_escape(case.error_message.as_deref().unwrap_or("no error message"))
            );
        }
        format!(
            r#"
        <section id="failures">
            <h2>Failures</h2>
            <ul class="failures">{items}
            </ul>
        </section>"#
        )
    };

    let perf = &run.performance;
    let performance_html = if perf.total_requests > 0 {
        format!(
            r#"
        <section id="performance">
            <h2>Performance</h2>
            <table>
                <tr><th>Requests</th><td>{}</td></tr>
                <tr><th>Average</th><td>{:.2}ms</td></tr>
                <tr><th>Min</th><td>{:.2}ms</td></tr>
                <tr><th>Max</th><td>{:.2}ms</td></tr>
                <tr><th>Fast</th><td>{}</td></tr>
                <tr><th>Slow</th><td>{}</td></tr>
            </table>
        </section>"#,
            perf.total_requests,
            perf.avg_response_time_ms,
            perf.min_response_time_ms,
            perf.max_response_time_ms,
            perf.fast_responses,
            perf.slow_responses
        )
    } else {
        String::new()
    };

    let filter = run
        .filter
        .as_deref()
        .map(|f| format!(" &middot; filter <code>{}</code>", html_escape(f)))
        .unwrap_or_default();
    let rate = run.success_rate.clamp(0.0, 100.0);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Automatos AI API Test Report - {run_id}</title>
    <style>
        :root {{
            --bg-primary: #0a0f1d;
            --bg-secondary: #141b2d;
            --border: #374151;
            --text-primary: #f9fafb;
            --text-secondary: #9ca3af;
            --green: #10b981;
            --red: #ef4444;
            --yellow: #f59e0b;
            --blue: #3b82f6;
        }}
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
            padding: 3rem 1rem;
        }}
        .container {{ max-width: 1100px; margin: 0 auto; }}
        header {{ margin-bottom: 2rem; }}
        h1 {{ font-size: 2rem; font-weight: 800; }}
        h2 {{ font-size: 1.25rem; margin: 2rem 0 1rem; }}
        .meta {{ color: var(--text-secondary); font-size: 0.875rem; }}
        .badge {{ padding: 0.2rem 0.6rem; border-radius: 999px; font-size: 0.8rem; font-weight: 700; }}
        .badge.passed {{ background: rgba(16, 185, 129, 0.15); color: var(--green); }}
        .badge.failed {{ background: rgba(239, 68, 68, 0.15); color: var(--red); }}
        .summary {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
            gap: 1rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            padding: 1.25rem;
            border-radius: 1rem;
        }}
        .stat-value {{ font-size: 2rem; font-weight: 800; }}
        .stat-label {{
            color: var(--text-secondary);
            font-size: 0.8rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }}
        .stat.passed .stat-value {{ color: var(--green); }}
        .stat.failed .stat-value {{ color: var(--red); }}
        .stat.skipped .stat-value {{ color: var(--yellow); }}
        .progress-bar {{
            position: relative;
            background: var(--bg-secondary);
            height: 12px;
            border-radius: 6px;
            border: 1px solid var(--border);
            overflow: hidden;
        }}
        .progress-fill {{ height: 100%; background: var(--green); }}
        .progress-fill.failed {{ background: var(--red); }}
        .threshold-mark {{ position: absolute; top: 0; bottom: 0; width: 2px; background: var(--blue); }}
        table {{ width: 100%; border-collapse: collapse; background: var(--bg-secondary); border-radius: 0.75rem; overflow: hidden; }}
        th, td {{ padding: 0.6rem 0.9rem; text-align: left; border-bottom: 1px solid var(--border); }}
        th {{ color: var(--text-secondary); font-weight: 600; font-size: 0.8rem; text-transform: uppercase; }}
        tr.passed td.status {{ color: var(--green); }}
        tr.failed td.status {{ color: var(--red); }}
        tr.skipped td.status {{ color: var(--yellow); }}
        code {{ font-family: ui-monospace, monospace; font-size: 0.85em; }}
        .suite {{ margin-bottom: 1.5rem; }}
        .suite h3 {{ margin-bottom: 0.5rem; }}
        .failures {{ list-style: none; }}
        .failures li {{
            background: var(--bg-secondary);
            border-left: 3px solid var(--red);
            padding: 0.75rem 1rem;
            margin-bottom: 0.75rem;
            border-radius: 0.5rem;
        }}
        .error-message {{
            color: var(--red);
            font-family: ui-monospace, monospace;
            font-size: 0.85rem;
            white-space: pre-wrap;
            word-break: break-word;
            margin-top: 0.25rem;
        }}
        .reason {{ color: var(--text-secondary); font-size: 0.85rem; }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>Automatos AI API Test Report <span class="badge {status_class}">{status_text}</span></h1>
            <div class="meta">Run <code>{run_id}</code> &middot; {environment} &middot; {base_url}{filter} &middot; started {started}</div>
        </header>

        <section id="summary" class="summary">
            <div class="stat"><div class="stat-value">{total}</div><div class="stat-label">Total</div></div>
            <div class="stat passed"><div class="stat-value">{passed}</div><div class="stat-label">Passed</div></div>
            <div class="stat failed"><div class="stat-value">{failed}</div><div class="stat-label">Failed</div></div>
            <div class="stat skipped"><div class="stat-value">{skipped}</div><div class="stat-label">Skipped</div></div>
            <div class="stat"><div class="stat-value">{success_rate:.1}%</div><div class="stat-label">Success Rate</div></div>
            <div class="stat"><div class="stat-value">{threshold:.1}%</div><div class="stat-label">Threshold</div></div>
            <div class="stat"><div class="stat-value">{duration:.2}s</div><div class="stat-label">Duration</div></div>
        </section>

        <div class="progress-bar">
            <div class="progress-fill {status_class}" style="width: {rate:.1}%"></div>
            <div class="threshold-mark" style="left: {threshold_mark:.1}%"></div>
        </div>

        <section id="suites">
            <h2>Suites</h2>
            <table>
                <tr><th>Suite</th><th>Level</th><th>Passed</th><th>Failed</th><th>Skipped</th><th>Success Rate</th><th>Threshold</th></tr>{suites_html}
            </table>
        </section>

        <section id="cases">
            <h2>Test Cases</h2>{cases_html}
        </section>
{failures_html}{performance_html}
    </div>
</body>
</html>
"#,
        run_id = html_escape(&run.run_id),
        environment = html_escape(&run.environment),
        base_url = html_escape(&run.base_url),
        started = run.started_at.to_rfc3339(),
        total = run.total,
        passed = run.passed,
        failed = run.failed,
        skipped = run.skipped,
        success_rate = run.success_rate,
        threshold = run.threshold,
        threshold_mark = run.threshold.clamp(0.0, 100.0),
        duration = run.duration,
    )
}

fn suite_row(suite: &SuiteResult) -> String {
    let (mark, class) = if suite.passed_threshold {
        ("✓", "passed")
    } else {
        ("✗", "failed")
    };
    format!(
        r#"
                <tr class="{class}"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td class="status">{mark} {:.1}%</td></tr>"#,
        html_escape(&suite.name),
        suite.level,
        suite.passed,
        suite.failed,
        suite.skipped,
        suite.success_rate,
        suite.threshold
    )
}

fn suite_cases(suite: &SuiteResult) -> String {
    let mut rows = String::new();
    for case in &suite.cases {
        let (status_icon, status_class) = match case.status {
            CaseStatus::Passed => ("✓", "passed"),
            CaseStatus::Failed => ("✗", "failed"),
            CaseStatus::Skipped => ("○", "skipped"),
        };
        let code = case
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_default();
        let timing = case
            .response_time_ms
            .map(|ms| format!("{:.0}ms", ms))
            .unwrap_or_default();
        let detail = match (case.status, &case.error_message) {
            (CaseStatus::Failed, Some(error)) => {
                format!(r#"<div class="error-message">{}</div>"#, html_escape(error))
            }
            (CaseStatus::Skipped, Some(reason)) => {
                format!(r#"<div class="reason">{}</div>"#, html_escape(reason))
            }
            _ => String::new(),
        };
        let _ = write!(
            rows,
            r#"
                    <tr class="{status_class}"><td class="status">{status_icon}</td><td>{}{detail}</td><td><code>{} {}</code></td><td>{code}</td><td>{timing}</td></tr>"#,
            html_escape(&case.name),
            html_escape(&case.method),
            html_escape(&case.path),
        );
    }

    format!(
        r#"
            <div class="suite">
                <h3>{}</h3>
                <table>
                    <tr><th></th><th>Case</th><th>Request</th><th>Status</th><th>Time</th></tr>{rows}
                </table>
            </div>"#,
        html_escape(&suite.name)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_run;

    #[test]
    fn test_html_sections() {
        let html = render(&sample_run());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<span class="badge failed">FAILED</span>"#));
        assert!(html.contains(r#"<section id="summary""#));
        assert!(html.contains(r#"<div class="stat-value">3</div><div class="stat-label">Total</div>"#));
        assert!(html.contains("33.3%"));
        assert!(html.contains(r#"<section id="suites">"#));
        assert!(html.contains(r#"<section id="failures">"#));
        assert!(html.contains("<code>GET /api/documents/analytics/overview</code>"));
        assert!(html.contains(r#"<div class="reason">unresolved variable 'document_id'</div>"#));
        assert!(html.contains(r#"<section id="performance">"#));
    }

    #[test]
    fn test_error_messages_are_escaped() {
        let html = render(&sample_run());
        assert!(html.contains("got HTTP 500 - {&quot;detail&quot;:&quot;down&quot;}"));
        assert!(!html.contains(r#"{"detail":"down"}"#));
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">&</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;"
        );
    }
}
