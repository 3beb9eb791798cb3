//! Test dispatcher
//!
//! Runs selected suites against a `Transport` and folds the case outcomes
//! into a `TestRunResult`. Failures never stop the run: every selected
//! suite and case is executed and recorded.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use colored::Colorize;
use futures_util::future::join_all;

use crate::client::{ApiRequest, RequestBody, Transport};
use crate::common::config::normalize_threshold;
use crate::common::{Environment, Error, HarnessConfig, Result};

use super::assertions;
use super::result::{
    new_run_id, CaseStatus, RunContext, RunStatus, SuiteResult, TestCaseResult, TestRunResult,
};
use super::suite::{select, TestCase, TestLevel, TestSuite};
use super::vars::{self, Variables};

/// What to run and how
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub filter: Option<String>,
    pub level: Option<TestLevel>,
    pub parallel: bool,
    pub verbose: bool,
}

/// One module's share of a module-sequence run
#[derive(Debug, Clone)]
pub struct ModuleRun {
    pub module: String,
    pub result: TestRunResult,
}

/// Result of `Dispatcher::run_modules`
#[derive(Debug, Clone)]
pub struct ModuleSequenceResult {
    pub modules: Vec<ModuleRun>,
    pub combined: TestRunResult,
}

/// Resolve every `fixture:` reference before any request goes out
pub fn validate_fixtures(config: &HarnessConfig, suites: &[TestSuite]) -> Result<()> {
    for suite in suites {
        for case in suite.cases.iter().chain(suite.cleanup.iter()) {
            if let Some(fixture) = &case.fixture {
                config.fixture(fixture).inspect_err(|_| {
                    tracing::error!(
                        suite = %suite.name,
                        case = %case.name,
                        %fixture,
                        "unknown fixture"
                    );
                })?;
            }
        }
    }
    Ok(())
}

/// Runs suites against the platform
pub struct Dispatcher<'a> {
    config: &'a HarnessConfig,
    transport: Arc<dyn Transport>,
    environment: Environment,
}

/// Identity shared by every case in one invocation
struct RunIdentity {
    run_id: String,
    started_at: DateTime<Utc>,
}

impl RunIdentity {
    fn new() -> Self {
        let started_at = Utc::now();
        Self {
            run_id: new_run_id(started_at),
            started_at,
        }
    }
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        transport: Arc<dyn Transport>,
        environment: Environment,
    ) -> Self {
        Self {
            config,
            transport,
            environment,
        }
    }

    /// Run every suite matching the options
    pub async fn run(&self, suites: &[TestSuite], options: &RunOptions) -> TestRunResult {
        let identity = RunIdentity::new();
        let selected = select(suites, options.filter.as_deref(), options.level);
        self.run_selected(&identity, &selected, options, options.filter.clone())
            .await
    }

    /// Run each module in turn, then combine them into one result
    ///
    /// A suite matched by several modules only runs for the first one.
    /// `options.filter` narrows every module's selection further.
    pub async fn run_modules(
        &self,
        suites: &[TestSuite],
        modules: &[String],
        options: &RunOptions,
    ) -> ModuleSequenceResult {
        let identity = RunIdentity::new();
        let mut seen = HashSet::new();
        let mut runs = Vec::with_capacity(modules.len());

        for module in modules {
            println!("\n{} {}", "Module:".blue().bold(), module.white().bold());
            let selected: Vec<&TestSuite> = select(suites, Some(module.as_str()), options.level)
                .into_iter()
                .filter(|suite| options.filter.as_deref().map_or(true, |f| suite.matches(f)))
                .filter(|suite| seen.insert((suite.name.clone(), suite.source.clone())))
                .collect();
            if selected.is_empty() {
                println!("  {}", "no suites matched".dimmed());
            }
            let result = self
                .run_selected(&identity, &selected, options, Some(module.clone()))
                .await;
            runs.push(ModuleRun {
                module: module.clone(),
                result,
            });
        }

        let suites = runs
            .iter()
            .flat_map(|run| run.result.suites.iter().cloned())
            .collect();
        let combined = TestRunResult::aggregate(
            self.context(&identity, options, options.filter.clone()),
            suites,
            &self.config.performance,
        );

        ModuleSequenceResult {
            modules: runs,
            combined,
        }
    }

    async fn run_selected(
        &self,
        identity: &RunIdentity,
        selected: &[&TestSuite],
        options: &RunOptions,
        filter: Option<String>,
    ) -> TestRunResult {
        if selected.is_empty() {
            tracing::warn!(filter = ?filter, level = ?options.level, "no test suites selected");
        }

        let results = if options.parallel && selected.len() > 1 {
            tracing::debug!(count = selected.len(), "running suites in parallel");
            join_all(
                selected
                    .iter()
                    .map(|suite| self.run_suite(suite, identity, options.verbose)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(selected.len());
            for suite in selected {
                results.push(self.run_suite(suite, identity, options.verbose).await);
            }
            results
        };

        TestRunResult::aggregate(
            self.context(identity, options, filter),
            results,
            &self.config.performance,
        )
    }

    fn context(
        &self,
        identity: &RunIdentity,
        options: &RunOptions,
        filter: Option<String>,
    ) -> RunContext {
        RunContext {
            run_id: identity.run_id.clone(),
            environment: self.environment.to_string(),
            filter,
            level: options.level,
            base_url: self.transport.base_url().to_string(),
            threshold: self.config.threshold_percent(),
            started_at: identity.started_at,
        }
    }

    /// Run one suite; cases in order, then cleanup
    async fn run_suite(
        &self,
        suite: &TestSuite,
        identity: &RunIdentity,
        verbose: bool,
    ) -> SuiteResult {
        let start = Instant::now();
        let mut vars = Variables::for_run(&identity.run_id, &identity.started_at.to_rfc3339());
        let mut cases = Vec::with_capacity(suite.cases.len());

        for case in &suite.cases {
            cases.push(self.run_case(suite, case, &mut vars, &identity.run_id).await);
        }

        for case in &suite.cleanup {
            let outcome = self.run_case(suite, case, &mut vars, &identity.run_id).await;
            tracing::debug!(
                suite = %suite.name,
                case = %case.name,
                status = ?outcome.status,
                error = ?outcome.error_message,
                "cleanup"
            );
        }

        let threshold = suite
            .threshold
            .map(normalize_threshold)
            .unwrap_or_else(|| self.config.threshold_percent());
        let result = SuiteResult::new(
            &suite.name,
            suite.level,
            suite.description.clone(),
            threshold,
            start.elapsed().as_secs_f64(),
            cases,
        );
        print_suite(&result, verbose);
        result
    }

    async fn run_case(
        &self,
        suite: &TestSuite,
        case: &TestCase,
        vars: &mut Variables,
        run_id: &str,
    ) -> TestCaseResult {
        let start = Instant::now();
        let mut result = TestCaseResult {
            run_id: run_id.to_string(),
            suite: suite.name.clone(),
            name: case.name.clone(),
            status: CaseStatus::Passed,
            duration: 0.0,
            error_message: None,
            method: case.method.to_string(),
            path: case.path.clone(),
            status_code: None,
            response_time_ms: None,
        };

        if let Some(reason) = &case.skip {
            result.status = CaseStatus::Skipped;
            result.error_message = Some(reason.clone());
            return result;
        }

        let request = match self.build_request(case, vars) {
            Ok(request) => request,
            Err(Error::UnresolvedVariable(name)) => {
                result.status = CaseStatus::Skipped;
                result.error_message = Some(format!("unresolved variable '{}'", name));
                return result;
            }
            Err(e) => {
                result.status = CaseStatus::Failed;
                result.error_message = Some(e.to_string());
                return result;
            }
        };
        result.path = request.path.clone();

        match self.transport.send(&request).await {
            Ok(response) => {
                result.status_code = Some(response.status);
                result.response_time_ms = Some(response.elapsed_ms);
                match assertions::check(&request, &response, &case.expect) {
                    Ok(()) => {
                        for (name, selector) in &case.capture {
                            match vars::capture(&response.body, selector) {
                                Some(value) => vars.set(name, value),
                                None => tracing::debug!(
                                    case = %case.name,
                                    variable = %name,
                                    selector = %selector,
                                    "capture found nothing"
                                ),
                            }
                        }
                    }
                    Err(e) => {
                        result.status = CaseStatus::Failed;
                        result.error_message = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                result.status = CaseStatus::Failed;
                result.error_message = Some(e.to_string());
            }
        }

        result.duration = start.elapsed().as_secs_f64();
        result
    }

    fn build_request(&self, case: &TestCase, vars: &Variables) -> Result<ApiRequest> {
        let mut request = ApiRequest::new(case.method, vars.render(&case.path)?);
        for (key, value) in &case.query {
            request.query.insert(key.clone(), vars.render(value)?);
        }

        let body = match (&case.fixture, &case.body) {
            (Some(fixture), Some(body)) => Some(vars::merge(self.config.fixture(fixture)?, body.clone())),
            (Some(fixture), None) => Some(self.config.fixture(fixture)?),
            (None, Some(body)) => Some(body.clone()),
            (None, None) => None,
        };

        request.body = if let Some(body) = body {
            RequestBody::Json(vars.render_value(&body)?)
        } else if let Some(multipart) = &case.multipart {
            let mut fields = BTreeMap::new();
            for (name, value) in &multipart.fields {
                fields.insert(name.clone(), vars.render(value)?);
            }
            let file = match &multipart.file {
                Some(file) => {
                    let mut file = file.clone();
                    file.filename = vars.render(&file.filename)?;
                    file.content = vars.render(&file.content)?;
                    Some(file)
                }
                None => None,
            };
            RequestBody::Multipart { fields, file }
        } else {
            RequestBody::Empty
        };

        Ok(request)
    }
}

/// Print one suite's outcome block
fn print_suite(result: &SuiteResult, verbose: bool) {
    println!(
        "\n{} {} {}",
        "Suite:".blue().bold(),
        result.name.white().bold(),
        format!("[{}]", result.level).dimmed()
    );
    if let Some(desc) = &result.description {
        if verbose {
            println!("  {}", desc.dimmed());
        }
    }

    for case in &result.cases {
        let timing = case
            .response_time_ms
            .map(|ms| format!("({:.0}ms)", ms))
            .unwrap_or_default();
        match case.status {
            CaseStatus::Passed => println!(
                "  {} {} {}",
                "✓".green(),
                case.name,
                timing.dimmed()
            ),
            CaseStatus::Failed => {
                println!("  {} {} {}", "✗".red(), case.name, timing.dimmed());
                if let Some(error) = &case.error_message {
                    println!("      {}", error.red());
                }
            }
            CaseStatus::Skipped => {
                let reason = case.error_message.as_deref().unwrap_or("skipped");
                println!("  {} {} {}", "-".yellow(), case.name, reason.dimmed());
            }
        }
    }

    let rate = format!("{:.1}%", result.success_rate);
    println!(
        "  {} passed, {} failed, {} skipped ({})",
        result.passed.to_string().green(),
        result.failed.to_string().red(),
        result.skipped.to_string().yellow(),
        if result.passed_threshold {
            rate.green()
        } else {
            rate.red()
        }
    );
}

/// Print the run summary
pub fn print_summary(run: &TestRunResult) {
    println!("\n{}", "Test Run Summary".cyan().bold());
    println!("  Run ID:       {}", run.run_id);
    println!("  Environment:  {}", run.environment);
    println!("  API:          {}", run.base_url);
    println!("  Suites:       {}", run.suites.len());
    println!("  Total:        {}", run.total);
    println!("  Passed:       {}", run.passed.to_string().green());
    println!("  Failed:       {}", run.failed.to_string().red());
    println!("  Skipped:      {}", run.skipped.to_string().yellow());
    println!(
        "  Success Rate: {:.1}% (threshold {:.1}%)",
        run.success_rate, run.threshold
    );
    println!("  Duration:     {:.2}s", run.duration);

    match run.status {
        RunStatus::Passed => println!("\n{} {}\n", "✓".green().bold(), "PASSED".green().bold()),
        RunStatus::Failed => println!("\n{} {}\n", "✗".red().bold(), "FAILED".red().bold()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::ScriptedTransport;
    use serde_json::json;

    const CONFIG: &str = r#"
performance:
  success_threshold: 0.7
test_data:
  documents:
    - title: Test Document
      content: Sample content for the platform
"#;

    const DOCUMENTS: &str = r#"
name: documents
cases:
  - name: list documents
    path: /api/documents
  - name: create document
    method: POST
    path: /api/documents
    fixture: documents.0
    body:
      title: "Doc ${run_id}"
    expect:
      status: [200, 201]
    capture:
      document_id: id
  - name: get document
    path: /api/documents/${document_id}
  - name: analytics overview
    path: /api/documents/analytics/overview
cleanup:
  - name: delete document
    method: DELETE
    path: /api/documents/${document_id}
"#;

    const AGENTS: &str = r#"
name: agents
level: e2e
cases:
  - name: list agents
    path: /api/agents
"#;

    fn documents_backend() -> ScriptedTransport {
        ScriptedTransport::new()
            .route("GET /api/documents", 200, json!([]))
            .route("POST /api/documents", 201, json!({"id": "doc-1"}))
            .route("GET /api/documents/doc-1", 200, json!({"id": "doc-1"}))
            .route(
                "GET /api/documents/analytics/overview",
                500,
                json!({"detail": "analytics backend down"}),
            )
            .route("DELETE /api/documents/doc-1", 204, json!({}))
            .route("GET /api/agents", 200, json!([]))
    }

    fn suites() -> Vec<TestSuite> {
        vec![
            TestSuite::from_yaml(AGENTS).unwrap(),
            TestSuite::from_yaml(DOCUMENTS).unwrap(),
        ]
    }

    fn options(filter: &str) -> RunOptions {
        RunOptions {
            filter: Some(filter.to_string()),
            ..RunOptions::default()
        }
    }

    #[tokio::test]
    async fn test_documents_with_one_server_error() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let transport = Arc::new(documents_backend());
        let dispatcher = Dispatcher::new(&config, transport.clone(), Environment::Dev);

        let run = dispatcher.run(&suites(), &options("documents")).await;

        assert_eq!(run.suites.len(), 1);
        assert_eq!(run.total, 4);
        assert_eq!(run.failed, 1);
        assert_eq!(run.passed, 3);
        assert_eq!(run.passed + run.failed + run.skipped, run.total);
        assert!((run.success_rate - 75.0).abs() < 1e-9);
        assert_eq!(run.status, RunStatus::Passed);

        let failing: Vec<&TestCaseResult> = run
            .cases()
            .filter(|c| c.status == CaseStatus::Failed)
            .collect();
        assert_eq!(failing.len(), 1);
        assert_eq!(failing[0].name, "analytics overview");
        assert_eq!(failing[0].status_code, Some(500));
        assert!(failing[0].error_message.as_deref().unwrap().contains("500"));
        assert!(run.cases().all(|c| c.run_id == run.run_id));

        // The captured id flows into later cases and cleanup
        let calls = transport.calls();
        assert!(calls.contains(&"GET /api/documents/doc-1".to_string()));
        assert_eq!(calls.last().unwrap(), "DELETE /api/documents/doc-1");
    }

    #[tokio::test]
    async fn test_unresolved_capture_skips_case() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("GET /api/documents", 200, json!([]))
                .route("POST /api/documents", 422, json!({"detail": "invalid"})),
        );
        let dispatcher = Dispatcher::new(&config, transport, Environment::Dev);

        let run = dispatcher.run(&suites(), &options("documents")).await;
        let get = run.cases().find(|c| c.name == "get document").unwrap();
        assert_eq!(get.status, CaseStatus::Skipped);
        assert!(get.error_message.as_deref().unwrap().contains("document_id"));
        assert_eq!(run.skipped, 1);
        assert_eq!(run.failed, 2);
        assert_eq!(run.passed + run.failed + run.skipped, run.total);
    }

    #[tokio::test]
    async fn test_filter_matching_nothing() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let dispatcher = Dispatcher::new(&config, Arc::new(documents_backend()), Environment::Dev);

        let run = dispatcher.run(&suites(), &options("no_such_module")).await;
        assert_eq!(run.total, 0);
        assert_eq!(run.success_rate, 0.0);
        assert!(run.is_passed());
        assert!(run.suites.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_records_failures() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let dispatcher =
            Dispatcher::new(&config, Arc::new(ScriptedTransport::unreachable()), Environment::Dev);

        let run = dispatcher.run(&suites(), &RunOptions::default()).await;
        assert_eq!(run.total, 5);
        assert_eq!(run.passed, 0);
        // get document depends on a capture that never happened
        assert_eq!(run.skipped, 1);
        assert_eq!(run.failed, 4);
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run
            .cases()
            .filter(|c| c.status == CaseStatus::Failed)
            .all(|c| c.error_message.as_deref().unwrap().contains("connection refused")));
    }

    #[tokio::test]
    async fn test_parallel_keeps_suite_order() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let dispatcher = Dispatcher::new(&config, Arc::new(documents_backend()), Environment::Dev);

        let run = dispatcher
            .run(
                &suites(),
                &RunOptions {
                    parallel: true,
                    ..RunOptions::default()
                },
            )
            .await;
        let names: Vec<&str> = run.suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["agents", "documents"]);
        assert_eq!(run.total, 5);
    }

    #[tokio::test]
    async fn test_level_filter() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let dispatcher = Dispatcher::new(&config, Arc::new(documents_backend()), Environment::Dev);

        let run = dispatcher
            .run(
                &suites(),
                &RunOptions {
                    level: Some(TestLevel::E2e),
                    ..RunOptions::default()
                },
            )
            .await;
        assert_eq!(run.suites.len(), 1);
        assert_eq!(run.suites[0].name, "agents");
    }

    #[tokio::test]
    async fn test_module_sequence_combines_modules() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let dispatcher = Dispatcher::new(&config, Arc::new(documents_backend()), Environment::Dev);
        let modules = vec![
            "agents".to_string(),
            "documents".to_string(),
            "missing".to_string(),
            "doc".to_string(),
        ];

        let result = dispatcher
            .run_modules(&suites(), &modules, &RunOptions::default())
            .await;

        assert_eq!(result.modules.len(), 4);
        assert_eq!(result.modules[0].result.total, 1);
        assert_eq!(result.modules[1].result.total, 4);
        assert_eq!(result.modules[2].result.total, 0);
        // "doc" matches documents again, which already ran
        assert_eq!(result.modules[3].result.total, 0);
        assert_eq!(result.combined.total, 5);
        assert_eq!(result.combined.failed, 1);
        assert!(result
            .modules
            .iter()
            .all(|m| m.result.run_id == result.combined.run_id));
    }

    #[tokio::test]
    async fn test_module_sequence_honours_filter() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let transport = Arc::new(documents_backend());
        let dispatcher = Dispatcher::new(&config, transport.clone(), Environment::Dev);
        let modules = vec!["agents".to_string(), "documents".to_string()];

        let result = dispatcher
            .run_modules(&suites(), &modules, &options("documents"))
            .await;

        assert_eq!(result.modules[0].result.total, 0);
        assert_eq!(result.modules[1].result.total, 4);
        assert_eq!(result.combined.total, 4);
        assert_eq!(result.combined.filter.as_deref(), Some("documents"));
        assert!(!transport.calls().contains(&"GET /api/agents".to_string()));
    }

    #[test]
    fn test_unknown_fixture_rejected_before_dispatch() {
        let config = HarnessConfig::from_yaml("test_data: {}\n").unwrap();
        let agents = TestSuite::from_yaml(
            r#"
name: agents
cases:
  - name: list agents
    path: /api/agents
  - name: create agent
    method: POST
    path: /api/agents
    fixture: agnets.0
"#,
        )
        .unwrap();

        let err = validate_fixtures(&config, &[agents]).unwrap_err();
        assert!(matches!(err, Error::FixtureNotFound(ref name) if name == "agnets.0"));
    }

    #[test]
    fn test_cleanup_fixtures_are_checked() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        assert!(validate_fixtures(&config, &suites()).is_ok());

        let mut documents = TestSuite::from_yaml(DOCUMENTS).unwrap();
        documents.cleanup[0].fixture = Some("documents.9".to_string());
        assert!(matches!(
            validate_fixtures(&config, &[documents]),
            Err(Error::FixtureNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_suite_threshold_override() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let dispatcher = Dispatcher::new(&config, Arc::new(documents_backend()), Environment::Dev);
        let mut strict = TestSuite::from_yaml(DOCUMENTS).unwrap();
        strict.threshold = Some(85.0);

        let run = dispatcher.run(&[strict], &RunOptions::default()).await;
        assert_eq!(run.suites[0].threshold, 85.0);
        assert!(!run.suites[0].passed_threshold);
        // the run itself is judged against the configured threshold
        assert!(run.is_passed());
    }

    #[test]
    fn test_build_request_renders_fixture_and_vars() {
        let config = HarnessConfig::from_yaml(CONFIG).unwrap();
        let dispatcher = Dispatcher::new(&config, Arc::new(ScriptedTransport::new()), Environment::Dev);
        let suite = TestSuite::from_yaml(DOCUMENTS).unwrap();
        let vars = Variables::for_run("r42", "t");

        let request = dispatcher.build_request(&suite.cases[1], &vars).unwrap();
        assert_eq!(request.line(), "POST /api/documents");
        assert_eq!(
            request.body,
            RequestBody::Json(json!({
                "title": "Doc r42",
                "content": "Sample content for the platform"
            }))
        );

        let err = dispatcher.build_request(&suite.cases[2], &vars).unwrap_err();
        assert!(matches!(err, Error::UnresolvedVariable(_)));
    }
}
