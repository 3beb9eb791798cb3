//! Test suite definitions
//!
//! A suite is one YAML file describing the cases for one area of the
//! platform API (agents, documents, ...). Suites are discovered from the
//! configured directory and selected by name filter and test level.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::client::{FilePart, Method};
use crate::common::{Error, Result};

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct TestSuite {
    /// Name of the suite, also the module name used by filters
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Test level (default: integration)
    #[serde(default)]
    pub level: TestLevel,
    /// Per-suite success threshold (fraction or percentage)
    pub threshold: Option<f64>,
    /// The cases to execute, in order
    #[serde(default)]
    pub cases: Vec<TestCase>,
    /// Teardown requests; run after the cases, never counted
    #[serde(default)]
    pub cleanup: Vec<TestCase>,
    /// File the suite was loaded from
    #[serde(skip)]
    pub source: PathBuf,
}

/// Test level, as used by `--level`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TestLevel {
    Unit,
    #[default]
    Integration,
    E2e,
    Performance,
    Security,
}

impl TestLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestLevel::Unit => "unit",
            TestLevel::Integration => "integration",
            TestLevel::E2e => "e2e",
            TestLevel::Performance => "performance",
            TestLevel::Security => "security",
        }
    }
}

impl std::fmt::Display for TestLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request and its expectations
#[derive(Deserialize, Debug, Clone)]
pub struct TestCase {
    /// Case name as shown in reports
    pub name: String,
    /// HTTP method (default: GET)
    #[serde(default)]
    pub method: Method,
    /// Endpoint path, may contain `${var}` placeholders
    pub path: String,
    /// Query parameters
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Inline JSON body; merged over `fixture` when both are given
    pub body: Option<Value>,
    /// Fixture reference into `test_data` (e.g. "agents.0")
    pub fixture: Option<String>,
    /// Multipart form upload
    pub multipart: Option<MultipartForm>,
    /// Expectations for the response
    #[serde(default)]
    pub expect: Expect,
    /// Values to capture from the response body: variable -> pointer or key
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    /// Skip this case with the given reason
    pub skip: Option<String>,
}

/// Multipart upload description
#[derive(Deserialize, Debug, Clone)]
pub struct MultipartForm {
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    pub file: Option<FilePart>,
}

/// Expectations for a response
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Expect {
    /// Accepted status code(s) (default: 200)
    #[serde(default)]
    pub status: StatusExpectation,
    /// Top-level keys that must be present in the JSON body
    #[serde(default)]
    pub body_has: Vec<String>,
    /// JSON pointer -> expected value
    #[serde(default)]
    pub body_equals: BTreeMap<String, Value>,
    /// Substring that must appear in the serialized body
    pub body_contains: Option<String>,
    /// Upper bound on response time
    pub max_response_ms: Option<f64>,
}

/// One status code or a list of acceptable ones
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StatusExpectation {
    One(u16),
    Any(Vec<u16>),
}

impl Default for StatusExpectation {
    fn default() -> Self {
        StatusExpectation::One(200)
    }
}

impl StatusExpectation {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            StatusExpectation::One(code) => *code == status,
            StatusExpectation::Any(codes) => codes.contains(&status),
        }
    }
}

impl std::fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusExpectation::One(code) => write!(f, "{}", code),
            StatusExpectation::Any(codes) => {
                let codes: Vec<String> = codes.iter().map(u16::to_string).collect();
                write!(f, "one of [{}]", codes.join(", "))
            }
        }
    }
}

impl TestSuite {
    /// Load and validate a suite file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let mut suite = Self::from_yaml(&content).map_err(|e| match e {
            Error::SuiteParse { message, .. } => Error::SuiteParse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        suite.source = path.to_path_buf();
        Ok(suite)
    }

    /// Parse a suite from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let suite: Self = serde_yaml::from_str(content).map_err(|e| Error::SuiteParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        suite.validate()?;
        Ok(suite)
    }

    fn validate(&self) -> Result<()> {
        let fail = |message: String| Error::SuiteParse {
            path: self.source.display().to_string(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(fail("suite name must not be empty".to_string()));
        }
        if let Some(threshold) = self.threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(fail(format!(
                    "threshold must be between 0 and 100, got {}",
                    threshold
                )));
            }
        }
        for case in self.cases.iter().chain(self.cleanup.iter()) {
            if case.path.trim().is_empty() {
                return Err(fail(format!("case '{}' has an empty path", case.name)));
            }
            if case.multipart.is_some() && (case.body.is_some() || case.fixture.is_some()) {
                return Err(fail(format!(
                    "case '{}' mixes multipart with a JSON body",
                    case.name
                )));
            }
        }
        Ok(())
    }

    /// File stem of the source, used as a second name for filtering
    pub fn module_name(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Case-insensitive substring match on the suite name or file stem
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.name.to_lowercase().contains(&filter)
            || self.module_name().to_lowercase().contains(&filter)
    }
}

/// Load every `*.yaml` / `*.yml` suite below `dir`, ordered by file name
pub fn discover(dir: &Path) -> Result<Vec<TestSuite>> {
    if !dir.is_dir() {
        return Err(Error::SuitesDirMissing(dir.display().to_string()));
    }

    let mut suites = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::FileRead {
            path: dir.display().to_string(),
            error: e.to_string(),
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false);
        if entry.file_type().is_file() && is_yaml {
            suites.push(TestSuite::load(path)?);
        }
    }

    tracing::debug!(count = suites.len(), dir = %dir.display(), "discovered suites");
    Ok(suites)
}

/// Filter suites by name and level
pub fn select<'a>(
    suites: &'a [TestSuite],
    filter: Option<&str>,
    level: Option<TestLevel>,
) -> Vec<&'a TestSuite> {
    suites
        .iter()
        .filter(|suite| filter.map(|f| suite.matches(f)).unwrap_or(true))
        .filter(|suite| level.map(|l| suite.level == l).unwrap_or(true))
        .collect()
}
