//! Configuration file handling
//!
//! The harness is configured from a single YAML file, loaded once at
//! startup and passed around by reference. Relative paths inside the file
//! are resolved against the directory that contains it.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::paths::{config_path, resolve_relative};
use super::{Error, Result};

/// Target environment for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Environment {
    #[default]
    #[value(alias = "development")]
    Dev,
    Staging,
    #[value(alias = "production")]
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }

    /// Parse the spellings accepted in config files and `TEST_ENVIRONMENT`
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(Error::UnknownEnvironment(other.to_string())),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct HarnessConfig {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Thresholds for pass/fail and latency classification
    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Report output settings
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Directory holding the YAML test suites
    #[serde(default = "default_suites_dir")]
    pub suites_dir: PathBuf,

    /// Log directory for the file log (none disables file logging)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Module order for `--module-sequence` runs
    #[serde(default)]
    pub module_sequence: Vec<String>,

    /// Per-environment overrides
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,

    /// Endpoints each category is expected to expose ("GET /api/agents")
    #[serde(default)]
    pub expected_endpoints: BTreeMap<String, Vec<String>>,

    /// Literal fixture payloads, addressed from suites as `agents.0`
    #[serde(default)]
    pub test_data: BTreeMap<String, Value>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Remote API settings
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Tried in order when `base_url` fails its health probe
    #[serde(default)]
    pub fallback_urls: Vec<String>,

    #[serde(default)]
    pub authentication: AuthConfig,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Total attempts for requests that fail at the transport level
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_openapi_path")]
    pub openapi_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fallback_urls: Vec::new(),
            authentication: AuthConfig::default(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            health_path: default_health_path(),
            openapi_path: default_openapi_path(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_health_path() -> String {
    "/health".to_string()
}
fn default_openapi_path() -> String {
    "/openapi.json".to_string()
}
fn default_suites_dir() -> PathBuf {
    PathBuf::from("suites")
}

/// Pass/fail threshold and latency buckets
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    /// Fraction (0.7) or percentage (85) of cases that must pass
    #[serde(default = "default_threshold")]
    pub success_threshold: f64,

    #[serde(default = "default_excellent")]
    pub excellent_response_time_ms: f64,

    #[serde(default = "default_acceptable")]
    pub acceptable_response_time_ms: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            success_threshold: default_threshold(),
            excellent_response_time_ms: default_excellent(),
            acceptable_response_time_ms: default_acceptable(),
        }
    }
}

fn default_threshold() -> f64 {
    0.7
}
fn default_excellent() -> f64 {
    200.0
}
fn default_acceptable() -> f64 {
    2000.0
}

/// Report output settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportsConfig {
    /// Write report files even without `--reports`
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_reports_dir")]
    pub dir: PathBuf,

    /// Where `--module-sequence` drops `<module>.json` snapshots
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    #[serde(default = "default_formats")]
    pub formats: Vec<ReportFormat>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_reports_dir(),
            export_dir: None,
            formats: default_formats(),
        }
    }
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}
fn default_formats() -> Vec<ReportFormat> {
    vec![
        ReportFormat::Json,
        ReportFormat::Markdown,
        ReportFormat::Junit,
        ReportFormat::Html,
    ]
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Json,
    Markdown,
    Junit,
    Html,
}

/// Settings replaced when a run targets a named environment
#[derive(Debug, Deserialize, Default, Clone)]
pub struct EnvironmentOverride {
    pub base_url: Option<String>,
    pub fallback_urls: Option<Vec<String>>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub success_threshold: Option<f64>,
}

impl HarnessConfig {
    /// Load configuration from `path`, or from the default location
    ///
    /// Returns default configuration if no file exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                let mut config = Self::from_yaml(&content).map_err(|e| match e {
                    Error::ConfigParse { message, .. } => Error::ConfigParse {
                        path: path.display().to_string(),
                        message,
                    },
                    other => other,
                })?;
                config.base_dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                config.source = Some(path);
                Ok(config)
            }
            None => Ok(Self {
                base_dir: PathBuf::from("."),
                ..Self::default()
            }),
        }
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(content).map_err(|e| Error::ConfigParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.base_dir = PathBuf::from(".");
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make every run meaningless
    ///
    /// Runs on parse and again once profiles and overrides are layered on.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must not be empty".to_string()));
        }
        if self.api.max_retries == 0 {
            return Err(Error::Config("api.max_retries must be at least 1".to_string()));
        }
        let threshold = self.performance.success_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "performance.success_threshold must be between 0 and 100, got {}",
                threshold
            )));
        }
        Ok(())
    }

    /// Apply `API_BASE_URL`, `API_TIMEOUT`, `API_RETRY_COUNT` and `API_KEY`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("API_BASE_URL").filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(timeout) = lookup("API_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.api.timeout = timeout;
        }
        if let Some(retries) = lookup("API_RETRY_COUNT").and_then(|v| v.parse::<u32>().ok()) {
            self.api.max_retries = retries.max(1);
        }
        if let Some(key) = lookup("API_KEY").filter(|v| !v.is_empty()) {
            let headers = &mut self.api.authentication.headers;
            headers.insert("X-API-Key".to_string(), key.clone());
            headers.insert("Authorization".to_string(), format!("Bearer {}", key));
        }
    }

    /// Layer the `environments.<env>` profile over the base settings
    pub fn for_environment(mut self, env: Environment) -> Self {
        let profile = self
            .environments
            .get(env.as_str())
            .or_else(|| match env {
                Environment::Dev => self.environments.get("development"),
                Environment::Prod => self.environments.get("production"),
                Environment::Staging => None,
            })
            .cloned();

        if let Some(profile) = profile {
            if let Some(url) = profile.base_url {
                self.api.base_url = url;
            }
            if let Some(fallbacks) = profile.fallback_urls {
                self.api.fallback_urls = fallbacks;
            }
            self.api.authentication.headers.extend(profile.headers);
            if let Some(threshold) = profile.success_threshold {
                self.performance.success_threshold = threshold;
            }
        }
        self
    }

    /// Success threshold as a percentage
    pub fn threshold_percent(&self) -> f64 {
        normalize_threshold(self.performance.success_threshold)
    }

    pub fn suites_dir(&self) -> PathBuf {
        resolve_relative(&self.base_dir, &self.suites_dir)
    }

    pub fn reports_dir(&self) -> PathBuf {
        resolve_relative(&self.base_dir, &self.reports.dir)
    }

    pub fn export_dir(&self) -> Option<PathBuf> {
        self.reports
            .export_dir
            .as_ref()
            .map(|dir| resolve_relative(&self.base_dir, dir))
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| resolve_relative(&self.base_dir, dir))
    }

    /// Look up a fixture by dotted path (`agents.0`, `documents.1.title`)
    pub fn fixture(&self, reference: &str) -> Result<Value> {
        let mut parts = reference.split('.');
        let root = parts
            .next()
            .and_then(|name| self.test_data.get(name))
            .ok_or_else(|| Error::FixtureNotFound(reference.to_string()))?;

        let mut current = root;
        for part in parts {
            current = match current {
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                Value::Object(map) => map.get(part),
                _ => None,
            }
            .ok_or_else(|| Error::FixtureNotFound(reference.to_string()))?;
        }
        Ok(current.clone())
    }
}

/// Thresholds up to 1.0 are fractions, anything above is already a percentage
pub fn normalize_threshold(value: f64) -> f64 {
    if value <= 1.0 {
        value * 100.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
api:
  base_url: http://api.internal:8000
  fallback_urls:
    - http://localhost:8000
  authentication:
    headers:
      X-API-Key: secret
  timeout: 10
  max_retries: 2
performance:
  success_threshold: 0.85
environments:
  staging:
    base_url: https://staging.example.com
    headers:
      X-Env: staging
test_data:
  agents:
    - name: Code Architect
      agent_type: code_architect
    - name: Security Expert
"#;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::from_yaml("{}").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout, 30);
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.threshold_percent(), 70.0);
        assert_eq!(config.suites_dir, PathBuf::from("suites"));
        assert!(!config.reports.enabled);
        assert!(config.reports.formats.contains(&ReportFormat::Html));
    }

    #[test]
    fn test_parse_sample() {
        let config = HarnessConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.api.base_url, "http://api.internal:8000");
        assert_eq!(config.api.fallback_urls, vec!["http://localhost:8000"]);
        assert_eq!(config.api.authentication.headers["X-API-Key"], "secret");
        assert_eq!(config.api.max_retries, 2);
        assert!((config.threshold_percent() - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_threshold_accepts_percentages() {
        assert_eq!(normalize_threshold(85.0), 85.0);
        assert_eq!(normalize_threshold(0.7), 70.0);
        assert_eq!(normalize_threshold(1.0), 100.0);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = HarnessConfig::from_yaml("performance:\n  success_threshold: 250\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_profile_threshold_is_validated() {
        let config = HarnessConfig::from_yaml(
            "environments:\n  prod:\n    success_threshold: 250\n",
        )
        .unwrap()
        .for_environment(Environment::Prod);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.yaml");
        std::fs::write(&path, "suites_dir: cases\n").unwrap();

        let config = HarnessConfig::load(Some(&path)).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
        assert_eq!(config.suites_dir(), dir.path().join("cases"));
    }

    #[test]
    fn test_environment_profile() {
        let config = HarnessConfig::from_yaml(SAMPLE)
            .unwrap()
            .for_environment(Environment::Staging);
        assert_eq!(config.api.base_url, "https://staging.example.com");
        assert_eq!(config.api.authentication.headers["X-Env"], "staging");
        assert_eq!(config.api.authentication.headers["X-API-Key"], "secret");
    }

    #[test]
    fn test_missing_profile_keeps_base() {
        let config = HarnessConfig::from_yaml(SAMPLE)
            .unwrap()
            .for_environment(Environment::Prod);
        assert_eq!(config.api.base_url, "http://api.internal:8000");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = HarnessConfig::from_yaml(SAMPLE).unwrap();
        config.apply_overrides_from(|key| match key {
            "API_BASE_URL" => Some("http://override:9000".to_string()),
            "API_TIMEOUT" => Some("5".to_string()),
            "API_KEY" => Some("k".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://override:9000");
        assert_eq!(config.api.timeout, 5);
        assert_eq!(config.api.authentication.headers["Authorization"], "Bearer k");
    }

    #[test]
    fn test_fixture_lookup() {
        let config = HarnessConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(
            config.fixture("agents.0").unwrap(),
            json!({"name": "Code Architect", "agent_type": "code_architect"})
        );
        assert_eq!(config.fixture("agents.1.name").unwrap(), json!("Security Expert"));
        assert!(matches!(
            config.fixture("agents.7"),
            Err(Error::FixtureNotFound(_))
        ));
        assert!(config.fixture("skills").is_err());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("development").unwrap(), Environment::Dev);
        assert_eq!(Environment::parse("PROD").unwrap(), Environment::Prod);
        assert!(Environment::parse("qa").is_err());
    }
}
