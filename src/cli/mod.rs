//! CLI command handling
//!
//! Resolves configuration, builds the transport and dispatches commands.
//! Every command returns whether it succeeded; `main` turns that into the
//! process exit code.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::client::{HttpTransport, Transport};
use crate::commands::{Commands, GlobalArgs, RunArgs};
use crate::common::{Environment, Error, HarnessConfig, Result};
use crate::report;
use crate::testing::discovery::{self, EndpointValidation};
use crate::testing::{self, print_summary, Dispatcher, RunOptions, TestLevel, TestRunResult};

/// Load the configuration and work out the target environment
///
/// Precedence, lowest first: config file, `environments.<env>` profile,
/// `API_*` environment variables, command-line flags.
pub fn load_config(global: &GlobalArgs) -> Result<(HarnessConfig, Environment)> {
    let environment = match global.environment {
        Some(env) => env,
        None => match std::env::var("TEST_ENVIRONMENT") {
            Ok(value) if !value.is_empty() => Environment::parse(&value)?,
            _ => Environment::default(),
        },
    };

    let mut config = HarnessConfig::load(global.config.as_deref())?.for_environment(environment);
    config.apply_env_overrides();
    if let Some(url) = &global.api_url {
        config.api.base_url = url.clone();
        config.api.fallback_urls.clear();
    }
    config.validate()?;

    Ok((config, environment))
}

/// Dispatch a CLI command
pub async fn dispatch(
    command: Commands,
    config: &HarnessConfig,
    environment: Environment,
    verbose: bool,
) -> Result<bool> {
    match command {
        Commands::Run(args) => run(args, config, environment, verbose).await,
        Commands::List { level, json } => list(config, level, json),
        Commands::Check => check(config).await,
        Commands::Discover { category, json } => discover(config, category, json).await,
    }
}

async fn run(
    args: RunArgs,
    config: &HarnessConfig,
    environment: Environment,
    verbose: bool,
) -> Result<bool> {
    let suites = testing::discover(&config.suites_dir())?;
    testing::validate_fixtures(config, &suites)?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::resolve(&config.api).await?);

    println!(
        "{} {} ({})",
        "Running API tests against".cyan(),
        transport.base_url().white().bold(),
        environment
    );

    let dispatcher = Dispatcher::new(config, transport, environment);
    let options = RunOptions {
        filter: args.filter.clone(),
        level: args.level,
        parallel: args.parallel,
        verbose,
    };

    let run = if args.module_sequence {
        let modules: Vec<String> = if config.module_sequence.is_empty() {
            suites.iter().map(|s| s.name.clone()).collect()
        } else {
            config.module_sequence.clone()
        };
        let sequence = dispatcher.run_modules(&suites, &modules, &options).await;

        let export_dir = export_dir(&args, config);
        for module in &sequence.modules {
            let path = report::export_module(&module.result, &export_dir, &module.module)?;
            if verbose {
                println!("  {} {}", "Exported".dimmed(), path.display());
            }
        }
        sequence.combined
    } else {
        dispatcher.run(&suites, &options).await
    };

    print_summary(&run);
    write_reports(&args, config, &run)?;

    Ok(run.is_passed())
}

fn export_dir(args: &RunArgs, config: &HarnessConfig) -> PathBuf {
    args.export_dir
        .clone()
        .or_else(|| config.export_dir())
        .unwrap_or_else(|| config.reports_dir().join("modules"))
}

fn write_reports(args: &RunArgs, config: &HarnessConfig, run: &TestRunResult) -> Result<()> {
    if args.reports || config.reports.enabled {
        let written = report::write_all(run, &config.reports_dir(), &config.reports.formats)?;
        for path in written {
            println!("{} {}", "Report:".blue(), path.display());
        }
    }
    if let Some(path) = &args.json {
        report::json::write(run, path)?;
        println!("{} {}", "JSON report:".blue(), path.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct SuiteListing {
    name: String,
    level: TestLevel,
    description: Option<String>,
    cases: usize,
    file: String,
}

fn list(config: &HarnessConfig, level: Option<TestLevel>, json: bool) -> Result<bool> {
    let suites = testing::discover(&config.suites_dir())?;
    let listing: Vec<SuiteListing> = testing::select(&suites, None, level)
        .into_iter()
        .map(|suite| SuiteListing {
            name: suite.name.clone(),
            level: suite.level,
            description: suite.description.clone(),
            cases: suite.cases.len(),
            file: suite.source.display().to_string(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(true);
    }

    if listing.is_empty() {
        println!("No test suites found in {}", config.suites_dir().display());
        return Ok(true);
    }

    println!("Test suites:");
    for suite in &listing {
        println!(
            "  {:<24} {:<12} {:>3} cases  {}",
            suite.name,
            suite.level.to_string(),
            suite.cases,
            suite.description.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(true)
}

async fn check(config: &HarnessConfig) -> Result<bool> {
    let transport = HttpTransport::resolve(&config.api).await?;
    match transport.probe(&config.api.health_path).await {
        Ok(status) if (200..300).contains(&status) => {
            println!(
                "{} {} is healthy (HTTP {})",
                "✓".green(),
                transport.base_url(),
                status
            );
            Ok(true)
        }
        Ok(status) => {
            println!(
                "{} {} answered HTTP {}",
                "✗".red(),
                transport.base_url(),
                status
            );
            Ok(false)
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Ok(false)
        }
    }
}

async fn discover(config: &HarnessConfig, category: Option<String>, json: bool) -> Result<bool> {
    let transport = HttpTransport::resolve(&config.api).await?;
    let endpoints = discovery::discover_endpoints(&transport, &config.api.openapi_path).await?;

    let validations: Vec<EndpointValidation> = match &category {
        Some(name) => {
            let expected = config.expected_endpoints.get(name).ok_or_else(|| {
                Error::Config(format!("No expected_endpoints category '{}'", name))
            })?;
            vec![discovery::validate(name, expected, &endpoints)]
        }
        None => config
            .expected_endpoints
            .iter()
            .map(|(name, expected)| discovery::validate(name, expected, &endpoints))
            .collect(),
    };

    if json {
        let doc = serde_json::json!({
            "base_url": transport.base_url(),
            "total_endpoints": endpoints.len(),
            "endpoints": &endpoints,
            "validations": &validations,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        if category.is_none() {
            println!("Discovered {} endpoints:", endpoints.len());
            for endpoint in &endpoints {
                println!("  {}", endpoint);
            }
        }
        for validation in &validations {
            print_validation(validation);
        }
    }

    Ok(validations.iter().all(EndpointValidation::is_complete))
}

fn print_validation(validation: &EndpointValidation) {
    println!(
        "\n{} {}: {}/{} expected endpoints present",
        "Category".blue().bold(),
        validation.category.white().bold(),
        validation.matching.len(),
        validation.expected_count
    );
    for endpoint in &validation.missing {
        println!("  {} {}", "missing".red(), endpoint);
    }
}
