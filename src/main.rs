//! Automatos AI API test harness
//!
//! Runs declarative YAML test suites against the platform's HTTP API and
//! writes JSON, markdown, JUnit and HTML reports of the outcome.

use clap::Parser;
use harness::commands::{Commands, GlobalArgs};
use harness::cli;
use harness::common::{logging, paths};

#[derive(Parser)]
#[command(name = "harness", about = "Black-box API test harness for the Automatos AI platform")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (config, environment) = match cli::load_config(&cli.global) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log_dir = config.log_dir().or_else(paths::log_dir);
    let guard = logging::init_cli(cli.global.verbose, log_dir.as_deref());
    if let Some(file) = guard.log_file.as_ref().filter(|_| cli.global.verbose) {
        eprintln!("Logging to {}", file.display());
    }
    match &config.source {
        Some(path) => tracing::debug!(
            path = %path.display(),
            %environment,
            base_url = %config.api.base_url,
            "loaded configuration"
        ),
        None => tracing::debug!(%environment, "no configuration file found, using defaults"),
    }

    let result = cli::dispatch(cli.command, &config, environment, cli.global.verbose).await;

    // Flush the file log before exiting
    drop(guard);

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
