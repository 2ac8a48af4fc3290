//! storecheck CLI - Main Entry Point
//!
//! Verifies a store API's role-based permissions and the front end's
//! error rendering.
//!
//! Exit codes: 0 when every check passed, 1 when any check failed,
//! 2 when the run could not be set up.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use storecheck_harness::HarnessConfig;

mod commands;
mod output;

use commands::{error_ui, matrix, probe};
use output::{print_error, print_info};

/// storecheck - Role-based API permission checks
#[derive(Parser)]
#[command(name = "storecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "storecheck.toml", global = true)]
    config: PathBuf,

    /// Store API base URL (overrides the configuration file)
    #[arg(long, env = "STORECHECK_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Front-end URL (overrides the configuration file)
    #[arg(long, env = "STORECHECK_FRONTEND_URL", global = true)]
    frontend_url: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in every identity and run the permission matrix
    Probe(probe::ProbeArgs),

    /// List the probes of a matrix without running them
    Matrix(matrix::MatrixArgs),

    /// Check the front end's error state against stubbed API failures
    ErrorUi(error_ui::ErrorUiArgs),

    /// Show version information
    Version,
}

fn load_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::load(&cli.config)?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(url) = &cli.frontend_url {
        config.frontend_url = url.clone();
    }
    config.validate()?;
    tracing::debug!(path = %cli.config.display(), "configuration loaded");
    if cli.verbose {
        print_info(&format!(
            "API {} | front end {} | identities: {}",
            config.base_url,
            config.frontend_url,
            config.identity_names().join(", ")
        ));
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let passed = match cli.command {
        Commands::Probe(ref args) => {
            let config = load_config(&cli)?;
            probe::execute(args.clone(), config, cli.format).await?
        }
        Commands::Matrix(ref args) => {
            matrix::execute(args.clone(), cli.format)?;
            true
        }
        Commands::ErrorUi(ref args) => {
            let config = load_config(&cli)?;
            error_ui::execute(args.clone(), config, cli.format).await?
        }
        Commands::Version => {
            println!("storecheck v{}", env!("CARGO_PKG_VERSION"));
            println!("Role-based permission checks for the store API");
            true
        }
    };
    Ok(passed)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;
    if let Err(e) = &result {
        print_error(&format!("{:#}", e));
    }
    ExitCode::from(exit_status(&result))
}

/// 0 when every check passed, 1 when any failed, 2 when the run could not start
fn exit_status(result: &anyhow::Result<bool>) -> u8 {
    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}
