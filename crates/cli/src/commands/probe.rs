//! Probe Command
//!
//! Logs in every configured identity and runs the permission matrix.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use storecheck_harness::readiness::wait_until_reachable;
use storecheck_harness::report::summary_line;
use storecheck_harness::{
    ConsoleObserver, HarnessConfig, MatrixRunner, NoopObserver, ProbeMatrix, ProbeOutcome,
};

use crate::output::{
    print_document, print_error, print_info, print_success, print_warning, OutputFormat,
};

#[derive(Args, Clone)]
pub struct ProbeArgs {
    /// Matrix YAML file or directory (defaults to the built-in store matrix)
    #[arg(short, long)]
    pub matrix: Option<PathBuf>,

    /// Only run groups whose title contains this text
    #[arg(short, long)]
    pub group: Option<String>,

    /// Wait up to this many seconds for the API to accept connections
    #[arg(long)]
    pub wait: Option<u64>,

    /// Write permission-results.json to the output directory
    #[arg(long)]
    pub report: bool,

    /// Output directory (overrides the configured one)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn load_matrix(path: Option<&PathBuf>) -> Result<ProbeMatrix> {
    match path {
        Some(path) => ProbeMatrix::load(path)
            .with_context(|| format!("loading matrix from {}", path.display())),
        None => Ok(ProbeMatrix::store_default()),
    }
}

/// Returns whether every executed probe matched its expectation
pub async fn execute(args: ProbeArgs, mut config: HarnessConfig, format: OutputFormat) -> Result<bool> {
    let mut matrix = load_matrix(args.matrix.as_ref())?;
    if let Some(filter) = &args.group {
        matrix = matrix.filter_groups(filter);
        if matrix.groups.is_empty() {
            print_warning(&format!("No groups match '{}'", filter));
            return Ok(true);
        }
    }

    if let Some(output) = args.output {
        config.output_dir = output;
    }

    if let Some(secs) = args.wait {
        wait_until_reachable(&config.base_url, Duration::from_secs(secs)).await?;
    }

    let runner = MatrixRunner::new(config)?;

    let report = if format.is_structured() {
        let report = runner.run(&matrix, &mut NoopObserver).await;
        print_document(&report, format);
        report
    } else {
        print_info(&format!("Probing {}", runner.config().base_url));
        println!("Logging in users...");
        let mut observer = ConsoleObserver::new(std::io::stdout());
        runner.run(&matrix, &mut observer).await
    };

    if args.report {
        runner.write_results(&report)?;
    }

    if !format.is_structured() {
        println!();
        let line = summary_line(&report.summary, report.duration_ms);
        if report.success() {
            print_success(&line);
        } else {
            print_error(&line);
        }
        if report.summary.skipped > 0 {
            let missing: BTreeSet<&str> = report
                .results()
                .filter_map(|r| match &r.outcome {
                    ProbeOutcome::Skipped { identity } => Some(identity.as_str()),
                    _ => None,
                })
                .collect();
            let missing: Vec<&str> = missing.into_iter().collect();
            print_warning(&format!(
                "{} probe(s) skipped; identities not logged in: {}",
                report.summary.skipped,
                missing.join(", ")
            ));
        }
    }

    Ok(report.success())
}
