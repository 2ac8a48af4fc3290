//! Error-UI Command
//!
//! Stubs API routes in a headless browser and checks that the front end
//! renders its error state.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use storecheck_harness::error_ui::{write_error_ui_results, ErrorUiRunner};
use storecheck_harness::playwright::{Browser, PlaywrightConfig};
use storecheck_harness::readiness::wait_until_reachable;
use storecheck_harness::visual::{VisualConfig, VisualVerdict};
use storecheck_harness::{ErrorUiScenario, HarnessConfig};

use crate::output::{print_document, print_error, print_info, print_success, OutputFormat};

#[derive(Args, Clone)]
pub struct ErrorUiArgs {
    /// Scenario YAML file or directory (defaults to the built-in home-error scenario)
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Record screenshots as baselines instead of only comparing
    #[arg(long)]
    pub update_baselines: bool,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    pub browser: Browser,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Wait up to this many seconds for the front end to accept connections
    #[arg(long)]
    pub wait: Option<u64>,

    /// Output directory (overrides the configured one)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn select_scenarios(args: &ErrorUiArgs) -> Result<Vec<ErrorUiScenario>> {
    let mut scenarios = match &args.scenarios {
        Some(path) => ErrorUiScenario::load_all(path)
            .with_context(|| format!("loading scenarios from {}", path.display()))?,
        None => vec![ErrorUiScenario::home_error()],
    };

    if let Some(tag) = &args.tag {
        scenarios = ErrorUiScenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
    }
    if let Some(name) = &args.name {
        scenarios.retain(|s| &s.name == name);
        if scenarios.is_empty() {
            bail!("Scenario not found: {}", name);
        }
    }
    Ok(scenarios)
}

fn describe_visual(verdict: &VisualVerdict) -> String {
    match verdict {
        VisualVerdict::Identical => "identical to baseline".to_string(),
        VisualVerdict::WithinThreshold { diff_percent } => {
            format!("{:.2}% pixels differ, within threshold", diff_percent)
        }
        VisualVerdict::Regressed { diff_percent, .. } => {
            format!("{:.2}% pixels differ", diff_percent)
        }
        VisualVerdict::NoBaseline => "no baseline recorded".to_string(),
        VisualVerdict::BaselineCreated => "baseline created".to_string(),
    }
}

/// Returns whether every scenario passed
pub async fn execute(args: ErrorUiArgs, config: HarnessConfig, format: OutputFormat) -> Result<bool> {
    let scenarios = select_scenarios(&args)?;
    if scenarios.is_empty() {
        print_info("No scenarios selected");
        return Ok(true);
    }

    if let Some(secs) = args.wait {
        wait_until_reachable(&config.frontend_url, Duration::from_secs(secs)).await?;
    }

    let output_dir = args.output.unwrap_or(config.output_dir);
    let runner = ErrorUiRunner::new(
        PlaywrightConfig {
            base_url: config.frontend_url,
            screenshot_dir: output_dir.join("screenshots"),
            browser: args.browser,
            headless: !args.headed,
            ..Default::default()
        },
        VisualConfig {
            baseline_dir: output_dir.join("baselines"),
            diff_dir: output_dir.join("diffs"),
            update_baselines: args.update_baselines,
        },
    )?;

    let suite = runner.run_all(&scenarios).await;

    if args.update_baselines {
        runner.update_baselines(&suite)?;
    }
    write_error_ui_results(&output_dir, &suite)?;

    if format.is_structured() {
        print_document(&suite, format);
    } else {
        for result in &suite.results {
            let visual = result
                .visual
                .as_ref()
                .map(|v| format!(" | {}", describe_visual(v)))
                .unwrap_or_default();
            let line = format!(
                "{} | error elements: {}{}",
                result.scenario, result.observed_count, visual
            );
            if result.success {
                print_success(&line);
            } else {
                print_error(&format!(
                    "{} | {}",
                    line,
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        println!();
        println!(
            "Scenarios: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
    }

    Ok(suite.failed == 0)
}
