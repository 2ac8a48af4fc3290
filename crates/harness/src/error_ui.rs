//! Error-UI runner: drives Playwright scenarios and checks their screenshots

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::HarnessResult;
use crate::playwright::{PlaywrightConfig, PlaywrightHandle, ScriptOutcome};
use crate::scenario::ErrorUiScenario;
use crate::visual::{BaselineStore, VisualConfig, VisualVerdict};

/// File name of the JSON report inside the output directory
pub const ERROR_UI_RESULTS_FILE: &str = "error-ui-results.json";

/// Result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorUiResult {
    pub scenario: String,
    pub success: bool,
    pub observed_count: usize,
    pub screenshot_path: Option<PathBuf>,
    pub visual: Option<VisualVerdict>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ErrorUiResult {
    /// Combine what the browser saw with the baseline verdict
    pub fn judge(
        scenario: &str,
        outcome: ScriptOutcome,
        visual: Option<VisualVerdict>,
        duration_ms: u64,
    ) -> Self {
        let error = if !outcome.success {
            Some(outcome.error.unwrap_or_else(|| "error UI check failed".to_string()))
        } else {
            match &visual {
                Some(VisualVerdict::Regressed { diff_percent, .. }) => Some(format!(
                    "Visual regression in '{}': {:.2}% pixels differ",
                    scenario, diff_percent
                )),
                _ => None,
            }
        };

        Self {
            scenario: scenario.to_string(),
            success: error.is_none(),
            observed_count: outcome.observed_count,
            screenshot_path: outcome.screenshot,
            visual,
            error,
            duration_ms,
        }
    }

    fn driver_failure(scenario: &str, detail: String, duration_ms: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            success: false,
            observed_count: 0,
            screenshot_path: None,
            visual: None,
            error: Some(detail),
            duration_ms,
        }
    }
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorUiSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ErrorUiResult>,
}

/// Runs error-UI scenarios one after another
pub struct ErrorUiRunner {
    playwright: PlaywrightHandle,
    baselines: BaselineStore,
}

impl ErrorUiRunner {
    pub fn new(playwright: PlaywrightConfig, visual: VisualConfig) -> HarnessResult<Self> {
        Ok(Self {
            playwright: PlaywrightHandle::new(playwright)?,
            baselines: BaselineStore::new(visual)?,
        })
    }

    pub async fn run_all(&self, scenarios: &[ErrorUiScenario]) -> ErrorUiSuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());

        info!("Running {} error-UI scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = self.run(scenario).await;
            if result.success {
                info!("✓ {} ({} ms)", result.scenario, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.scenario,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        ErrorUiSuiteResult {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms: start.elapsed().as_millis() as u64,
            results,
        }
    }

    /// Run one scenario; driver failures become a failed result
    pub async fn run(&self, scenario: &ErrorUiScenario) -> ErrorUiResult {
        let start = Instant::now();

        let outcome = match self.playwright.run_scenario(scenario).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return ErrorUiResult::driver_failure(
                    &scenario.name,
                    e.to_string(),
                    start.elapsed().as_millis() as u64,
                )
            }
        };

        let visual = match (&scenario.screenshot, &outcome.screenshot) {
            (Some(name), Some(path)) if outcome.success => {
                match self.baselines.check(name, path, scenario.visual_threshold) {
                    Ok(verdict) => Some(verdict),
                    Err(e) => {
                        return ErrorUiResult::driver_failure(
                            &scenario.name,
                            format!("Visual comparison error: {}", e),
                            start.elapsed().as_millis() as u64,
                        )
                    }
                }
            }
            _ => None,
        };

        ErrorUiResult::judge(
            &scenario.name,
            outcome,
            visual,
            start.elapsed().as_millis() as u64,
        )
    }

    /// Promote every screenshot of a run to its baseline
    pub fn update_baselines(&self, suite: &ErrorUiSuiteResult) -> HarnessResult<()> {
        for result in &suite.results {
            if let Some(path) = &result.screenshot_path {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| result.scenario.clone());
                self.baselines.promote(&name, path)?;
            }
        }
        Ok(())
    }
}

/// Write scenario results as JSON into `output_dir`
pub fn write_error_ui_results(output_dir: &Path, suite: &ErrorUiSuiteResult) -> HarnessResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join(ERROR_UI_RESULTS_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(suite)?)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, error: Option<&str>) -> ScriptOutcome {
        ScriptOutcome {
            success,
            observed_count: 3,
            screenshot: Some(PathBuf::from("shots/home-error.png")),
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_browser_failure_wins() {
        let result = ErrorUiResult::judge(
            "home-error",
            outcome(false, Some("expected 3 error element(s), found 2")),
            None,
            10,
        );
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("expected 3 error element(s), found 2"));
    }

    #[test]
    fn test_visual_regression_fails_scenario() {
        let result = ErrorUiResult::judge(
            "home-error",
            outcome(true, None),
            Some(VisualVerdict::Regressed {
                diff_percent: 4.2,
                diff_image: None,
            }),
            10,
        );
        assert!(!result.success);
        assert!(result.error.unwrap().contains("4.20%"));
    }

    #[test]
    fn test_missing_baseline_does_not_fail() {
        let result = ErrorUiResult::judge(
            "home-error",
            outcome(true, None),
            Some(VisualVerdict::NoBaseline),
            10,
        );
        assert!(result.success);
        assert_eq!(result.observed_count, 3);
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let suite = ErrorUiSuiteResult {
            total: 1,
            passed: 1,
            failed: 0,
            duration_ms: 12,
            results: vec![ErrorUiResult::judge("home-error", outcome(true, None), None, 12)],
        };
        let path = write_error_ui_results(dir.path(), &suite).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["results"][0]["scenario"], "home-error");
    }
}
