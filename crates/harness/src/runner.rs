//! Matrix runner: log in every identity, then run every probe in order

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::{Authenticator, LoginAttempt, SessionTokens};
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::matrix::ProbeMatrix;
use crate::probe::{ProbeExecutor, ProbeOutcome, ProbeResult};
use crate::report::RunObserver;

/// File name of the JSON report inside the output directory
pub const RESULTS_FILE: &str = "permission-results.json";

/// Counts per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unsupported: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.total += 1;
        match outcome {
            ProbeOutcome::Passed { .. } => self.passed += 1,
            ProbeOutcome::Mismatch { .. } | ProbeOutcome::TransportError { .. } => {
                self.failed += 1
            }
            ProbeOutcome::Skipped { .. } => self.skipped += 1,
            ProbeOutcome::Unsupported { .. } => self.unsupported += 1,
        }
    }
}

/// Results of one resource area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub title: String,
    pub results: Vec<ProbeResult>,
}

/// Everything a run observed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub matrix: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub logins: Vec<LoginAttempt>,
    pub groups: Vec<GroupReport>,
    pub summary: RunSummary,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn results(&self) -> impl Iterator<Item = &ProbeResult> {
        self.groups.iter().flat_map(|g| g.results.iter())
    }

    /// Classification label of every probe, in declaration order
    pub fn classifications(&self) -> Vec<&'static str> {
        self.results().map(|r| r.outcome.label()).collect()
    }

    /// No probe mismatched or hit a transport error
    pub fn success(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Drives the authenticator and the probe executor
pub struct MatrixRunner {
    config: HarnessConfig,
    client: reqwest::Client,
}

impl MatrixRunner {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Authenticate once, then run every probe of the matrix
    pub async fn run(&self, matrix: &ProbeMatrix, observer: &mut dyn RunObserver) -> RunReport {
        let start = Instant::now();
        let started_at = Utc::now();

        let undeclared = matrix.undeclared_identities(&self.config.identity_names());
        if !undeclared.is_empty() {
            warn!(
                "Matrix references undeclared identities {:?}; their probes will be skipped",
                undeclared
            );
        }

        let authenticator = Authenticator::new(self.client.clone(), &self.config.base_url);
        let auth = authenticator
            .authenticate_all(&self.config.identities, observer)
            .await;

        let (groups, summary) = self.run_probes(matrix, &auth.tokens, observer).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Results: {} passed, {} failed, {} skipped, {} unsupported ({} ms)",
            summary.passed, summary.failed, summary.skipped, summary.unsupported, duration_ms
        );

        RunReport {
            matrix: matrix.name.clone(),
            base_url: self.config.base_url.clone(),
            started_at,
            logins: auth.attempts,
            groups,
            summary,
            duration_ms,
        }
    }

    /// Run every probe against an existing token mapping
    pub async fn run_probes(
        &self,
        matrix: &ProbeMatrix,
        tokens: &SessionTokens,
        observer: &mut dyn RunObserver,
    ) -> (Vec<GroupReport>, RunSummary) {
        let executor = ProbeExecutor::new(&self.client, &self.config.base_url, tokens);
        let mut summary = RunSummary::default();
        let mut groups = Vec::with_capacity(matrix.groups.len());

        info!("Running {} probe(s)...", matrix.probe_count());

        for group in &matrix.groups {
            observer.on_group(&group.title);
            let mut results = Vec::with_capacity(group.probes.len());

            for probe in &group.probes {
                let result = executor.execute(probe).await;
                if result.outcome.is_failure() {
                    error!(
                        "✗ [{}] {} as {} - {}",
                        probe.method,
                        probe.path,
                        probe.identity_label(),
                        result.outcome.label()
                    );
                }
                summary.record(&result.outcome);
                observer.on_probe(&result);
                results.push(result);
            }

            groups.push(GroupReport {
                title: group.title.clone(),
                results,
            });
        }

        (groups, summary)
    }

    /// Write the report as JSON into the output directory
    pub fn write_results(&self, report: &RunReport) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join(RESULTS_FILE);
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
