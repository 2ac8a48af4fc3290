//! Console rendering of logins and probe results

use std::io::Write;

use crate::auth::{LoginAttempt, LoginFailure, LoginOutcome};
use crate::probe::{ProbeOutcome, ProbeResult};
use crate::runner::RunSummary;

pub const PASS_MARKER: &str = "✅";
pub const FAIL_MARKER: &str = "❌";
pub const SKIP_MARKER: &str = "⚠️";
pub const UNSUPPORTED_MARKER: &str = "❓";

/// Receives progress while a run is in flight
pub trait RunObserver {
    fn on_login(&mut self, _attempt: &LoginAttempt) {}
    fn on_group(&mut self, _title: &str) {}
    fn on_probe(&mut self, _result: &ProbeResult) {}
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// One line per login attempt
pub fn login_line(attempt: &LoginAttempt) -> String {
    match &attempt.outcome {
        LoginOutcome::LoggedIn { .. } => format!("{} Logged in {}", PASS_MARKER, attempt.identity),
        LoginOutcome::Failed {
            failure: LoginFailure::Transport { detail },
        } => format!(
            "{} Exception logging in {}: {}",
            FAIL_MARKER, attempt.identity, detail
        ),
        LoginOutcome::Failed { failure } => format!(
            "{} Failed to login {}: {}",
            FAIL_MARKER, attempt.identity, failure
        ),
    }
}

pub fn group_line(title: &str) -> String {
    format!("\n--- {} ---", title)
}

/// Lines for one probe; mismatches add the raw response body
pub fn probe_lines(result: &ProbeResult) -> Vec<String> {
    let probe = &result.probe;
    match &result.outcome {
        ProbeOutcome::Passed { actual } | ProbeOutcome::Mismatch { actual, .. } => {
            let marker = if result.outcome.is_pass() {
                PASS_MARKER
            } else {
                FAIL_MARKER
            };
            let mut lines = vec![format!(
                "{} [{}] {} | User: {} | Expected: {} | Actual: {}",
                marker,
                probe.method,
                probe.path,
                probe.identity_label(),
                probe.expected_status,
                actual
            )];
            if let ProbeOutcome::Mismatch { body, .. } = &result.outcome {
                lines.push(format!("   Response: {}", body));
            }
            lines
        }
        ProbeOutcome::Skipped { identity } => vec![format!(
            "{} User {} not logged in, skipping test for {}",
            SKIP_MARKER, identity, probe.path
        )],
        ProbeOutcome::Unsupported { method } => vec![format!(
            "{} Unsupported method {} for {}, not executed",
            UNSUPPORTED_MARKER, method, probe.path
        )],
        ProbeOutcome::TransportError { detail } => vec![format!(
            "{} Exception testing {}: {}",
            FAIL_MARKER, probe.path, detail
        )],
    }
}

pub fn summary_line(summary: &RunSummary, duration_ms: u64) -> String {
    format!(
        "Results: {} passed, {} failed, {} skipped, {} unsupported ({} total, {} ms)",
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.unsupported,
        summary.total,
        duration_ms
    )
}

/// Streams console lines to a writer as the run progresses
pub struct ConsoleObserver<W: Write> {
    out: W,
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        // A closed stdout is ignored.
        let _ = writeln!(self.out, "{}", line);
    }
}

impl<W: Write> RunObserver for ConsoleObserver<W> {
    fn on_login(&mut self, attempt: &LoginAttempt) {
        self.emit(&login_line(attempt));
    }

    fn on_group(&mut self, title: &str) {
        self.emit(&group_line(title));
    }

    fn on_probe(&mut self, result: &ProbeResult) {
        for line in probe_lines(result) {
            self.emit(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Probe;

    fn result(probe: Probe, outcome: ProbeOutcome) -> ProbeResult {
        ProbeResult {
            probe,
            outcome,
            duration_ms: 3,
        }
    }

    #[test]
    fn test_pass_line() {
        let r = result(
            Probe::new("GET", "/users", Some("admin"), 200),
            ProbeOutcome::Passed { actual: 200 },
        );
        assert_eq!(
            probe_lines(&r),
            vec!["✅ [GET] /users | User: admin | Expected: 200 | Actual: 200"]
        );
    }

    #[test]
    fn test_mismatch_lines_include_body() {
        let r = result(
            Probe::new("GET", "/users", None, 401),
            ProbeOutcome::Mismatch {
                actual: 200,
                body: "[{\"id\":1}]".to_string(),
            },
        );
        let lines = probe_lines(&r);
        assert_eq!(lines[0], "❌ [GET] /users | User: Unauth | Expected: 401 | Actual: 200");
        assert_eq!(lines[1], "   Response: [{\"id\":1}]");
    }

    #[test]
    fn test_skip_line_is_distinct_from_status_lines() {
        let r = result(
            Probe::new("GET", "/admin/roles", Some("super_admin"), 200),
            ProbeOutcome::Skipped {
                identity: "super_admin".to_string(),
            },
        );
        let lines = probe_lines(&r);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(SKIP_MARKER));
        assert!(!lines[0].contains("Actual"));
    }

    #[test]
    fn test_login_lines() {
        let ok = LoginAttempt {
            identity: "admin".to_string(),
            role: "ADMIN".to_string(),
            outcome: LoginOutcome::LoggedIn {
                strategy: "data.token".to_string(),
            },
        };
        assert_eq!(login_line(&ok), "✅ Logged in admin");

        let rejected = LoginAttempt {
            identity: "super_admin".to_string(),
            role: "SUPER_ADMIN".to_string(),
            outcome: LoginOutcome::Failed {
                failure: LoginFailure::Rejected {
                    status: 401,
                    body: "bad".to_string(),
                },
            },
        };
        assert_eq!(login_line(&rejected), "❌ Failed to login super_admin: 401 - bad");
    }

    #[test]
    fn test_console_observer_streams_lines() {
        let mut observer = ConsoleObserver::new(Vec::new());
        observer.on_group("Orders");
        observer.on_probe(&result(
            Probe::new("TRACE", "/orders/last", None, 401),
            ProbeOutcome::Unsupported {
                method: "TRACE".to_string(),
            },
        ));
        let output = String::from_utf8(observer.into_inner()).unwrap();
        assert_eq!(
            output,
            "\n--- Orders ---\n❓ Unsupported method TRACE for /orders/last, not executed\n"
        );
    }
}
