//! Probe declarations and the executor that runs them

use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::SessionTokens;
use crate::config::join_url;

/// HTTP methods a probe may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Whether a declared payload is sent as the JSON body
    pub fn sends_payload(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(format!("Unsupported method {}", s)),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared (method, path, identity, expected-status) test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    /// Declared method; parsed when the probe runs
    pub method: String,

    /// Path relative to the API base URL
    pub path: String,

    /// Identity whose token is presented; `None` means unauthenticated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Status the authorization policy should produce
    pub expected_status: u16,

    /// JSON body for POST/PUT/PATCH
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Probe {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        identity: Option<&str>,
        expected_status: u16,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            identity: identity.map(str::to_owned),
            expected_status,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Identity label used in console output
    pub fn identity_label(&self) -> &str {
        self.identity.as_deref().unwrap_or("Unauth")
    }
}

/// Classification of one executed probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Actual status equals the expected status
    Passed { actual: u16 },

    /// Actual status differs; the body is kept for triage
    Mismatch { actual: u16, body: String },

    /// Identity did not log in, no request was sent
    Skipped { identity: String },

    /// Declared method is not one of GET/POST/PUT/DELETE/PATCH
    Unsupported { method: String },

    /// Request failed below HTTP (connect, timeout, body read)
    TransportError { detail: String },
}

impl ProbeOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ProbeOutcome::Passed { .. })
    }

    /// Mismatches and transport errors both count as failures
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProbeOutcome::Mismatch { .. } | ProbeOutcome::TransportError { .. }
        )
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ProbeOutcome::Skipped { .. })
    }

    /// Status code observed on the wire, if a response arrived
    pub fn actual_status(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Passed { actual } | ProbeOutcome::Mismatch { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Short classification name used in reports and tables
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Passed { .. } => "pass",
            ProbeOutcome::Mismatch { .. } => "fail",
            ProbeOutcome::Skipped { .. } => "skip",
            ProbeOutcome::Unsupported { .. } => "unsupported",
            ProbeOutcome::TransportError { .. } => "error",
        }
    }
}

/// Outcome of executing one probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe: Probe,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
    pub duration_ms: u64,
}

/// Runs probes against the resource API, one request at a time
pub struct ProbeExecutor<'a> {
    client: &'a reqwest::Client,
    base_url: &'a str,
    tokens: &'a SessionTokens,
}

impl<'a> ProbeExecutor<'a> {
    pub fn new(client: &'a reqwest::Client, base_url: &'a str, tokens: &'a SessionTokens) -> Self {
        Self {
            client,
            base_url,
            tokens,
        }
    }

    /// Execute a probe and classify the response
    pub async fn execute(&self, probe: &Probe) -> ProbeResult {
        let start = Instant::now();
        let outcome = self.classify(probe).await;

        ProbeResult {
            probe: probe.clone(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn classify(&self, probe: &Probe) -> ProbeOutcome {
        let token = match &probe.identity {
            Some(name) => match self.tokens.get(name) {
                Some(token) => Some(token),
                None => {
                    warn!("User {} not logged in, skipping test for {}", name, probe.path);
                    return ProbeOutcome::Skipped {
                        identity: name.clone(),
                    };
                }
            },
            None => None,
        };

        let method = match probe.method.parse::<HttpMethod>() {
            Ok(method) => method,
            Err(reason) => {
                error!("{}", reason);
                return ProbeOutcome::Unsupported {
                    method: probe.method.clone(),
                };
            }
        };

        let url = join_url(self.base_url, &probe.path);
        debug!("{} {} as {}", method, url, probe.identity_label());

        let mut request = self.client.request(method.to_reqwest(), &url);
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, token.bearer());
        }
        if method.sends_payload() {
            if let Some(payload) = &probe.payload {
                request = request.json(payload);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Exception testing {}: {}", probe.path, e);
                return ProbeOutcome::TransportError {
                    detail: e.to_string(),
                };
            }
        };

        let actual = response.status().as_u16();
        if actual == probe.expected_status {
            return ProbeOutcome::Passed { actual };
        }

        match response.text().await {
            Ok(body) => ProbeOutcome::Mismatch { actual, body },
            Err(e) => ProbeOutcome::TransportError {
                detail: format!("status {} but body unreadable: {}", actual, e),
            },
        }
    }
}
