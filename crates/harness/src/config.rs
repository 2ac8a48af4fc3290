//! Harness configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};
use crate::identity::Identity;

/// Base URL of the store API when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5300/api";

/// Base URL of the store front end
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Common base path of the REST API (login and resources)
    pub base_url: String,

    /// Front-end URL used by error-UI scenarios
    pub frontend_url: String,

    /// Per-request timeout; the HTTP client default applies when unset
    pub request_timeout_secs: Option<u64>,

    /// Directory for JSON reports, screenshots and baselines
    pub output_dir: PathBuf,

    /// Identities logged in before probing, in declaration order
    pub identities: Vec<Identity>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            request_timeout_secs: None,
            output_dir: PathBuf::from("test-results"),
            identities: Identity::store_defaults(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> HarnessResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject configurations that would make the token mapping ambiguous
    pub fn validate(&self) -> HarnessResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("base_url is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for identity in &self.identities {
            if identity.name.is_empty() {
                return Err(HarnessError::InvalidConfig(
                    "identity with empty name".to_string(),
                ));
            }
            if !seen.insert(identity.name.as_str()) {
                return Err(HarnessError::InvalidConfig(format!(
                    "duplicate identity name: {}",
                    identity.name
                )));
            }
        }
        Ok(())
    }

    /// Build the HTTP client shared by the authenticator and executor
    pub fn http_client(&self) -> HarnessResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }

    /// Declared names of all identities
    pub fn identity_names(&self) -> Vec<&str> {
        self.identities.iter().map(|i| i.name.as_str()).collect()
    }
}

/// Join a base URL and an API path without doubling slashes
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
