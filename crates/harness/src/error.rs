//! Error types for the verification harness
//!
//! Only setup failures live here. Per-probe and per-login problems are
//! ordinary outcomes (see [`crate::probe::ProbeOutcome`] and
//! [`crate::auth::LoginFailure`]) and never surface as errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Matrix parse error: {0}")]
    MatrixParse(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("API not reachable at {url} after {attempts} attempts")]
    ApiUnreachable { url: String, attempts: usize },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Screenshot not found: {}", .0.display())]
    ScreenshotNotFound(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
