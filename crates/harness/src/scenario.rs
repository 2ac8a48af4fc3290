//! Declarative error-UI scenarios
//!
//! A scenario stubs one or more API routes with a failure response, opens a
//! page and expects the front end to render its error state.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HarnessError, HarnessResult};

/// A complete error-UI scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorUiScenario {
    /// Unique name, also the default screenshot name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Page to open, relative to the front-end base URL
    pub url: String,

    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Interception rules installed before navigation
    pub route_stubs: Vec<RouteStub>,

    /// What the error state must look like
    pub expect: ErrorExpectation,

    /// Screenshot name; no screenshot is taken when unset
    #[serde(default)]
    pub screenshot: Option<String>,

    /// How long to wait for the error element
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Allowed pixel difference against the baseline (0.0 - 100.0 percent)
    #[serde(default = "default_threshold")]
    pub visual_threshold: f64,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Answer every request matching `pattern` with a canned response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStub {
    /// Playwright glob, e.g. `**/api/public/stores`
    pub pattern: String,

    #[serde(default = "default_stub_status")]
    pub status: u16,

    #[serde(default = "default_stub_body")]
    pub body: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_stub_status() -> u16 {
    500
}

fn default_stub_body() -> String {
    r#"{"message": "Internal Server Error"}"#.to_string()
}

fn default_content_type() -> String {
    "application/json".to_string()
}

impl RouteStub {
    /// 500 with the store's generic error body
    pub fn server_error(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            status: default_stub_status(),
            body: default_stub_body(),
            content_type: default_content_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorExpectation {
    /// Text identifying an error element
    pub text: String,

    /// Exact number of error elements, when it matters
    #[serde(default)]
    pub count: Option<usize>,

    /// Additional text that must be visible somewhere on the page
    #[serde(default)]
    pub visible_text: Option<String>,
}

impl ErrorUiScenario {
    /// Home page with stores, articles and products all failing
    pub fn home_error() -> Self {
        Self {
            name: "home-error".to_string(),
            description: "Home page shows an error card for every failed section".to_string(),
            tags: vec!["home".to_string(), "error".to_string()],
            url: "/".to_string(),
            viewport: default_viewport(),
            route_stubs: vec![
                RouteStub::server_error("**/api/public/stores"),
                RouteStub::server_error("**/api/public/articles"),
                RouteStub::server_error("**/api/shop/products*"),
            ],
            expect: ErrorExpectation {
                text: "We encountered a problem".to_string(),
                count: Some(3),
                visible_text: Some("Our team is working on solving it".to_string()),
            },
            screenshot: Some("home-error".to_string()),
            timeout_ms: default_timeout_ms(),
            visual_threshold: default_threshold(),
        }
    }

    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| HarnessError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load one file, or every YAML scenario below a directory
    pub fn load_all(path: &Path) -> HarnessResult<Vec<Self>> {
        if path.is_file() {
            return Ok(vec![Self::from_file(path)?]);
        }
        if !path.is_dir() {
            return Err(HarnessError::ScenarioParse(format!(
                "no such scenario file or directory: {}",
                path.display()
            )));
        }

        let mut files: Vec<_> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(HarnessError::ScenarioParse(format!(
                "no scenario files found in {}",
                path.display()
            )));
        }

        files.iter().map(|f| Self::from_file(f)).collect()
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    fn validate(&self) -> HarnessResult<()> {
        if self.route_stubs.is_empty() {
            return Err(HarnessError::ScenarioParse(format!(
                "{}: at least one route stub is required to force the error state",
                self.name
            )));
        }
        if self.expect.text.trim().is_empty() {
            return Err(HarnessError::ScenarioParse(format!(
                "{}: expect.text is empty",
                self.name
            )));
        }
        if self.expect.count == Some(0) {
            return Err(HarnessError::ScenarioParse(format!(
                "{}: expect.count must be at least 1",
                self.name
            )));
        }
        if let Some(stub) = self
            .route_stubs
            .iter()
            .find(|s| !(100..=599).contains(&s.status))
        {
            return Err(HarnessError::ScenarioParse(format!(
                "{}: stub {} has invalid status {}",
                self.name, stub.pattern, stub.status
            )));
        }
        if !(0.0..=100.0).contains(&self.visual_threshold) {
            return Err(HarnessError::ScenarioParse(format!(
                "{}: visual_threshold must be between 0 and 100",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario_with_defaults() {
        let yaml = r#"
name: shop-error
url: /shop
route_stubs:
  - pattern: "**/api/shop/products*"
expect:
  text: We encountered a problem
"#;
        let scenario = ErrorUiScenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.route_stubs[0].status, 500);
        assert_eq!(scenario.route_stubs[0].content_type, "application/json");
        assert_eq!(scenario.timeout_ms, 10_000);
        assert_eq!(scenario.viewport.width, 1280);
        assert!(scenario.screenshot.is_none());
        assert!(scenario.expect.count.is_none());
    }

    #[test]
    fn test_parse_full_scenario() {
        let yaml = r#"
name: orders-unavailable
tags: [orders, smoke]
url: /account/orders
viewport: { width: 390, height: 844 }
route_stubs:
  - pattern: "**/api/orders/**"
    status: 503
    body: '{"message": "Service Unavailable"}'
expect:
  text: We encountered a problem
  count: 1
  visible_text: Our team is working on solving it
screenshot: orders-mobile
visual_threshold: 1.5
"#;
        let scenario = ErrorUiScenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.route_stubs[0].status, 503);
        assert_eq!(scenario.viewport, Viewport { width: 390, height: 844 });
        assert_eq!(scenario.expect.count, Some(1));
        assert_eq!(scenario.screenshot.as_deref(), Some("orders-mobile"));
        assert_eq!(ErrorUiScenario::filter_by_tag(&[scenario], "smoke").len(), 1);
    }

    #[test]
    fn test_scenario_without_stubs_rejected() {
        let yaml = r#"
name: nothing-stubbed
url: /
route_stubs: []
expect:
  text: We encountered a problem
"#;
        assert!(matches!(
            ErrorUiScenario::from_yaml(yaml),
            Err(HarnessError::ScenarioParse(_))
        ));
    }

    #[test]
    fn test_home_error_builtin() {
        let scenario = ErrorUiScenario::home_error();
        assert_eq!(scenario.route_stubs.len(), 3);
        assert_eq!(scenario.expect.count, Some(3));
        scenario.validate().unwrap();
    }

    #[test]
    fn test_zero_expected_count_rejected() {
        let yaml = r#"
name: no-errors
url: /
route_stubs:
  - pattern: "**/api/public/stores"
expect:
  text: We encountered a problem
  count: 0
"#;
        let err = ErrorUiScenario::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, HarnessError::ScenarioParse(msg) if msg.contains("count")));
    }

    #[test]
    fn test_load_all_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ErrorUiScenario::load_all(&dir.path().join("scenarioz")).unwrap_err();
        assert!(matches!(err, HarnessError::ScenarioParse(_)));
    }

    #[test]
    fn test_load_all_directory_without_yaml_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "scenarios live here").unwrap();
        let err = ErrorUiScenario::load_all(dir.path()).unwrap_err();
        assert!(matches!(err, HarnessError::ScenarioParse(msg) if msg.contains("no scenario files")));
    }

    #[test]
    fn test_load_all_directory_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b-orders", "a-home"] {
            std::fs::write(
                dir.path().join(format!("{}.yaml", name)),
                format!(
                    "name: {}\nurl: /\nroute_stubs:\n  - pattern: \"**/api/**\"\nexpect:\n  text: We encountered a problem\n",
                    name
                ),
            )
            .unwrap();
        }
        let names: Vec<String> = ErrorUiScenario::load_all(dir.path())
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["a-home", "b-orders"]);
    }
}
