//! Playwright browser automation for error-UI scenarios
//!
//! Each scenario is rendered into a standalone Node script that installs the
//! route stubs, navigates, checks the error element and takes the screenshot.
//! The script prints one JSON line describing what it saw.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::config::join_url;
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::ErrorUiScenario;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

/// What the generated script observed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    pub success: bool,
    #[serde(default)]
    pub observed_count: usize,
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    /// Front-end base URL
    base_url: String,

    /// Directory for screenshots
    screenshot_dir: PathBuf,

    browser: Browser,
    headless: bool,

    /// Exported as NODE_PATH so the temp script can `require('playwright')`
    node_modules_dir: Option<PathBuf>,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> HarnessResult<Self> {
        Self::check_playwright_installed()?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self::unchecked(config))
    }

    fn unchecked(config: PlaywrightConfig) -> Self {
        Self {
            base_url: config.base_url,
            screenshot_dir: config.screenshot_dir,
            browser: config.browser,
            headless: config.headless,
            node_modules_dir: config.node_modules_dir,
        }
    }

    fn check_playwright_installed() -> HarnessResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::PlaywrightNotFound),
        }
    }

    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.screenshot_dir.join(format!("{}.png", name))
    }

    /// Build the Node script for one scenario
    pub fn build_script(&self, scenario: &ErrorUiScenario) -> String {
        let timeout = scenario.timeout_ms;
        let mut script = String::new();

        script.push_str(&format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const result = {{ success: false, observed_count: 0, screenshot: null }};

  try {{
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = scenario.viewport.width,
            height = scenario.viewport.height,
        ));

        // Stubs must be in place before the first request leaves the page
        for stub in &scenario.route_stubs {
            script.push_str(&format!(
                "    await page.route({}, route => route.fulfill({{ status: {}, contentType: {}, body: {} }}));\n",
                js_string(&stub.pattern),
                stub.status,
                js_string(&stub.content_type),
                js_string(&stub.body),
            ));
        }

        script.push_str(&format!(
            "\n    await page.goto({});\n",
            js_string(&join_url(&self.base_url, &scenario.url))
        ));

        script.push_str(&format!(
            r#"    const errors = page.getByText({text});
    await errors.first().waitFor({{ state: 'visible', timeout: {timeout} }});
    result.observed_count = await errors.count();
"#,
            text = js_string(&scenario.expect.text),
            timeout = timeout,
        ));

        if let Some(count) = scenario.expect.count {
            script.push_str(&format!(
                r#"    const deadline = Date.now() + {timeout};
    while (result.observed_count !== {count} && Date.now() < deadline) {{
      await page.waitForTimeout(100);
      result.observed_count = await errors.count();
    }}
    if (result.observed_count !== {count}) {{
      throw new Error(`expected {count} error element(s), found ${{result.observed_count}}`);
    }}
"#,
                timeout = timeout,
                count = count,
            ));
        }

        if let Some(visible) = &scenario.expect.visible_text {
            script.push_str(&format!(
                "    await page.getByText({}).first().waitFor({{ state: 'visible', timeout: {} }});\n",
                js_string(visible),
                timeout
            ));
        }

        if let Some(name) = &scenario.screenshot {
            let path = self.screenshot_path(name);
            let path = js_string(&path.to_string_lossy());
            script.push_str(&format!(
                "    await page.screenshot({{ path: {path}, fullPage: true }});\n    result.screenshot = {path};\n",
                path = path
            ));
        }

        script.push_str(
            r#"
    result.success = true;
  } catch (error) {
    result.error = error.message;
  } finally {
    await browser.close();
  }

  console.log(JSON.stringify(result));
  process.exit(result.success ? 0 : 1);
})();
"#,
        );

        script
    }

    /// Run a scenario and return what the browser observed
    pub async fn run_scenario(&self, scenario: &ErrorUiScenario) -> HarnessResult<ScriptOutcome> {
        let script = self.build_script(scenario);
        self.run_script(&script).await
    }

    /// Execute a generated script with node
    pub async fn run_script(&self, script: &str) -> HarnessResult<ScriptOutcome> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("error-ui.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path).current_dir(temp_dir.path());
        if let Some(dir) = &self.node_modules_dir {
            cmd.env("NODE_PATH", dir);
        }
        let output = cmd.output().await?;

        interpret_output(
            output.status.code(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}

/// Map the script's exit code and output to an outcome.
///
/// The script exits 1 after reporting a failed check, so a non-zero exit
/// with a failed result line is an ordinary outcome. Any other non-zero exit,
/// or a missing result line, is a driver error.
pub fn interpret_output(code: Option<i32>, stdout: &str, stderr: &str) -> HarnessResult<ScriptOutcome> {
    let outcome = parse_outcome(stdout);
    match (code, outcome) {
        (Some(0), Some(outcome)) => Ok(outcome),
        (Some(1), Some(outcome)) if !outcome.success => Ok(outcome),
        (code, _) => {
            let exit = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            Err(HarnessError::Playwright(format!(
                "Script failed (exit {}):\nstdout: {}\nstderr: {}",
                exit, stdout, stderr
            )))
        }
    }
}

/// Last JSON line printed by the script
pub fn parse_outcome(stdout: &str) -> Option<ScriptOutcome> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

/// Quote a string as a JavaScript literal
fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub browser: Browser,
    pub headless: bool,
    pub node_modules_dir: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_FRONTEND_URL.to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            browser: Browser::Chromium,
            headless: true,
            node_modules_dir: std::fs::canonicalize("node_modules").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ErrorExpectation, RouteStub, Viewport};

    fn handle() -> PlaywrightHandle {
        PlaywrightHandle::unchecked(PlaywrightConfig {
            base_url: "http://localhost:3000/".to_string(),
            screenshot_dir: PathBuf::from("/tmp/shots"),
            browser: Browser::Firefox,
            headless: true,
            node_modules_dir: None,
        })
    }

    #[test]
    fn test_routes_installed_before_navigation() {
        let script = handle().build_script(&ErrorUiScenario::home_error());
        let goto = script.find("page.goto(").unwrap();
        let last_route = script.rfind("page.route(").unwrap();
        assert!(last_route < goto);
        assert_eq!(script.matches("page.route(").count(), 3);
        assert!(script.contains(r#"page.goto("http://localhost:3000/")"#));
        assert!(script.contains("firefox.launch"));
    }

    #[test]
    fn test_script_checks_count_visibility_and_screenshot() {
        let script = handle().build_script(&ErrorUiScenario::home_error());
        assert!(script.contains(r#"page.getByText("We encountered a problem")"#));
        assert!(script.contains("result.observed_count !== 3"));
        assert!(script.contains(r#"page.getByText("Our team is working on solving it")"#));
        assert!(script.contains(r#"path: "/tmp/shots/home-error.png""#));
    }

    #[test]
    fn test_user_strings_are_escaped() {
        let scenario = ErrorUiScenario {
            name: "quotes".to_string(),
            description: String::new(),
            tags: vec![],
            url: "/it's".to_string(),
            viewport: Viewport { width: 800, height: 600 },
            route_stubs: vec![RouteStub::server_error("**/api/o'brien")],
            expect: ErrorExpectation {
                text: "Can't load \"orders\"".to_string(),
                count: None,
                visible_text: None,
            },
            screenshot: None,
            timeout_ms: 500,
            visual_threshold: 0.5,
        };
        let script = handle().build_script(&scenario);
        assert!(script.contains(r#"page.getByText("Can't load \"orders\"")"#));
        assert!(script.contains(r#"body: "{\"message\": \"Internal Server Error\"}""#));
        assert!(!script.contains("page.screenshot"));
        assert!(!script.contains("deadline"));
    }

    #[test]
    fn test_parse_outcome_takes_last_json_line() {
        let stdout = "[TEST] warming up\n{\"success\":false}\n{\"success\":true,\"observed_count\":3,\"screenshot\":\"/tmp/a.png\"}\n";
        let outcome = parse_outcome(stdout).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.observed_count, 3);
        assert_eq!(outcome.screenshot, Some(PathBuf::from("/tmp/a.png")));
    }

    #[test]
    fn test_parse_outcome_failure_and_garbage() {
        let outcome =
            parse_outcome("{\"success\":false,\"observed_count\":1,\"screenshot\":null,\"error\":\"expected 3\"}")
                .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("expected 3"));
        assert!(parse_outcome("Error: Cannot find module 'playwright'").is_none());
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("webkit".parse::<Browser>().unwrap(), Browser::Webkit);
        assert!("safari".parse::<Browser>().is_err());
    }

    #[test]
    fn test_newline_in_pattern_stays_inside_literal() {
        let mut scenario = ErrorUiScenario::home_error();
        scenario.route_stubs = vec![RouteStub::server_error("**/api/x\nprocess.exit(0);")];
        let script = handle().build_script(&scenario);
        assert!(script.contains(r#"page.route("**/api/x\nprocess.exit(0);""#));
        assert!(!script.lines().any(|line| line.trim() == "process.exit(0);"));
    }

    #[test]
    fn test_exit_code_and_result_line_agree() {
        let passed = r#"{"success":true,"observed_count":3}"#;
        let failed = r#"{"success":false,"observed_count":2,"error":"expected 3"}"#;

        assert!(interpret_output(Some(0), passed, "").unwrap().success);

        let outcome = interpret_output(Some(1), failed, "").unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.observed_count, 2);
    }

    #[test]
    fn test_abnormal_exit_is_driver_error() {
        let passed = r#"{"success":true,"observed_count":3}"#;
        let failed = r#"{"success":false,"observed_count":0}"#;

        // Crash after a passing line
        assert!(matches!(
            interpret_output(Some(1), passed, "Segmentation fault"),
            Err(HarnessError::Playwright(_))
        ));
        assert!(interpret_output(Some(2), failed, "").is_err());
        assert!(interpret_output(None, failed, "").is_err());
        assert!(matches!(
            interpret_output(Some(1), "", "Error: Cannot find module 'playwright'"),
            Err(HarnessError::Playwright(msg)) if msg.contains("Cannot find module")
        ));
    }
}
