//! storecheck verification harness
//!
//! Verifies the store application from the outside:
//! - Logs in a fixed set of role identities and probes the REST API with a
//!   declared (method, path, identity, expected-status) matrix
//! - Forces the front end into its error state by stubbing API routes in a
//!   Playwright-driven browser, then checks the error UI and its screenshot
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MatrixRunner                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Authenticator                                              │
//! │    └── POST /auth/login per Identity -> SessionTokens       │
//! │  ProbeExecutor (reads SessionTokens)                        │
//! │    └── Probe -> ProbeResult                                 │
//! │          pass | fail | skip | unsupported | error           │
//! │  RunObserver  -> console lines while running                │
//! │  RunReport    -> permission-results.json                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     ErrorUiRunner                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ErrorUiScenario (YAML)                                     │
//! │    ├── route_stubs: [{ pattern, status, body }]             │
//! │    ├── url                                                  │
//! │    ├── expect { text, count?, visible_text? }               │
//! │    └── screenshot?                                          │
//! │  PlaywrightHandle -> node script -> ScriptOutcome           │
//! │  BaselineStore    -> VisualVerdict                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod error_ui;
pub mod identity;
pub mod matrix;
pub mod playwright;
pub mod probe;
pub mod readiness;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod visual;

pub use auth::{Authenticator, SessionToken, SessionTokens};
pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use identity::Identity;
pub use matrix::{ProbeGroup, ProbeMatrix};
pub use probe::{Probe, ProbeExecutor, ProbeOutcome, ProbeResult};
pub use report::{ConsoleObserver, NoopObserver, RunObserver};
pub use runner::{MatrixRunner, RunReport, RunSummary};
pub use scenario::ErrorUiScenario;
