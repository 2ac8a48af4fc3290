//! Identity authentication against the store login endpoint
//!
//! Each identity is exchanged for a bearer token with one `POST /auth/login`.
//! Failures are recorded per identity and never stop the remaining logins.
//! The resulting [`SessionTokens`] is immutable and only holds identities
//! that logged in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::join_url;
use crate::identity::Identity;
use crate::report::RunObserver;

/// Path of the login endpoint relative to the API base URL
pub const LOGIN_PATH: &str = "/auth/login";

/// Opaque bearer credential
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Tokens of the identities that logged in, keyed by identity name
#[derive(Debug, Clone, Default)]
pub struct SessionTokens {
    tokens: HashMap<String, SessionToken>,
}

impl SessionTokens {
    pub fn get(&self, identity: &str) -> Option<&SessionToken> {
        self.tokens.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.tokens.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Names of logged-in identities, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tokens.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<(String, SessionToken)> for SessionTokens {
    fn from_iter<I: IntoIterator<Item = (String, SessionToken)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

/// One way of locating the token inside a login response body
#[derive(Clone, Copy)]
pub struct TokenStrategy {
    pub name: &'static str,
    extract: fn(&Value) -> Option<String>,
}

impl TokenStrategy {
    pub fn extract(&self, body: &Value) -> Option<String> {
        (self.extract)(body)
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn nested_data_token(body: &Value) -> Option<String> {
    non_empty_string(body.get("data")?.get("token")?)
}

fn top_level_token(body: &Value) -> Option<String> {
    non_empty_string(body.get("token")?)
}

/// Extraction strategies in the order they are tried
pub const TOKEN_STRATEGIES: &[TokenStrategy] = &[
    TokenStrategy {
        name: "data.token",
        extract: nested_data_token,
    },
    TokenStrategy {
        name: "token",
        extract: top_level_token,
    },
];

/// Try every strategy in order; the first match wins
pub fn extract_token(body: &Value) -> Option<(&'static str, String)> {
    TOKEN_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.extract(body).map(|token| (strategy.name, token)))
}

/// Why an identity could not log in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LoginFailure {
    /// Login endpoint answered with a non-200 status
    Rejected { status: u16, body: String },

    /// 200 response without a token at any accepted location
    MissingToken { body: String },

    /// Request never produced a readable response
    Transport { detail: String },
}

impl std::fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginFailure::Rejected { status, body } => write!(f, "{} - {}", status, body),
            LoginFailure::MissingToken { body } => {
                write!(f, "Token not found in response: {}", body)
            }
            LoginFailure::Transport { detail } => write!(f, "Exception: {}", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    LoggedIn { strategy: String },
    Failed { failure: LoginFailure },
}

/// Diagnostic record of one login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub identity: String,
    pub role: String,
    pub outcome: LoginOutcome,
}

impl LoginAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, LoginOutcome::LoggedIn { .. })
    }
}

/// Tokens plus the per-identity diagnostics that produced them
#[derive(Debug, Clone, Default)]
pub struct Authentication {
    pub tokens: SessionTokens,
    pub attempts: Vec<LoginAttempt>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Exchanges identity credentials for session tokens
pub struct Authenticator {
    client: reqwest::Client,
    login_url: String,
}

impl Authenticator {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            login_url: join_url(base_url, LOGIN_PATH),
        }
    }

    /// Log in every identity in order
    pub async fn authenticate_all(
        &self,
        identities: &[Identity],
        observer: &mut dyn RunObserver,
    ) -> Authentication {
        info!("Logging in {} identities...", identities.len());

        let mut tokens = Vec::new();
        let mut attempts = Vec::with_capacity(identities.len());

        for identity in identities {
            let (attempt, token) = self.login(identity).await;
            observer.on_login(&attempt);
            if let Some(token) = token {
                tokens.push((identity.name.clone(), token));
            }
            attempts.push(attempt);
        }

        Authentication {
            tokens: tokens.into_iter().collect(),
            attempts,
        }
    }

    /// Log in a single identity
    pub async fn login(&self, identity: &Identity) -> (LoginAttempt, Option<SessionToken>) {
        let result = self.request_token(identity).await;

        let (outcome, token) = match result {
            Ok((strategy, token)) => {
                info!(identity = %identity.name, strategy, "Logged in");
                (
                    LoginOutcome::LoggedIn {
                        strategy: strategy.to_string(),
                    },
                    Some(SessionToken::new(token)),
                )
            }
            Err(failure) => {
                warn!(identity = %identity.name, "Failed to login: {}", failure);
                (LoginOutcome::Failed { failure }, None)
            }
        };

        let attempt = LoginAttempt {
            identity: identity.name.clone(),
            role: identity.role.clone(),
            outcome,
        };
        (attempt, token)
    }

    async fn request_token(
        &self,
        identity: &Identity,
    ) -> Result<(&'static str, String), LoginFailure> {
        debug!(url = %self.login_url, identity = %identity.name, "POST login");

        let response = self
            .client
            .post(&self.login_url)
            .json(&LoginRequest {
                email: &identity.email,
                password: &identity.password,
            })
            .send()
            .await
            .map_err(|e| LoginFailure::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| LoginFailure::Transport {
            detail: e.to_string(),
        })?;

        if status != 200 {
            return Err(LoginFailure::Rejected { status, body });
        }

        let token = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| extract_token(&json));
        token.ok_or(LoginFailure::MissingToken { body })
    }
}
