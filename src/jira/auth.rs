//! Jira credentials.
//!
//! Secrets come from the config file first and fall back to the
//! `JIRA_API_TOKEN` environment variable.

use std::env;

use base64::prelude::{BASE64_STANDARD, Engine as _};

use crate::config::{AuthMethod, JIRA_TOKEN_ENV_VAR, JiraConfig};
use crate::error::ConfigError;

#[derive(Clone, PartialEq, Eq)]
pub enum JiraAuth {
    Basic { username: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for JiraAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JiraAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            JiraAuth::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

impl JiraAuth {
    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            JiraAuth::Basic { username, password } => {
                let encoded = BASE64_STANDARD.encode(format!("{username}:{password}"));
                format!("Basic {encoded}")
            }
            JiraAuth::Bearer(token) => format!("Bearer {token}"),
        }
    }

    pub fn from_config(config: &JiraConfig) -> Result<Self, ConfigError> {
        match config.auth_method {
            AuthMethod::Basic => {
                let username = non_empty(config.username.clone())
                    .ok_or(ConfigError::MissingJiraSetting("jira.username"))?;
                let password = non_empty(config.password.clone())
                    .or_else(token_from_env)
                    .ok_or(ConfigError::MissingJiraSetting("jira.password or JIRA_API_TOKEN"))?;
                Ok(JiraAuth::Basic { username, password })
            }
            AuthMethod::Token => non_empty(config.token.clone())
                .or_else(token_from_env)
                .map(JiraAuth::Bearer)
                .ok_or(ConfigError::MissingJiraSetting("jira.token or JIRA_API_TOKEN")),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn token_from_env() -> Option<String> {
    non_empty(env::var(JIRA_TOKEN_ENV_VAR).ok())
}
