//! Jira integration: issue lookup, comments and labels.

pub mod auth;
pub mod client;
pub mod retry;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::JiraError;

pub use auth::JiraAuth;
pub use client::JiraClient;
pub use retry::{RetryPolicy, retry_with_backoff};

/// The parts of a Jira issue this tool looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub labels: Vec<String>,
    /// Browser URL of the issue.
    pub url: String,
}

/// Ticket-side operations used by push processing.
///
/// This abstraction allows mocking Jira in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Look up an issue. `Ok(None)` when it does not exist.
    async fn get_issue(&self, key: &str) -> Result<Option<Issue>, JiraError>;

    /// Post a comment in Jira wiki markup.
    async fn add_comment(&self, key: &str, body: &str) -> Result<(), JiraError>;

    /// Add labels, keeping the ones already on the issue.
    async fn add_labels(&self, key: &str, labels: &[String]) -> Result<(), JiraError>;
}
