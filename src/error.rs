//! Error types for jira-update modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or compiling configuration.
///
/// These are always surfaced at startup, never while analyzing a commit.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[source] serde_yaml::Error),

    #[error("Invalid ticket pattern '{pattern}': {reason}")]
    InvalidTicketPattern { pattern: String, reason: String },

    #[error("Invalid glob pattern '{pattern}' in {field}: {reason}")]
    InvalidGlob {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error(
        "Comment template contains none of the recognized placeholders \
         ({{commit_hash}}, {{commit_message}}, {{author}}, {{date}}, {{summary}}, {{files_changed}}, {{commit_url}})"
    )]
    TemplateWithoutPlaceholders,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Missing Jira configuration: {0}")]
    MissingJiraSetting(&'static str),
}

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository at {path}: {source}")]
    OpenRepository {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to find reference '{0}': {1}")]
    ReferenceNotFound(String, #[source] git2::Error),

    #[error("Failed to parse commit: {0}")]
    ParseCommit(#[source] git2::Error),

    #[error("Failed to walk commit history: {0}")]
    RevwalkError(#[source] git2::Error),

    #[error("Failed to compute diff for commit {hash}: {source}")]
    DiffFailed {
        hash: String,
        #[source]
        source: git2::Error,
    },
}

/// Errors from Jira REST API operations.
#[derive(Error, Debug)]
pub enum JiraError {
    #[error("Failed to call Jira: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Jira responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode Jira response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<JiraError>),
}

impl JiraError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// every other status is a definitive answer from Jira.
    pub fn is_transient(&self) -> bool {
        match self {
            JiraError::Transport(_) => true,
            JiraError::Status { status, .. } => *status == 429 || *status >= 500,
            JiraError::Decode(_) | JiraError::RetriesExhausted(_) => false,
        }
    }
}

/// Errors from the AI summary provider.
#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("No API key in environment variable {0}")]
    MissingApiKey(String),

    #[error("Failed to call the summary model: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Summary model responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode summary response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Summary model returned no text")]
    EmptyResponse,
}

/// Errors from git hook installation.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Hook {0} already exists. Use --force to replace it.")]
    AlreadyExists(PathBuf),

    #[error("Failed to write hook {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine the jira-update executable path: {0}")]
    ExecutableNotFound(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_classified_by_code() {
        let server = JiraError::Status {
            status: 503,
            body: String::new(),
        };
        let throttled = JiraError::Status {
            status: 429,
            body: String::new(),
        };
        let missing = JiraError::Status {
            status: 404,
            body: String::new(),
        };

        assert!(server.is_transient());
        assert!(throttled.is_transient());
        assert!(!missing.is_transient());
    }

    #[test]
    fn test_template_error_lists_placeholders() {
        let message = ConfigError::TemplateWithoutPlaceholders.to_string();
        assert!(message.contains("{commit_hash}"));
        assert!(message.contains("{commit_url}"));
    }
}
