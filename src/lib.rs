//! jira-update - Post commit summaries to the Jira tickets they reference.
//!
//! # Overview
//!
//! Ticket identifiers are extracted from commit messages, the commit diff is
//! parsed, classified and condensed into a bounded summary, and the rendered
//! comment (plus any derived labels) is posted to each referenced ticket.
//! The narrative can optionally be written by a chat model.
//! Usually run from a `post-commit` or `pre-push` git hook.

pub mod analysis;
pub mod comment;
pub mod config;
pub mod error;
pub mod git;
pub mod hook;
pub mod jira;
pub mod llm;
pub mod logging;
pub mod ticket;

// Re-export commonly used types
pub use analysis::{Analyzer, Category, ChangeKind, ChangeSummary, CommitAnalysis, CommitInput, FileChange};
pub use comment::{CommentPayload, CommentRenderer};
pub use config::Config;
pub use error::{ConfigError, GitError, HookError, JiraError, SummaryError};
pub use hook::{Pipeline, PushOutcome, TicketUpdate};
pub use jira::{Issue, IssueTracker, JiraClient};
pub use llm::{OpenAiClient, SummaryProvider};
pub use ticket::{TicketMatcher, TicketReference};
