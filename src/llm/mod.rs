//! Optional AI-written change summaries.
//!
//! When `advanced.use_ai_summary` is on, the narrative of each ticket update
//! is written by a chat model. Any failure falls back to the heuristic
//! narrative, so a model outage never blocks a comment.

pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::analysis::{ChangeSummary, CommitAnalysis};
use crate::config::AdvancedConfig;
use crate::error::SummaryError;

pub use openai::OpenAiClient;
pub use prompt::{build_summary_prompt, sanitize_for_prompt};

/// Text completion backend for summaries.
///
/// This abstraction allows mocking the model in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Complete `prompt`, returning the model's text.
    async fn complete(&self, prompt: &str) -> Result<String, SummaryError>;
}

/// Provider for the configuration, or `None` when AI summaries are off or
/// unavailable.
pub fn provider_from_config(config: &AdvancedConfig) -> Option<OpenAiClient> {
    if !config.use_ai_summary {
        return None;
    }
    match OpenAiClient::from_config(&config.openai) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("AI summaries disabled: {}", e);
            None
        }
    }
}

/// Replace the narrative of `summary` with a model-written one.
///
/// Empty summaries keep their placeholder. On error the heuristic narrative
/// is kept and the failure is logged.
pub async fn narrate<P: SummaryProvider + ?Sized>(
    provider: &P,
    commits: &[&CommitAnalysis],
    mut summary: ChangeSummary,
    include_snippets: bool,
) -> ChangeSummary {
    if summary.is_empty() {
        return summary;
    }

    let prompt = build_summary_prompt(commits, &summary, include_snippets);
    match provider.complete(&prompt).await {
        Ok(text) => {
            info!("Generated AI summary");
            summary.narrative = text;
        }
        Err(e) => warn!("AI summary failed, using heuristic summary: {}", e),
    }
    summary
}
