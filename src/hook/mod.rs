//! Push processing: from collected commits to ticket updates.

pub mod install;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::analysis::{Analyzer, CommitAnalysis, CommitInput};
use crate::comment::{CommentPayload, CommentRenderer};
use crate::config::Config;
use crate::error::{ConfigError, JiraError};
use crate::jira::IssueTracker;
use crate::llm::{SummaryProvider, narrate, provider_from_config};
use crate::ticket::TicketReference;

pub use install::{HookKind, install_hook, install_hook_with};

/// Compiled analysis pipeline plus comment renderer.
#[derive(Clone)]
pub struct Pipeline {
    pub analyzer: Analyzer,
    pub renderer: CommentRenderer,
    /// Writes the narrative when AI summaries are enabled.
    pub narrator: Option<Arc<dyn SummaryProvider>>,
}

impl Pipeline {
    /// Compile every pattern and the template. Invalid configuration fails here.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            analyzer: Analyzer::from_config(config)?,
            renderer: CommentRenderer::from_config(&config.comment)?,
            narrator: provider_from_config(&config.advanced)
                .map(|client| Arc::new(client) as Arc<dyn SummaryProvider>),
        })
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn SummaryProvider>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Analyze `commits` and render one update per ticket.
    pub async fn plan(&self, commits: Vec<CommitInput>) -> Vec<TicketUpdate> {
        let analyses = self.analyzer.analyze_push(commits);
        plan_updates(
            &self.analyzer,
            &self.renderer,
            self.narrator.as_deref(),
            &analyses,
        )
        .await
    }
}

/// A comment about to be posted to one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketUpdate {
    pub ticket: TicketReference,
    /// Short hashes of the commits the comment covers.
    pub commits: Vec<String>,
    pub payload: CommentPayload,
}

/// Group commits by ticket and render their comments.
///
/// Ticket order follows first appearance in the push. Each commit's ticket
/// list is already deduplicated when `project.dedup_tickets` is on, and the
/// commits referencing a ticket share one comment. With deduplication off
/// every mention produces its own update. A `narrator` rewrites each
/// summary's narrative.
pub async fn plan_updates(
    analyzer: &Analyzer,
    renderer: &CommentRenderer,
    narrator: Option<&dyn SummaryProvider>,
    analyses: &[CommitAnalysis],
) -> Vec<TicketUpdate> {
    let include_snippets = analyzer.summary_options().include_snippets;
    let mut updates = Vec::new();

    for (ticket, indices) in group_by_ticket(analyzer, analyses) {
        let refs: Vec<&CommitAnalysis> = indices.iter().map(|&i| &analyses[i]).collect();
        let mut summary = analyzer.summarize(&refs);
        if let Some(narrator) = narrator {
            summary = narrate(narrator, &refs, summary, include_snippets).await;
        }
        updates.push(TicketUpdate {
            commits: refs.iter().map(|a| a.commit.short_hash().to_string()).collect(),
            payload: renderer.render(&refs, &summary),
            ticket,
        });
    }

    updates
}

/// Indices of the commits behind each ticket update, in push order.
fn group_by_ticket(
    analyzer: &Analyzer,
    analyses: &[CommitAnalysis],
) -> Vec<(TicketReference, Vec<usize>)> {
    let mut groups: Vec<(TicketReference, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<TicketReference, usize> = HashMap::new();
    let dedup = analyzer.dedups_tickets();

    for (index, analysis) in analyses.iter().enumerate() {
        if analysis.tickets.is_empty() && !analysis.skipped_merge {
            debug!("Commit {} references no ticket", analysis.commit.short_hash());
        }

        for ticket in &analysis.tickets {
            match positions.get(ticket) {
                Some(&position) if dedup => {
                    let commits = &mut groups[position].1;
                    if commits.last() != Some(&index) {
                        commits.push(index);
                    }
                }
                _ => {
                    positions.insert(ticket.clone(), groups.len());
                    groups.push((ticket.clone(), vec![index]));
                }
            }
        }
    }

    groups
}

/// What happened to each ticket of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    pub updated: Vec<TicketReference>,
    /// Tickets that do not exist in Jira.
    pub skipped: Vec<TicketReference>,
    pub failed: Vec<(TicketReference, String)>,
}

impl PushOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

async fn post_update<T: IssueTracker + ?Sized>(
    tracker: &T,
    update: &TicketUpdate,
) -> Result<(), JiraError> {
    let key = update.ticket.as_str();

    tracker.add_comment(key, &update.payload.text).await?;
    info!("Posted comment to {}", key);

    if !update.payload.labels.is_empty() {
        let labels: Vec<String> = update.payload.labels.iter().cloned().collect();
        tracker.add_labels(key, &labels).await?;
        info!("Applied labels to {}: {}", key, labels.join(", "));
    }

    Ok(())
}

/// Post every update. A failing ticket does not stop the others.
pub async fn apply_updates<T: IssueTracker + ?Sized>(
    tracker: &T,
    updates: &[TicketUpdate],
) -> PushOutcome {
    let mut outcome = PushOutcome::default();

    for update in updates {
        let ticket = update.ticket.clone();

        match tracker.get_issue(ticket.as_str()).await {
            Ok(None) => {
                warn!("Ticket {} not found, skipping", ticket);
                outcome.skipped.push(ticket);
            }
            Ok(Some(_)) => match post_update(tracker, update).await {
                Ok(()) => outcome.updated.push(ticket),
                Err(e) => {
                    error!("Failed to update {}: {}", ticket, e);
                    outcome.failed.push((ticket, e.to_string()));
                }
            },
            Err(e) => {
                error!("Failed to look up {}: {}", ticket, e);
                outcome.failed.push((ticket, e.to_string()));
            }
        }
    }

    outcome
}

/// Analyze a push and update every referenced ticket.
pub async fn process_push<T: IssueTracker + ?Sized>(
    tracker: &T,
    pipeline: &Pipeline,
    commits: Vec<CommitInput>,
) -> PushOutcome {
    let updates = pipeline.plan(commits).await;
    if updates.is_empty() {
        info!("No ticket references found in pushed commits");
    }
    apply_updates(tracker, &updates).await
}
