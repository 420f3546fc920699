//! Comment rendering and label derivation.

pub mod template;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{ChangeKind, ChangeSummary, CommitAnalysis, FileSummary, GlobTable};
use crate::config::{CommentConfig, LabelScope};
use crate::error::ConfigError;

pub use template::{DEFAULT_TEMPLATE, PLACEHOLDERS, TemplateValues, has_placeholder, render_template};

/// Format of the `{date}` placeholder.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendered for `{commit_url}` when no URL is known.
pub const MISSING_URL: &str = "#";

/// Final output of the pipeline for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentPayload {
    pub text: String,
    pub labels: BTreeSet<String>,
}

pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

fn file_line(file: &FileSummary) -> String {
    let detail = match file.kind {
        ChangeKind::Added => format!("Added (+{})", file.added_lines),
        ChangeKind::Deleted => format!("Deleted (-{})", file.removed_lines),
        ChangeKind::Modified => format!("Modified (+{}, -{})", file.added_lines, file.removed_lines),
        ChangeKind::Renamed => match &file.old_path {
            Some(old) => format!(
                "Renamed from {} (+{}, -{})",
                old, file.added_lines, file.removed_lines
            ),
            None => format!("Renamed (+{}, -{})", file.added_lines, file.removed_lines),
        },
    };
    format!("* {} - {}", file.path, detail)
}

/// Bullet list for `{files_changed}`, bounded like the summary.
pub fn files_changed(summary: &ChangeSummary) -> String {
    if summary.is_empty() {
        return "* No files changed".to_string();
    }

    let mut lines: Vec<String> = summary.files.iter().map(file_line).collect();
    if let Some(note) = summary.omitted_note() {
        lines.push(format!("* {}", note));
    }
    lines.join("\n")
}

/// Compiled comment template and label table.
#[derive(Debug, Clone)]
pub struct CommentRenderer {
    template: String,
    labels: Option<GlobTable<String>>,
    label_scope: LabelScope,
}

impl CommentRenderer {
    pub fn from_config(config: &CommentConfig) -> Result<Self, ConfigError> {
        if !has_placeholder(&config.template) {
            return Err(ConfigError::TemplateWithoutPlaceholders);
        }

        let labels = if config.add_labels {
            Some(GlobTable::new(
                "comment.labels",
                config
                    .labels
                    .iter()
                    .map(|(pattern, label)| (pattern.as_str(), label.clone())),
            )?)
        } else {
            None
        };

        Ok(Self {
            template: config.template.clone(),
            labels,
            label_scope: config.label_scope,
        })
    }

    /// Render the comment for the commits referencing one ticket.
    ///
    /// A single commit goes through the configured template; several
    /// commits get the push layout.
    pub fn render(&self, analyses: &[&CommitAnalysis], summary: &ChangeSummary) -> CommentPayload {
        let text = match analyses {
            [single] => self.render_commit_text(single, summary),
            _ => render_push_text(analyses, summary),
        };

        CommentPayload {
            text,
            labels: self.labels(analyses, summary),
        }
    }

    fn render_commit_text(&self, analysis: &CommitAnalysis, summary: &ChangeSummary) -> String {
        let commit = &analysis.commit;
        let values = TemplateValues {
            commit_hash: commit.short_hash().to_string(),
            commit_message: commit.message.trim().to_string(),
            author: commit.author.clone(),
            date: format_date(&commit.timestamp),
            summary: summary.narrative.clone(),
            files_changed: files_changed(summary),
            commit_url: commit.url.clone().unwrap_or_else(|| MISSING_URL.to_string()),
        };
        render_template(&self.template, &values)
    }

    /// Labels for the given commits. Empty when labeling is disabled.
    ///
    /// With `LabelScope::All` every non-ignored file contributes; with
    /// `LabelScope::Listed` only the files kept in `summary` do.
    pub fn labels(&self, analyses: &[&CommitAnalysis], summary: &ChangeSummary) -> BTreeSet<String> {
        let Some(table) = &self.labels else {
            return BTreeSet::new();
        };

        let paths: Vec<&str> = match self.label_scope {
            LabelScope::All => analyses
                .iter()
                .flat_map(|a| a.changes.iter())
                .map(|c| c.change.path.as_str())
                .collect(),
            LabelScope::Listed => summary.files.iter().map(|f| f.path.as_str()).collect(),
        };

        paths
            .into_iter()
            .flat_map(|path| table.all_matches(path))
            .cloned()
            .collect()
    }
}

fn render_push_text(analyses: &[&CommitAnalysis], summary: &ChangeSummary) -> String {
    let mut lines = vec![
        format!("*Code changes pushed in {} commits*", analyses.len()),
        String::new(),
        "h2. Summary of Changes".to_string(),
        summary.narrative.clone(),
        String::new(),
        "h3. Commits".to_string(),
    ];

    for analysis in analyses {
        let commit = &analysis.commit;
        lines.push(format!(
            "* [{}|{}] - {} - by {} on {}",
            commit.short_hash(),
            commit.url.as_deref().unwrap_or(MISSING_URL),
            commit.subject(),
            commit.author,
            format_date(&commit.timestamp)
        ));
    }

    lines.push(String::new());
    lines.push("h3. Files Changed".to_string());
    lines.push(files_changed(summary));
    lines.join("\n")
}
