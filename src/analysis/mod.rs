//! Commit analysis pipeline.
//!
//! Diff text is parsed into per-file records, each record is classified,
//! and the classified records are condensed into a bounded summary. All of
//! it works on in-memory inputs; nothing here touches the network.

pub mod classify;
pub mod diff;
pub mod patterns;
pub mod summary;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ConfigError;
use crate::ticket::{TicketMatcher, TicketReference};

pub use classify::{Category, ChangeClassifier};
pub use diff::{ChangeKind, FileChange, Hunk, ParseWarning, ParsedDiff, parse_unified_diff};
pub use patterns::{GlobTable, PathMatcher};
pub use summary::{ChangeSummary, ClassifiedChange, FileSummary, NO_CHANGES, SummaryOptions, summarize};

const SHORT_HASH_LEN: usize = 7;

/// Commit metadata and diff text handed over by the version-control layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInput {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub parent_count: usize,
    /// Unified diff against the first parent.
    pub diff: String,
    pub url: Option<String>,
}

impl CommitInput {
    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }

    pub fn short_hash(&self) -> &str {
        self.hash.get(..SHORT_HASH_LEN).unwrap_or(&self.hash)
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

/// Result of analyzing one commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitAnalysis {
    pub commit: CommitInput,
    pub tickets: Vec<TicketReference>,
    pub changes: Vec<ClassifiedChange>,
    /// Paths dropped by the ignore list.
    pub ignored: Vec<String>,
    pub warnings: Vec<ParseWarning>,
    pub skipped_merge: bool,
}

/// Compiled pipeline. Building one validates every pattern in the config.
#[derive(Debug, Clone)]
pub struct Analyzer {
    tickets: TicketMatcher,
    ignore: PathMatcher,
    classifier: ChangeClassifier,
    summary: SummaryOptions,
    analyze_merges: bool,
    max_commits: usize,
    dedup_tickets: bool,
}

impl Analyzer {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            tickets: TicketMatcher::from_config(&config.project)?,
            ignore: PathMatcher::new("git.ignore_patterns", &config.git.ignore_patterns)?,
            classifier: ChangeClassifier::new(&config.analysis.category_rules)?,
            summary: SummaryOptions::from(&config.analysis),
            analyze_merges: config.git.analyze_merges,
            max_commits: config.git.max_commits,
            dedup_tickets: config.project.dedup_tickets,
        })
    }

    pub fn summary_options(&self) -> &SummaryOptions {
        &self.summary
    }

    pub fn dedups_tickets(&self) -> bool {
        self.dedup_tickets
    }

    /// Ticket references in `message`, deduplicated when configured.
    pub fn tickets_in(&self, message: &str) -> Vec<TicketReference> {
        if self.dedup_tickets {
            self.tickets.extract(message)
        } else {
            self.tickets.find_all(message)
        }
    }

    /// Parse a commit's diff. Merge commits yield nothing unless merge
    /// analysis is enabled.
    pub fn parse_diff(&self, commit: &CommitInput) -> ParsedDiff {
        if commit.is_merge() && !self.analyze_merges {
            return ParsedDiff::default();
        }
        parse_unified_diff(&commit.diff, &self.ignore)
    }

    pub fn analyze_commit(&self, commit: CommitInput) -> CommitAnalysis {
        if commit.is_merge() && !self.analyze_merges {
            debug!("Skipping merge commit {}", commit.short_hash());
            return CommitAnalysis {
                commit,
                tickets: Vec::new(),
                changes: Vec::new(),
                ignored: Vec::new(),
                warnings: Vec::new(),
                skipped_merge: true,
            };
        }

        let parsed = self.parse_diff(&commit);
        let changes = parsed
            .files
            .into_iter()
            .map(|change| {
                let category = self.classifier.classify(&change, &commit.message);
                ClassifiedChange { change, category }
            })
            .collect();

        CommitAnalysis {
            tickets: self.tickets_in(&commit.message),
            changes,
            ignored: parsed.ignored,
            warnings: parsed.warnings,
            skipped_merge: false,
            commit,
        }
    }

    /// Analyze the commits of one push, keeping at most `max_commits`.
    pub fn analyze_push(&self, mut commits: Vec<CommitInput>) -> Vec<CommitAnalysis> {
        if commits.len() > self.max_commits {
            warn!(
                "Push contains {} commits, analyzing only the first {}",
                commits.len(),
                self.max_commits
            );
            commits.truncate(self.max_commits);
        }

        commits.into_iter().map(|c| self.analyze_commit(c)).collect()
    }

    /// Summarize the combined changes of several commits.
    pub fn summarize(&self, analyses: &[&CommitAnalysis]) -> ChangeSummary {
        let changes = combine_changes(analyses);
        summarize(&changes, &self.summary)
    }
}

/// Merge per-commit changes by path, first-occurrence order.
///
/// A file touched by several commits keeps the kind, category and snippet
/// of its first appearance; line counts and hunks accumulate.
pub fn combine_changes(analyses: &[&CommitAnalysis]) -> Vec<ClassifiedChange> {
    let mut combined: Vec<ClassifiedChange> = Vec::new();

    for entry in analyses.iter().flat_map(|a| a.changes.iter()) {
        match combined.iter_mut().find(|c| c.change.path == entry.change.path) {
            Some(existing) => {
                existing.change.added_lines += entry.change.added_lines;
                existing.change.removed_lines += entry.change.removed_lines;
                existing.change.hunks.extend(entry.change.hunks.iter().cloned());
            }
            None => combined.push(entry.clone()),
        }
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DIFF: &str = "\
diff --git a/src/app.py b/src/app.py
index 1111111..2222222 100644
--- a/src/app.py
+++ b/src/app.py
@@ -1,3 +1,4 @@ def main():
 import os
-x = None
+x = load()
+check(x)
 run(x)
";

    fn commit(hash: &str, message: &str, parents: usize) -> CommitInput {
        CommitInput {
            hash: hash.to_string(),
            message: message.to_string(),
            author: "Dev".to_string(),
            email: "dev@example.com".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            parent_count: parents,
            diff: DIFF.to_string(),
            url: None,
        }
    }

    fn analyzer(config: &Config) -> Analyzer {
        Analyzer::from_config(config).unwrap()
    }

    #[test]
    fn test_analyze_commit_classifies_changes() {
        let analysis = analyzer(&Config::default()).analyze_commit(commit("abc", "PROJ-1: fix loader", 1));
        assert_eq!(analysis.tickets, vec![TicketReference::new("PROJ-1")]);
        assert_eq!(analysis.changes.len(), 1);
        assert_eq!(analysis.changes[0].category, Category::Fix);
        assert!(!analysis.skipped_merge);
    }

    #[test]
    fn test_merge_commits_skipped_by_default() {
        let a = analyzer(&Config::default());
        let merge = commit("abc", "PROJ-1: merge branch", 2);
        assert!(a.parse_diff(&merge).files.is_empty());

        let analysis = a.analyze_commit(merge);
        assert!(analysis.skipped_merge);
        assert!(analysis.changes.is_empty());
        assert!(analysis.tickets.is_empty());
    }

    #[test]
    fn test_merge_commits_analyzed_when_enabled() {
        let mut config = Config::default();
        config.git.analyze_merges = true;
        let analysis = analyzer(&config).analyze_commit(commit("abc", "PROJ-1: merge", 2));
        assert!(!analysis.skipped_merge);
        assert_eq!(analysis.changes.len(), 1);
    }

    #[test]
    fn test_max_commits_truncates_push() {
        let mut config = Config::default();
        config.git.max_commits = 2;
        let commits = (0..5).map(|i| commit(&format!("c{i}"), "PROJ-1 work", 1)).collect();
        let analyses = analyzer(&config).analyze_push(commits);
        let hashes: Vec<&str> = analyses.iter().map(|a| a.commit.hash.as_str()).collect();
        assert_eq!(hashes, vec!["c0", "c1"]);
    }

    #[test]
    fn test_dedup_policy_both_ways() {
        let message = "PROJ-1 and PROJ-1 again";

        let deduped = analyzer(&Config::default()).tickets_in(message);
        assert_eq!(deduped.len(), 1);

        let mut config = Config::default();
        config.project.dedup_tickets = false;
        let all = analyzer(&config).tickets_in(message);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_combine_changes_merges_same_path() {
        let a = analyzer(&Config::default());
        let first = a.analyze_commit(commit("c1", "PROJ-1 one", 1));
        let second = a.analyze_commit(commit("c2", "PROJ-1 two", 1));

        let combined = combine_changes(&[&first, &second]);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].change.added_lines, 4);
        assert_eq!(combined[0].change.removed_lines, 2);
        assert_eq!(combined[0].change.hunks.len(), 2);
    }

    #[test]
    fn test_short_hash_and_subject() {
        let c = commit("0123456789abcdef", "PROJ-1: subject line\n\nbody", 1);
        assert_eq!(c.short_hash(), "0123456");
        assert_eq!(c.subject(), "PROJ-1: subject line");
        assert_eq!(commit("abc", "", 1).short_hash(), "abc");
    }

    #[test]
    fn test_invalid_ignore_glob_fails_at_startup() {
        let mut config = Config::default();
        config.git.ignore_patterns = vec!["[".to_string()];
        assert!(matches!(
            Analyzer::from_config(&config),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }
}
