//! Commit collection and diff text extraction.

use chrono::{TimeZone, Utc};
use git2::{Commit, DiffFindOptions, DiffFormat, DiffOptions, Repository, Sort};
use tracing::{debug, warn};

use crate::analysis::CommitInput;
use crate::error::GitError;

use super::range::resolve_push_range;
use super::remote::CommitUrls;

/// Upper bound on the diff text kept per commit.
const MAX_DIFF_LENGTH: usize = 1_000_000;

/// Remote-tracking refs, hidden when a push has no base.
const REMOTE_REFS: &str = "refs/remotes/*";

/// Collect the commits of `base..head`, at most `limit` of them.
///
/// History is walked newest first and the walk stops at `limit`; the
/// returned commits are oldest first. A missing or all-zero `base` walks
/// to the root, skipping commits reachable from any remote-tracking ref.
pub fn collect_push(
    repo: &Repository,
    base: Option<&str>,
    head: &str,
    limit: usize,
    urls: &CommitUrls,
) -> Result<Vec<CommitInput>, GitError> {
    let range = resolve_push_range(repo, base, head)?;

    let mut revwalk = repo.revwalk().map_err(GitError::RevwalkError)?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(GitError::RevwalkError)?;
    revwalk.push(range.head).map_err(GitError::RevwalkError)?;
    match range.base {
        Some(base) => revwalk.hide(base).map_err(GitError::RevwalkError)?,
        None => {
            // New branch: history already on a remote was commented on before
            revwalk
                .hide_glob(REMOTE_REFS)
                .map_err(GitError::RevwalkError)?;
            debug!("No base commit, hiding commits reachable from {}", REMOTE_REFS);
        }
    }

    let mut commits = Vec::new();
    for oid_result in revwalk {
        let oid = oid_result.map_err(GitError::RevwalkError)?;
        if commits.len() == limit {
            warn!("Push has more than {} commits, ignoring older ones", limit);
            break;
        }
        let commit = repo.find_commit(oid).map_err(GitError::ParseCommit)?;
        let url = urls.url_for(&oid.to_string());
        commits.push(commit_input(repo, &commit, url)?);
    }

    commits.reverse();
    debug!("Collected {} commits", commits.len());
    Ok(commits)
}

/// Build the pipeline input for one commit.
pub fn commit_input(
    repo: &Repository,
    commit: &Commit<'_>,
    url: Option<String>,
) -> Result<CommitInput, GitError> {
    let time = commit.time();
    let timestamp = Utc
        .timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);
    let author = commit.author();

    Ok(CommitInput {
        hash: commit.id().to_string(),
        message: String::from_utf8_lossy(commit.message_bytes()).to_string(),
        author: String::from_utf8_lossy(author.name_bytes()).to_string(),
        email: String::from_utf8_lossy(author.email_bytes()).to_string(),
        timestamp,
        parent_count: commit.parent_count(),
        diff: diff_text(repo, commit)?,
        url,
    })
}

/// Unified diff of `commit` against its first parent, or against the empty
/// tree for a root commit. Renames are detected.
pub fn diff_text(repo: &Repository, commit: &Commit<'_>) -> Result<String, GitError> {
    let failed = |source| GitError::DiffFailed {
        hash: commit.id().to_string(),
        source,
    };

    let tree = commit.tree().map_err(failed)?;
    let parent_tree = match commit.parent_count() {
        0 => None,
        _ => Some(commit.parent(0).and_then(|p| p.tree()).map_err(failed)?),
    };

    let mut opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))
        .map_err(failed)?;

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find)).map_err(failed)?;

    let mut text = String::new();
    let mut truncated = false;

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if truncated {
            return true;
        }

        let content = String::from_utf8_lossy(line.content());
        if text.len() + content.len() + 1 > MAX_DIFF_LENGTH {
            truncated = true;
            return true;
        }

        match line.origin() {
            '+' | '-' | ' ' => {
                text.push(line.origin());
                text.push_str(&content);
            }
            // End-of-file newline markers: only terminate the previous line
            '=' | '>' | '<' => {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => text.push_str(&content),
        }

        true
    })
    .map_err(failed)?;

    if truncated {
        warn!(
            "Diff for commit {} exceeds {} bytes and was truncated",
            commit.id(),
            MAX_DIFF_LENGTH
        );
    }

    Ok(text)
}
