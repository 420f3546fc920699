//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;

use chrono::{TimeZone, Utc};
use git2::{Commit, Oid, Repository, Signature, Time};

use jira_update::analysis::CommitInput;

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
    clock: std::cell::Cell<i64>,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        Self {
            dir,
            repo,
            clock: std::cell::Cell::new(1_714_564_800),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Signature with a clock that advances one minute per commit.
    fn signature(&self) -> Signature<'static> {
        let seconds = self.clock.get();
        self.clock.set(seconds + 60);
        Signature::new("Test User", "test@example.com", &Time::new(seconds, 0))
            .expect("Failed to create signature")
    }

    fn head_commit(&self) -> Option<Commit<'_>> {
        self.repo.head().ok().and_then(|h| h.peel_to_commit().ok())
    }

    fn commit_index(&self, message: &str, parents: &[&Commit<'_>]) -> Oid {
        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, parents)
            .expect("Failed to create commit")
    }

    /// Write files (path, content) and commit them. Returns the commit OID.
    pub fn commit_files(&self, message: &str, files: &[(&str, &str)]) -> Oid {
        let mut index = self.repo.index().expect("Failed to get index");
        for (path, content) in files {
            let full = self.dir.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create directory");
            }
            std::fs::write(&full, content).expect("Failed to write test file");
            index.add_path(Path::new(path)).expect("Failed to add file");
        }
        index.write().expect("Failed to write index");

        let parent = self.head_commit();
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.commit_index(message, &parents)
    }

    /// Delete a file and commit the removal.
    pub fn remove_file(&self, message: &str, path: &str) -> Oid {
        std::fs::remove_file(self.dir.path().join(path)).expect("Failed to remove file");
        let mut index = self.repo.index().expect("Failed to get index");
        index.remove_path(Path::new(path)).expect("Failed to remove from index");
        index.write().expect("Failed to write index");

        let parent = self.head_commit();
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.commit_index(message, &parents)
    }

    /// Create a merge commit of HEAD and `other` from the current index.
    pub fn merge_commit(&self, message: &str, other: Oid) -> Oid {
        let head = self.head_commit().expect("HEAD must exist for a merge");
        let other = self.repo.find_commit(other).expect("Failed to find merge parent");
        self.commit_index(message, &[&head, &other])
    }

    /// Point HEAD directly at `oid`, leaving the current branch behind.
    pub fn detach_head(&self, oid: Oid) {
        self.repo.set_head_detached(oid).expect("Failed to detach HEAD");
    }

    /// Point a remote-tracking ref such as `refs/remotes/origin/main` at `oid`.
    pub fn set_remote_ref(&self, name: &str, oid: Oid) {
        self.repo
            .reference(name, oid, true, "test remote ref")
            .expect("Failed to create remote ref");
    }

    /// Add an `origin` remote.
    pub fn set_origin(&self, url: &str) {
        self.repo.remote("origin", url).expect("Failed to add remote");
    }
}

/// A unified diff for one modified file with the given line counts.
pub fn modified_file_diff(path: &str, added: usize, removed: usize) -> String {
    let mut diff = format!(
        "diff --git a/{path} b/{path}\nindex 1111111..2222222 100644\n--- a/{path}\n+++ b/{path}\n@@ -1,{removed} +1,{added} @@\n"
    );
    for i in 0..removed {
        diff.push_str(&format!("-old line {i}\n"));
    }
    for i in 0..added {
        diff.push_str(&format!("+new line {i}\n"));
    }
    diff
}

/// Commit metadata with a fixed author and timestamp.
pub fn commit_input(hash: &str, message: &str, diff: &str) -> CommitInput {
    CommitInput {
        hash: hash.to_string(),
        message: message.to_string(),
        author: "Test User".to_string(),
        email: "test@example.com".to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        parent_count: 1,
        diff: diff.to_string(),
        url: None,
    }
}
