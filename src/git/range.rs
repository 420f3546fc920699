//! Push range resolution.

use std::path::Path;

use git2::{Oid, Repository};

use crate::error::GitError;

/// Resolved `base..head` range of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRange {
    /// `None` when the push starts from the root (new branch).
    pub base: Option<Oid>,
    pub head: Oid,
}

/// Open the repository containing `path`.
pub fn open_repository(path: &Path) -> Result<Repository, GitError> {
    Repository::discover(path).map_err(|source| GitError::OpenRepository {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether `reference` denotes "no commit", as git does for new branches.
pub fn is_null_ref(reference: &str) -> bool {
    let reference = reference.trim();
    reference.is_empty() || reference.chars().all(|c| c == '0')
}

/// Resolve both ends of a push.
pub fn resolve_push_range(
    repo: &Repository,
    base: Option<&str>,
    head: &str,
) -> Result<PushRange, GitError> {
    let head = resolve_reference(repo, head)?;
    let base = match base {
        Some(base) if !is_null_ref(base) => Some(resolve_reference(repo, base)?),
        _ => None,
    };

    Ok(PushRange { base, head })
}

/// Resolve a reference (branch, tag, commit hash, `HEAD~1`) to a commit OID.
pub fn resolve_reference(repo: &Repository, reference: &str) -> Result<Oid, GitError> {
    // Try as a direct OID first
    if let Ok(oid) = Oid::from_str(reference)
        && repo.find_commit(oid).is_ok()
    {
        return Ok(oid);
    }

    let object = repo
        .revparse_single(reference)
        .map_err(|e| GitError::ReferenceNotFound(reference.to_string(), e))?;

    Ok(object.peel_to_commit().map_err(GitError::ParseCommit)?.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_refs() {
        assert!(is_null_ref("0000000000000000000000000000000000000000"));
        assert!(is_null_ref(""));
        assert!(is_null_ref("  "));
        assert!(!is_null_ref("HEAD"));
        assert!(!is_null_ref("a1b2c3"));
    }
}
