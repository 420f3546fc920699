//! Commit URLs for hosted remotes.

use git2::Repository;

/// Builds commit URLs from a configured template or the `origin` remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitUrls {
    template: Option<String>,
    remote: Option<String>,
}

impl CommitUrls {
    pub fn new(template: Option<String>, remote: Option<String>) -> Self {
        Self { template, remote }
    }

    pub fn for_repository(repo: &Repository, template: Option<&str>) -> Self {
        Self::new(template.map(str::to_string), origin_url(repo))
    }

    /// URL of `hash`. The template wins over the remote.
    pub fn url_for(&self, hash: &str) -> Option<String> {
        if let Some(template) = &self.template {
            return Some(template.replace("{hash}", hash));
        }
        self.remote.as_deref().and_then(|remote| commit_url(remote, hash))
    }
}

/// URL of the `origin` remote, if any.
pub fn origin_url(repo: &Repository) -> Option<String> {
    repo.find_remote("origin")
        .ok()
        .and_then(|remote| remote.url().map(str::to_string))
}

/// Split a remote URL (https, ssh or scp-like) into host and repository path.
fn host_and_path(remote: &str) -> Option<(&str, &str)> {
    let remote = remote.trim().trim_end_matches('/');
    let remote = remote.strip_suffix(".git").unwrap_or(remote);

    let (host, path) = if let Some((_, rest)) = remote.split_once("://") {
        let (authority, path) = rest.split_once('/')?;
        let host = authority.rsplit('@').next()?;
        (host.split(':').next()?, path)
    } else {
        let (user_host, path) = remote.split_once(':')?;
        (user_host.rsplit('@').next()?, path)
    };

    (!host.is_empty() && !path.is_empty()).then_some((host, path))
}

/// Web URL of a commit on GitHub, GitLab or Bitbucket.
pub fn commit_url(remote: &str, hash: &str) -> Option<String> {
    let (host, path) = host_and_path(remote)?;

    let commit_path = if host.contains("github") {
        "commit"
    } else if host.contains("gitlab") {
        "-/commit"
    } else if host.contains("bitbucket") {
        "commits"
    } else {
        return None;
    };

    Some(format!("https://{}/{}/{}/{}", host, path, commit_path, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_remotes() {
        let expected = Some("https://github.com/acme/app/commit/abc".to_string());
        assert_eq!(commit_url("git@github.com:acme/app.git", "abc"), expected);
        assert_eq!(commit_url("https://github.com/acme/app.git", "abc"), expected);
        assert_eq!(commit_url("https://token@github.com/acme/app", "abc"), expected);
        assert_eq!(commit_url("ssh://git@github.com/acme/app.git", "abc"), expected);
    }

    #[test]
    fn test_gitlab_and_bitbucket() {
        assert_eq!(
            commit_url("git@gitlab.com:group/sub/app.git", "abc").as_deref(),
            Some("https://gitlab.com/group/sub/app/-/commit/abc")
        );
        assert_eq!(
            commit_url("https://bitbucket.org/team/app.git", "abc").as_deref(),
            Some("https://bitbucket.org/team/app/commits/abc")
        );
    }

    #[test]
    fn test_unknown_host_has_no_url() {
        assert_eq!(commit_url("https://git.internal/app.git", "abc"), None);
        assert_eq!(commit_url("/srv/git/app.git", "abc"), None);
    }

    #[test]
    fn test_template_wins_over_remote() {
        let urls = CommitUrls::new(
            Some("https://git.example.com/r/{hash}".to_string()),
            Some("git@github.com:acme/app.git".to_string()),
        );
        assert_eq!(urls.url_for("abc").as_deref(), Some("https://git.example.com/r/abc"));
        assert_eq!(CommitUrls::default().url_for("abc"), None);
    }
}
