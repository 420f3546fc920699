//! Ahead-of-time compiled glob matchers.
//!
//! Patterns use shell `fnmatch` semantics: `*` may cross directory
//! separators. A pattern matches a path when it matches either the full
//! repository-relative path or the bare file name, so `Dockerfile` also
//! matches `deploy/Dockerfile`.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::ConfigError;

/// Return the last path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn build_glob_set<'a>(
    field: &'static str,
    patterns: impl IntoIterator<Item = &'a str>,
) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
            field,
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidGlob {
        field,
        pattern: String::new(),
        reason: e.to_string(),
    })
}

/// Indices of every pattern matching `path`, ascending, without duplicates.
fn match_indices(set: &GlobSet, path: &str) -> Vec<usize> {
    let mut indices = set.matches(path);
    let name = file_name(path);
    if name != path {
        indices.extend(set.matches(name));
        indices.sort_unstable();
        indices.dedup();
    }
    indices
}

/// A yes/no predicate over paths, e.g. the ignore list.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    set: GlobSet,
}

impl PathMatcher {
    pub fn new(field: &'static str, patterns: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            set: build_glob_set(field, patterns.iter().map(String::as_str))?,
        })
    }

    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.set.is_match(path) || self.set.is_match(file_name(path))
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Ordered pattern → value table (category rules, labels).
#[derive(Debug, Clone)]
pub struct GlobTable<T> {
    set: GlobSet,
    values: Vec<T>,
}

impl<T> GlobTable<T> {
    pub fn new<P: AsRef<str>>(
        field: &'static str,
        entries: impl IntoIterator<Item = (P, T)>,
    ) -> Result<Self, ConfigError> {
        let (patterns, values): (Vec<P>, Vec<T>) = entries.into_iter().unzip();
        let set = build_glob_set(field, patterns.iter().map(|p| p.as_ref()))?;
        Ok(Self { set, values })
    }

    /// Value of the earliest entry matching `path`.
    pub fn first_match(&self, path: &str) -> Option<&T> {
        match_indices(&self.set, path)
            .first()
            .map(|&i| &self.values[i])
    }

    /// Values of every entry matching `path`, in table order.
    pub fn all_matches(&self, path: &str) -> Vec<&T> {
        match_indices(&self.set, path)
            .into_iter()
            .map(|i| &self.values[i])
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
