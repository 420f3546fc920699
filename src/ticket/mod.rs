//! Ticket identifier extraction from commit messages.

use std::collections::HashSet;

use regex_lite::Regex;
use serde::Serialize;

use crate::config::ProjectConfig;
use crate::error::ConfigError;

/// A ticket identifier such as `PROJ-123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TicketReference(String);

impl TicketReference {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Project key part of the identifier (`PROJ` for `PROJ-123`).
    pub fn project_key(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for TicketReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compiled ticket pattern plus the optional project-key allow list.
#[derive(Debug, Clone)]
pub struct TicketMatcher {
    pattern: Regex,
    keys: Vec<String>,
}

impl TicketMatcher {
    /// Compile a matcher. An invalid pattern is a startup error.
    pub fn new(pattern: &str, keys: &[String]) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|e| ConfigError::InvalidTicketPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            keys: keys.to_vec(),
        })
    }

    pub fn from_config(config: &ProjectConfig) -> Result<Self, ConfigError> {
        Self::new(&config.ticket_pattern, &config.keys)
    }

    /// Every match in order of appearance, duplicates included.
    ///
    /// When the pattern has a capture group the first group is the identifier,
    /// otherwise the whole match is.
    pub fn find_all(&self, text: &str) -> Vec<TicketReference> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str())
            .filter(|id| !id.is_empty())
            .map(TicketReference::new)
            .filter(|ticket| self.accepts(ticket))
            .collect()
    }

    /// Distinct matches, preserving first-occurrence order.
    pub fn extract(&self, text: &str) -> Vec<TicketReference> {
        let mut seen = HashSet::new();
        self.find_all(text)
            .into_iter()
            .filter(|ticket| seen.insert(ticket.clone()))
            .collect()
    }

    fn accepts(&self, ticket: &TicketReference) -> bool {
        self.keys.is_empty() || self.keys.iter().any(|k| k == ticket.project_key())
    }
}
