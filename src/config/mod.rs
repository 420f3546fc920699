//! YAML configuration for the hook.
//!
//! Every section and key is optional. Missing values fall back to the
//! defaults below, which mirror a typical Jira Cloud setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::analysis::Category;
use crate::comment::DEFAULT_TEMPLATE;
use crate::error::ConfigError;

/// Environment variable consulted when no Jira secret is configured.
pub const JIRA_TOKEN_ENV_VAR: &str = "JIRA_API_TOKEN";

/// Looked up at the repository root when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".jira-update.yml";

/// Default ticket identifier pattern (`PROJ-123`).
pub const DEFAULT_TICKET_PATTERN: &str = r"([A-Z]+-\d+)";

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub jira: JiraConfig,
    pub project: ProjectConfig,
    pub git: GitConfig,
    pub analysis: AnalysisConfig,
    pub comment: CommentConfig,
    pub advanced: AdvancedConfig,
}

/// How requests to Jira are authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// `username:password` basic auth; Jira Cloud expects an API token as password.
    #[default]
    Basic,
    /// Bearer personal access token (Jira Data Center).
    Token,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    pub url: Option<String>,
    pub auth_method: AuthMethod,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth_method: AuthMethod::Basic,
            username: None,
            password: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub ticket_pattern: String,
    /// Project keys to accept. Empty accepts every key the pattern matches.
    pub keys: Vec<String>,
    /// Collapse repeated mentions of the same ticket before dispatch.
    pub dedup_tickets: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            ticket_pattern: DEFAULT_TICKET_PATTERN.to_string(),
            keys: Vec::new(),
            dedup_tickets: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub max_commits: usize,
    pub analyze_merges: bool,
    pub ignore_patterns: Vec<String>,
    /// Overrides remote-derived commit links. `{hash}` is replaced by the full hash.
    pub commit_url_template: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            max_commits: 10,
            analyze_merges: false,
            ignore_patterns: Vec::new(),
            commit_url_template: None,
        }
    }
}

/// Verbosity of the per-file narrative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// One line per file.
    Basic,
    /// Adds category, line counts and change points.
    #[default]
    Detailed,
    /// Adds snippets.
    Comprehensive,
}

/// Maps a filename glob to the category it forces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    pub category: Category,
}

impl CategoryRule {
    fn new(pattern: &str, category: Category) -> Self {
        Self {
            pattern: pattern.to_string(),
            category,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detail_level: DetailLevel,
    pub max_files: usize,
    pub max_changes_per_file: usize,
    pub include_snippets: bool,
    pub max_snippet_length: usize,
    /// Ordered build/config filename rules; first match wins.
    pub category_rules: Vec<CategoryRule>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detail_level: DetailLevel::Detailed,
            max_files: 5,
            max_changes_per_file: 3,
            include_snippets: true,
            max_snippet_length: 100,
            category_rules: default_category_rules(),
        }
    }
}

/// Build and deployment files first, then generic configuration formats.
pub fn default_category_rules() -> Vec<CategoryRule> {
    let build = [
        "Dockerfile",
        "Makefile",
        "*.mk",
        "build.gradle",
        "pom.xml",
        "CMakeLists.txt",
        "Cargo.toml",
        "package.json",
        "setup.py",
        "Jenkinsfile",
    ];
    let config = [
        "*.yml", "*.yaml", "*.toml", "*.ini", "*.cfg", "*.conf", "*.json", ".env*",
    ];

    build
        .iter()
        .map(|p| CategoryRule::new(p, Category::Build))
        .chain(config.iter().map(|p| CategoryRule::new(p, Category::Config)))
        .collect()
}

/// Which files feed label derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelScope {
    /// Every non-ignored file, regardless of `max_files`.
    #[default]
    All,
    /// Only the files kept in the summary.
    Listed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommentConfig {
    pub template: String,
    pub add_labels: bool,
    /// Glob or filename → label.
    pub labels: BTreeMap<String, String>,
    pub label_scope: LabelScope,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            add_labels: false,
            labels: BTreeMap::new(),
            label_scope: LabelScope::All,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Replace the heuristic narrative with a model-written one.
    pub use_ai_summary: bool,
    pub openai: OpenAiConfig,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            use_ai_summary: false,
            openai: OpenAiConfig::default(),
        }
    }
}

/// Chat-completions endpoint used for AI summaries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Environment variable holding the API key. The key itself never lives in the file.
    pub api_key_env: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 300,
            temperature: 0.5,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, else the repository's `.jira-update.yml`
    /// when present, else the defaults.
    pub fn resolve(explicit: Option<&Path>, repo_root: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = repo_root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            debug!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"; serde_yaml would reject it as a null value.
        let config = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str::<Config>(content).map_err(ConfigError::ParseFailed)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check numeric limits and rule categories.
    ///
    /// Patterns and templates are validated when the analyzer and renderer
    /// are compiled, which also happens once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git.max_commits == 0 {
            return Err(ConfigError::InvalidValue {
                field: "git.max_commits",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.analysis.max_files == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis.max_files",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.jira.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "jira.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(rule) = self
            .analysis
            .category_rules
            .iter()
            .find(|r| !matches!(r.category, Category::Build | Category::Config))
        {
            return Err(ConfigError::InvalidValue {
                field: "analysis.category_rules",
                reason: format!(
                    "rule '{}' maps to '{}'; only build and config are allowed",
                    rule.pattern, rule.category
                ),
            });
        }
        if self.advanced.use_ai_summary && self.advanced.openai.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advanced.openai.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(template) = &self.git.commit_url_template
            && !template.contains("{hash}")
        {
            return Err(ConfigError::InvalidValue {
                field: "git.commit_url_template",
                reason: "must contain {hash}".to_string(),
            });
        }
        Ok(())
    }
}
