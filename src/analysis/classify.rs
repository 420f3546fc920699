//! Per-file change categorization.
//!
//! Rules are checked in a fixed order and the first match wins:
//!
//! 1. configured build/config filename rules
//! 2. test directories and test file names
//! 3. documentation extensions
//! 4. newly added files → feature
//! 5. fix keywords in the commit message or the file's snippet → fix
//! 6. balanced additions and removals → refactor, anything else → other

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::config::CategoryRule;
use crate::error::ConfigError;

use super::diff::{ChangeKind, FileChange};
use super::patterns::{GlobTable, PathMatcher, file_name};

const TEST_PATTERNS: &[&str] = &[
    "test/*",
    "tests/*",
    "*/test/*",
    "*/tests/*",
    "__tests__/*",
    "*/__tests__/*",
    "spec/*",
    "*/spec/*",
    "test_*",
    "*_test.*",
    "*.test.*",
    "*.spec.*",
];

const DOC_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst", "adoc"];

const FIX_KEYWORDS: &str = r"(?i)\b(fix|fixes|fixed|bug|bugs|bugfix|hotfix|patch|resolve|resolves|resolved|crash)\b";

/// Closed set of change categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Feature,
    Fix,
    Refactor,
    Docs,
    Config,
    Build,
    Test,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Feature,
        Category::Fix,
        Category::Refactor,
        Category::Docs,
        Category::Config,
        Category::Build,
        Category::Test,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Feature => "feature",
            Category::Fix => "fix",
            Category::Refactor => "refactor",
            Category::Docs => "docs",
            Category::Config => "config",
            Category::Build => "build",
            Category::Test => "test",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

fn test_paths() -> &'static PathMatcher {
    static TESTS: OnceLock<PathMatcher> = OnceLock::new();
    TESTS.get_or_init(|| {
        let patterns: Vec<String> = TEST_PATTERNS.iter().map(|p| p.to_string()).collect();
        PathMatcher::new("built-in test patterns", &patterns).expect("built-in test patterns are valid")
    })
}

fn fix_keywords() -> &'static Regex {
    static FIX: OnceLock<Regex> = OnceLock::new();
    FIX.get_or_init(|| Regex::new(FIX_KEYWORDS).expect("fix keyword pattern is valid"))
}

/// Whether `path` looks like a test file.
pub fn is_test_path(path: &str) -> bool {
    test_paths().is_match(path)
}

/// Whether `path` has a documentation extension.
pub fn is_doc_path(path: &str) -> bool {
    file_name(path)
        .rsplit_once('.')
        .is_some_and(|(_, ext)| DOC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Whether `text` mentions fixing something.
pub fn mentions_fix(text: &str) -> bool {
    fix_keywords().is_match(text)
}

/// Additions and removals are both present and within a factor of two.
fn is_balanced(change: &FileChange) -> bool {
    let (added, removed) = (change.added_lines, change.removed_lines);
    added > 0 && removed > 0 && added.min(removed) * 2 >= added.max(removed)
}

/// Deterministic file classifier.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    rules: GlobTable<Category>,
}

impl ChangeClassifier {
    pub fn new(rules: &[CategoryRule]) -> Result<Self, ConfigError> {
        let rules = GlobTable::new(
            "analysis.category_rules",
            rules.iter().map(|r| (r.pattern.as_str(), r.category)),
        )?;
        Ok(Self { rules })
    }

    /// Assign exactly one category to `change`.
    ///
    /// `commit_message` feeds the fix-keyword rule.
    pub fn classify(&self, change: &FileChange, commit_message: &str) -> Category {
        if let Some(category) = self.rules.first_match(&change.path) {
            return *category;
        }
        if is_test_path(&change.path) {
            return Category::Test;
        }
        if is_doc_path(&change.path) {
            return Category::Docs;
        }
        if change.kind == ChangeKind::Added {
            return Category::Feature;
        }
        if mentions_fix(commit_message) || change.snippet.as_deref().is_some_and(mentions_fix) {
            return Category::Fix;
        }
        if is_balanced(change) {
            Category::Refactor
        } else {
            Category::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_category_rules;

    fn classifier() -> ChangeClassifier {
        ChangeClassifier::new(&default_category_rules()).unwrap()
    }

    fn change(path: &str, kind: ChangeKind, added: usize, removed: usize) -> FileChange {
        FileChange {
            path: path.to_string(),
            old_path: None,
            kind,
            added_lines: added,
            removed_lines: removed,
            hunks: Vec::new(),
            snippet: None,
            binary: false,
        }
    }

    #[test]
    fn test_each_rule_in_isolation() {
        use ChangeKind::*;

        let cases = vec![
            ("Dockerfile", Modified, 1, 1, "", Category::Build),
            ("deploy/Dockerfile", Modified, 1, 1, "", Category::Build),
            ("config/app.yml", Modified, 1, 1, "", Category::Config),
            ("tests/parser.rs", Modified, 1, 1, "", Category::Test),
            ("src/test_utils.py", Modified, 1, 1, "", Category::Test),
            ("pkg/server_test.go", Modified, 1, 1, "", Category::Test),
            ("web/button.spec.ts", Modified, 1, 1, "", Category::Test),
            ("README.md", Modified, 1, 1, "", Category::Docs),
            ("notes.txt", Modified, 1, 1, "", Category::Docs),
            ("src/new.rs", Added, 10, 0, "", Category::Feature),
            ("src/app.py", Modified, 5, 2, "fix null pointer", Category::Fix),
            ("src/lib.rs", Modified, 10, 8, "restructure parser", Category::Refactor),
            ("src/lib.rs", Modified, 10, 1, "extend parser", Category::Other),
            ("src/lib.rs", Deleted, 0, 40, "drop legacy path", Category::Other),
        ];

        let classifier = classifier();
        for (path, kind, added, removed, message, expected) in cases {
            let actual = classifier.classify(&change(path, kind, added, removed), message);
            assert_eq!(actual, expected, "path {path} message '{message}'");
        }
    }

    #[test]
    fn test_builtin_test_patterns_compile_and_match() {
        for pattern in TEST_PATTERNS {
            assert!(
                PathMatcher::new("test pattern", &[pattern.to_string()]).is_ok(),
                "{pattern}"
            );
        }
        for path in ["tests/api.rs", "src/__tests__/a.js", "spec/models/user_spec.rb", "pkg/foo_test.go"] {
            assert!(is_test_path(path), "{path}");
        }
        assert!(!is_test_path("src/latest.rs"));
    }

    #[test]
    fn test_rule_order_build_before_test() {
        let c = change("tests/Dockerfile", ChangeKind::Modified, 1, 1);
        assert_eq!(classifier().classify(&c, ""), Category::Build);
    }

    #[test]
    fn test_rule_order_config_before_test() {
        let c = change("tests/fixtures.yml", ChangeKind::Added, 3, 0);
        assert_eq!(classifier().classify(&c, ""), Category::Config);
    }

    #[test]
    fn test_rule_order_test_before_docs() {
        let c = change("tests/fixtures/sample.md", ChangeKind::Modified, 1, 1);
        assert_eq!(classifier().classify(&c, ""), Category::Test);
    }

    #[test]
    fn test_rule_order_docs_before_feature() {
        let c = change("docs/guide.md", ChangeKind::Added, 20, 0);
        assert_eq!(classifier().classify(&c, "fix typo"), Category::Docs);
    }

    #[test]
    fn test_rule_order_feature_before_fix() {
        let c = change("src/handler.rs", ChangeKind::Added, 20, 0);
        assert_eq!(classifier().classify(&c, "fix crash"), Category::Feature);
    }

    #[test]
    fn test_rule_order_fix_before_refactor() {
        let c = change("src/handler.rs", ChangeKind::Modified, 10, 10);
        assert_eq!(classifier().classify(&c, "bug in handler"), Category::Fix);
        assert_eq!(classifier().classify(&c, "tidy handler"), Category::Refactor);
    }

    #[test]
    fn test_fix_keyword_in_snippet() {
        let mut c = change("src/io.rs", ChangeKind::Modified, 1, 1);
        c.snippet = Some("+    // FIX: handle EOF".to_string());
        assert_eq!(classifier().classify(&c, "update io"), Category::Fix);
    }

    #[test]
    fn test_fix_keyword_needs_word_boundary() {
        assert!(mentions_fix("Fixes PROJ-1"));
        assert!(mentions_fix("hotfix for login"));
        assert!(!mentions_fix("add prefix handling"));
        assert!(!mentions_fix("debugger support"));
    }

    #[test]
    fn test_custom_rules_replace_defaults() {
        let rules = vec![CategoryRule {
            pattern: "*.proto".to_string(),
            category: Category::Build,
        }];
        let classifier = ChangeClassifier::new(&rules).unwrap();
        let c = change("api/service.proto", ChangeKind::Modified, 1, 1);
        assert_eq!(classifier.classify(&c, ""), Category::Build);
        let c = change("config/app.yml", ChangeKind::Modified, 1, 5);
        assert_eq!(classifier.classify(&c, ""), Category::Other);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = classifier();
        let c = change("src/lib.rs", ChangeKind::Modified, 7, 6);
        let first = classifier.classify(&c, "rework");
        for _ in 0..10 {
            assert_eq!(classifier.classify(&c, "rework"), first);
        }
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("unknown".parse::<Category>().is_err());
    }
}
