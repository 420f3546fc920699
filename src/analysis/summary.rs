//! Bounded narrative summaries of classified file changes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{AnalysisConfig, DetailLevel};

use super::classify::Category;
use super::diff::{ChangeKind, FileChange, Hunk};
use super::patterns::file_name;

/// Narrative used when nothing qualifies for a summary.
pub const NO_CHANGES: &str = "No significant changes detected";

const ELLIPSIS: &str = "...";

/// A file change together with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedChange {
    pub change: FileChange,
    pub category: Category,
}

/// Summarizer limits, taken from the `analysis` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    pub detail_level: DetailLevel,
    pub max_files: usize,
    pub max_changes_per_file: usize,
    pub include_snippets: bool,
    pub max_snippet_length: usize,
}

impl From<&AnalysisConfig> for SummaryOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            detail_level: config.detail_level,
            max_files: config.max_files,
            max_changes_per_file: config.max_changes_per_file,
            include_snippets: config.include_snippets,
            max_snippet_length: config.max_snippet_length,
        }
    }
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

/// One file kept in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    pub category: Category,
    pub language: &'static str,
    pub added_lines: usize,
    pub removed_lines: usize,
    pub change_points: Vec<String>,
    pub snippet: Option<String>,
}

impl FileSummary {
    /// `Modified Python file`, `Renamed Rust file (from src/a.rs)`, ...
    pub fn description(&self) -> String {
        match (&self.kind, &self.old_path) {
            (ChangeKind::Renamed, Some(old)) => {
                format!("Renamed {} file (from {})", self.language, old)
            }
            (kind, _) => format!("{} {} file", kind, self.language),
        }
    }
}

/// Bounded, ordered summary of one commit or push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub narrative: String,
    /// Files kept after `max_files` truncation, most significant first.
    pub files: Vec<FileSummary>,
    /// Files dropped by `max_files`.
    pub omitted_files: usize,
    pub total_files: usize,
    pub total_added: usize,
    pub total_removed: usize,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }

    /// Aggregate note for files beyond `max_files`.
    pub fn omitted_note(&self) -> Option<String> {
        (self.omitted_files > 0).then(|| format!("+{} more {}", self.omitted_files, files_word(self.omitted_files)))
    }
}

fn files_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Truncate to at most `max` characters, marking the cut with `...`.
///
/// The marker counts toward the limit.
pub fn truncate_snippet(snippet: &str, max: usize) -> String {
    if snippet.chars().count() <= max {
        return snippet.to_string();
    }
    if max <= ELLIPSIS.len() {
        return snippet.chars().take(max).collect();
    }
    let mut truncated: String = snippet.chars().take(max - ELLIPSIS.len()).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Human-readable language name from the file extension.
pub fn language_for(path: &str) -> &'static str {
    let name = file_name(path);
    if name == "Dockerfile" {
        return "Docker";
    }
    if name == "Makefile" {
        return "Make";
    }

    let Some((_, ext)) = name.rsplit_once('.') else {
        return "Unknown";
    };

    match ext.to_lowercase().as_str() {
        "py" => "Python",
        "rs" => "Rust",
        "js" | "mjs" | "cjs" => "JavaScript",
        "ts" => "TypeScript",
        "jsx" => "React JSX",
        "tsx" => "React TSX",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "c" | "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "md" | "markdown" => "Markdown",
        "json" => "JSON",
        "xml" => "XML",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "sql" => "SQL",
        "sh" | "bash" => "Shell",
        "bat" => "Batch",
        "ps1" => "PowerShell",
        _ => "Unknown",
    }
}

fn change_point(hunk: &Hunk) -> String {
    let range = |label: &str, start: usize, count: usize| {
        if count <= 1 {
            format!("{} {}", label, start)
        } else {
            format!("{}s {}-{}", label, start, start.saturating_add(count - 1))
        }
    };

    let location = if hunk.new_count > 0 {
        range("line", hunk.new_start, hunk.new_count)
    } else {
        format!("removed {}", range("line", hunk.old_start, hunk.old_count))
    };

    match &hunk.context {
        Some(context) => format!("{} in {}", location, context),
        None => location,
    }
}

fn summarize_file(entry: &ClassifiedChange, options: &SummaryOptions) -> FileSummary {
    let change = &entry.change;

    let change_points = change
        .hunks
        .iter()
        .take(options.max_changes_per_file)
        .map(change_point)
        .collect();

    let snippet = change
        .snippet
        .as_deref()
        .filter(|_| options.include_snippets && options.max_snippet_length > 0)
        .map(|s| truncate_snippet(s, options.max_snippet_length));

    FileSummary {
        path: change.path.clone(),
        old_path: change.old_path.clone(),
        kind: change.kind,
        category: entry.category,
        language: language_for(&change.path),
        added_lines: change.added_lines,
        removed_lines: change.removed_lines,
        change_points,
        snippet,
    }
}

/// Extension breakdown such as `2 .py, 1 .rs`, or `None` for a single type.
fn file_types(changes: &[ClassifiedChange]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in changes {
        if let Some((_, ext)) = file_name(&entry.change.path).rsplit_once('.') {
            *counts.entry(ext).or_default() += 1;
        }
    }

    (counts.len() > 1).then(|| {
        counts
            .iter()
            .map(|(ext, count)| format!("{} .{}", count, ext))
            .collect::<Vec<_>>()
            .join(", ")
    })
}

fn narrative_lines(file: &FileSummary, level: DetailLevel) -> Vec<String> {
    match level {
        DetailLevel::Basic => vec![format!("- {}: {}", file.path, file.description())],
        DetailLevel::Detailed | DetailLevel::Comprehensive => {
            let mut lines = vec![format!(
                "- {} [{}]: {} (+{}/-{})",
                file.path,
                file.category,
                file.description(),
                file.added_lines,
                file.removed_lines
            )];
            lines.extend(file.change_points.iter().map(|p| format!("  - {}", p)));

            if level == DetailLevel::Comprehensive
                && let Some(snippet) = &file.snippet
            {
                lines.push("{noformat}".to_string());
                lines.push(snippet.clone());
                lines.push("{noformat}".to_string());
            }
            lines
        }
    }
}

/// Build the bounded summary.
///
/// Files are ordered by lines changed, descending, ties keeping input
/// order. Totals always cover every input file, including those beyond
/// `max_files`.
pub fn summarize(changes: &[ClassifiedChange], options: &SummaryOptions) -> ChangeSummary {
    let total_added = changes.iter().map(|c| c.change.added_lines).sum();
    let total_removed = changes.iter().map(|c| c.change.removed_lines).sum();

    if changes.is_empty() {
        return ChangeSummary {
            narrative: NO_CHANGES.to_string(),
            files: Vec::new(),
            omitted_files: 0,
            total_files: 0,
            total_added,
            total_removed,
        };
    }

    let mut ordered: Vec<&ClassifiedChange> = changes.iter().collect();
    // sort_by is stable, so ties keep their original order
    ordered.sort_by(|a, b| b.change.lines_changed().cmp(&a.change.lines_changed()));

    let files: Vec<FileSummary> = ordered
        .iter()
        .take(options.max_files)
        .map(|entry| summarize_file(entry, options))
        .collect();
    let omitted_files = changes.len() - files.len();

    let mut summary = ChangeSummary {
        narrative: String::new(),
        files,
        omitted_files,
        total_files: changes.len(),
        total_added,
        total_removed,
    };

    let mut lines = vec![format!(
        "Changed {} {} with {} additions and {} deletions.",
        summary.total_files,
        files_word(summary.total_files),
        total_added,
        total_removed
    )];

    if options.detail_level != DetailLevel::Basic
        && let Some(types) = file_types(changes)
    {
        lines.push(format!("File types: {}", types));
    }

    lines.push(String::new());
    for file in &summary.files {
        lines.extend(narrative_lines(file, options.detail_level));
    }
    if let Some(note) = summary.omitted_note() {
        lines.push(note);
    }

    summary.narrative = lines.join("\n");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, added: usize, removed: usize, category: Category) -> ClassifiedChange {
        ClassifiedChange {
            change: FileChange {
                path: path.to_string(),
                old_path: None,
                kind: ChangeKind::Modified,
                added_lines: added,
                removed_lines: removed,
                hunks: vec![
                    Hunk {
                        old_start: 1,
                        old_count: 3,
                        new_start: 1,
                        new_count: 4,
                        context: Some("fn first()".to_string()),
                    },
                    Hunk {
                        old_start: 20,
                        old_count: 2,
                        new_start: 21,
                        new_count: 0,
                        context: None,
                    },
                    Hunk {
                        old_start: 40,
                        old_count: 1,
                        new_start: 40,
                        new_count: 1,
                        context: None,
                    },
                ],
                snippet: Some("+let value = compute_something_rather_long(argument);".to_string()),
                binary: false,
            },
            category,
        }
    }

    fn options(max_files: usize, level: DetailLevel) -> SummaryOptions {
        SummaryOptions {
            detail_level: level,
            max_files,
            max_changes_per_file: 2,
            include_snippets: true,
            max_snippet_length: 20,
        }
    }

    #[test]
    fn test_empty_input_uses_placeholder() {
        let summary = summarize(&[], &SummaryOptions::default());
        assert_eq!(summary.narrative, NO_CHANGES);
        assert!(summary.files.is_empty());
        assert!(summary.is_empty());
    }

    #[test]
    fn test_orders_by_lines_changed_with_stable_ties() {
        let changes = vec![
            entry("a.rs", 1, 1, Category::Other),
            entry("b.rs", 10, 0, Category::Other),
            entry("c.rs", 2, 0, Category::Other),
            entry("d.rs", 0, 2, Category::Other),
        ];
        let summary = summarize(&changes, &options(10, DetailLevel::Basic));
        let paths: Vec<&str> = summary.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["b.rs", "a.rs", "c.rs", "d.rs"]);
    }

    #[test]
    fn test_max_files_keeps_totals_and_notes_omitted() {
        let changes: Vec<_> = (0..12)
            .map(|i| entry(&format!("src/file{i}.rs"), i + 1, 1, Category::Other))
            .collect();
        let summary = summarize(&changes, &options(5, DetailLevel::Detailed));

        assert_eq!(summary.files.len(), 5);
        assert_eq!(summary.omitted_files, 7);
        assert_eq!(summary.total_files, 12);
        assert_eq!(summary.total_added, (1..=12).sum::<usize>());
        assert!(summary.narrative.starts_with("Changed 12 files with 78 additions and 12 deletions."));
        assert!(summary.narrative.ends_with("+7 more files"));
    }

    #[test]
    fn test_truncation_laws() {
        let changes: Vec<_> = (0..8)
            .map(|i| entry(&format!("f{i}.rs"), 3, 3, Category::Refactor))
            .collect();
        let opts = options(3, DetailLevel::Comprehensive);
        let summary = summarize(&changes, &opts);

        assert!(summary.files.len() <= opts.max_files);
        for file in &summary.files {
            assert!(file.change_points.len() <= opts.max_changes_per_file);
            let snippet = file.snippet.as_deref().unwrap();
            assert!(snippet.chars().count() <= opts.max_snippet_length);
        }
    }

    #[test]
    fn test_change_points_describe_hunks() {
        let summary = summarize(
            &[entry("src/lib.rs", 4, 3, Category::Refactor)],
            &options(5, DetailLevel::Detailed),
        );
        assert_eq!(
            summary.files[0].change_points,
            vec!["lines 1-4 in fn first()".to_string(), "removed lines 20-21".to_string()]
        );
    }

    #[test]
    fn test_detail_levels() {
        let changes = vec![entry("src/app.py", 5, 2, Category::Fix)];

        let basic = summarize(&changes, &options(5, DetailLevel::Basic)).narrative;
        assert!(basic.contains("- src/app.py: Modified Python file"));
        assert!(!basic.contains("[fix]"));
        assert!(!basic.contains("lines 1-4"));

        let detailed = summarize(&changes, &options(5, DetailLevel::Detailed)).narrative;
        assert!(detailed.contains("- src/app.py [fix]: Modified Python file (+5/-2)"));
        assert!(detailed.contains("  - lines 1-4 in fn first()"));
        assert!(!detailed.contains("{noformat}"));

        let comprehensive = summarize(&changes, &options(5, DetailLevel::Comprehensive)).narrative;
        assert!(comprehensive.contains("{noformat}\n+let value = comp...\n{noformat}"));
    }

    #[test]
    fn test_snippets_can_be_disabled() {
        let mut opts = options(5, DetailLevel::Comprehensive);
        opts.include_snippets = false;
        let summary = summarize(&[entry("a.rs", 1, 1, Category::Other)], &opts);
        assert!(summary.files[0].snippet.is_none());
        assert!(!summary.narrative.contains("{noformat}"));
    }

    #[test]
    fn test_file_types_line_for_mixed_extensions() {
        let changes = vec![
            entry("a.py", 1, 0, Category::Other),
            entry("b.py", 1, 0, Category::Other),
            entry("c.rs", 1, 0, Category::Other),
        ];
        let summary = summarize(&changes, &options(5, DetailLevel::Detailed));
        assert!(summary.narrative.contains("File types: 2 .py, 1 .rs"));
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("short", 10), "short");
        assert_eq!(truncate_snippet("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_snippet("this is too long", 10), "this is...");
        assert_eq!(truncate_snippet("abcdef", 2), "ab");
        assert_eq!(truncate_snippet("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_language_for() {
        assert_eq!(language_for("src/app.py"), "Python");
        assert_eq!(language_for("deploy/Dockerfile"), "Docker");
        assert_eq!(language_for("LICENSE"), "Unknown");
        assert_eq!(language_for("web/App.TSX"), "React TSX");
    }

    #[test]
    fn test_renamed_description_mentions_old_path() {
        let file = FileSummary {
            path: "src/new.rs".to_string(),
            old_path: Some("src/old.rs".to_string()),
            kind: ChangeKind::Renamed,
            category: Category::Other,
            language: "Rust",
            added_lines: 0,
            removed_lines: 0,
            change_points: Vec::new(),
            snippet: None,
        };
        assert_eq!(file.description(), "Renamed Rust file (from src/old.rs)");
    }

    #[test]
    fn test_change_point_at_end_of_range_does_not_overflow() {
        let hunk = Hunk {
            old_start: 1,
            old_count: 1,
            new_start: usize::MAX,
            new_count: 2,
            context: None,
        };
        assert_eq!(change_point(&hunk), format!("lines {}-{}", usize::MAX, usize::MAX));
    }
}
