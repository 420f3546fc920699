//! Unified diff parsing into per-file change records.
//!
//! Input is the text `git show --patch` / `git diff` produce. Each
//! `diff --git` header starts a file segment; a segment whose headers cannot
//! be understood is skipped with a [`ParseWarning`] and parsing continues
//! with the next segment.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use super::patterns::PathMatcher;

/// Upper bound on the raw snippet kept per file. The summarizer applies the
/// configured, much smaller, limit.
const MAX_CAPTURED_SNIPPET: usize = 2_000;

/// How a file was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "Added"),
            ChangeKind::Modified => write!(f, "Modified"),
            ChangeKind::Deleted => write!(f, "Deleted"),
            ChangeKind::Renamed => write!(f, "Renamed"),
        }
    }
}

/// One `@@ -a,b +c,d @@ context` hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// Function or section context git prints after the range.
    pub context: Option<String>,
}

/// A single file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    /// Previous path for renames.
    pub old_path: Option<String>,
    pub kind: ChangeKind,
    pub added_lines: usize,
    pub removed_lines: usize,
    pub hunks: Vec<Hunk>,
    /// Changed lines (with their `+`/`-` markers), bounded.
    pub snippet: Option<String>,
    pub binary: bool,
}

impl FileChange {
    pub fn lines_changed(&self) -> usize {
        self.added_lines + self.removed_lines
    }
}

/// A diff segment that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub path: Option<String>,
    /// 1-based line in the diff text where the segment starts.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "line {} ({}): {}", self.line, path, self.reason),
            None => write!(f, "line {}: {}", self.line, self.reason),
        }
    }
}

/// Result of parsing one diff.
#[derive(Debug, Clone, Default)]
pub struct ParsedDiff {
    /// Non-ignored files in diff order.
    pub files: Vec<FileChange>,
    /// Paths dropped by the ignore list.
    pub ignored: Vec<String>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse unified diff text, dropping files matched by `ignore`.
///
/// Never fails: malformed segments become warnings.
pub fn parse_unified_diff(text: &str, ignore: &PathMatcher) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let mut current: Option<Segment> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(rest) = line.strip_prefix("diff --git ") {
            finish_segment(current.take(), ignore, &mut parsed);
            current = Some(Segment::new(rest, line_no));
            continue;
        }

        // Combined (`diff --cc`) and other formats are not understood
        if line.starts_with("diff ") && current.as_ref().is_none_or(|s| !s.in_hunk) {
            finish_segment(current.take(), ignore, &mut parsed);
            let warning = ParseWarning {
                path: None,
                line: line_no,
                reason: format!("unsupported diff header '{}'", line),
            };
            warn!("Skipping diff segment at {}", warning);
            parsed.warnings.push(warning);
            continue;
        }

        if let Some(segment) = current.as_mut() {
            segment.feed(line, line_no);
        }
    }

    finish_segment(current, ignore, &mut parsed);
    parsed
}

fn finish_segment(segment: Option<Segment>, ignore: &PathMatcher, parsed: &mut ParsedDiff) {
    let Some(segment) = segment else {
        return;
    };

    match segment.finish() {
        Ok(change) => {
            let ignored = ignore.is_match(&change.path)
                || change.old_path.as_deref().is_some_and(|p| ignore.is_match(p));
            if ignored {
                debug!("Ignoring {} (matches ignore pattern)", change.path);
                parsed.ignored.push(change.path);
            } else {
                parsed.files.push(change);
            }
        }
        Err(warning) => {
            warn!("Skipping diff segment at {}", warning);
            parsed.warnings.push(warning);
        }
    }
}

fn hunk_header_regex() -> &'static Regex {
    static HUNK: OnceLock<Regex> = OnceLock::new();
    HUNK.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@ ?(.*)$")
            .expect("hunk header pattern is valid")
    })
}

/// Parse `@@ -a,b +c,d @@ context`. Omitted counts default to 1.
///
/// Numbers that do not fit, or ranges whose end would overflow, reject the header.
fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let caps = hunk_header_regex().captures(line)?;
    let number = |i: usize, default: usize| -> Option<usize> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let context = caps
        .get(5)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let hunk = Hunk {
        old_start: number(1, 0)?,
        old_count: number(2, 1)?,
        new_start: number(3, 0)?,
        new_count: number(4, 1)?,
        context,
    };

    // Both ranges must be representable
    hunk.old_start.checked_add(hunk.old_count)?;
    hunk.new_start.checked_add(hunk.new_count)?;
    Some(hunk)
}

/// Split the `a/<old> b/<new>` part of a `diff --git` line.
fn parse_git_header(rest: &str) -> Option<(String, String)> {
    let rest = rest.trim_end();

    if rest.starts_with('"') {
        let (old, remainder) = unquote_c_style(rest)?;
        let new = path_text(remainder.trim_start());
        return Some((strip_side(&old)?, strip_side(&new)?));
    }

    if !rest.starts_with("a/") {
        return None;
    }

    // Only the new side is quoted
    if rest.ends_with('"')
        && let Some((old, new)) = rest.split_once(" \"b/")
    {
        let quoted = format!("\"b/{new}");
        let (new, _) = unquote_c_style(&quoted)?;
        return Some((old.get(2..)?.to_string(), strip_side(&new)?));
    }

    // Unchanged path: the header is symmetric, which also copes with spaces.
    if rest.len() % 2 == 1 {
        let mid = rest.len() / 2;
        if let (Some(old), Some(new)) = (rest.get(..mid), rest.get(mid..))
            && let Some(new) = new.strip_prefix(" b/")
            && old.get(2..) == Some(new)
        {
            return Some((new.to_string(), new.to_string()));
        }
    }

    let (old, new) = rest.split_once(" b/")?;
    Some((old.get(2..)?.to_string(), new.to_string()))
}

/// Decode a path git wrote in C-style quotes, e.g. `"src/caf\303\251.py"`.
///
/// Returns the decoded path and the text after the closing quote. Octal
/// escapes are raw bytes and are decoded as UTF-8.
fn unquote_c_style(raw: &str) -> Option<(String, &str)> {
    let body = raw.strip_prefix('"')?;
    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                let path = String::from_utf8_lossy(&bytes).into_owned();
                return Some((path, &body[i + 1..]));
            }
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'a' => bytes.push(0x07),
                    'b' => bytes.push(0x08),
                    't' => bytes.push(b'\t'),
                    'n' => bytes.push(b'\n'),
                    'v' => bytes.push(0x0b),
                    'f' => bytes.push(0x0c),
                    'r' => bytes.push(b'\r'),
                    '0'..='7' => {
                        let mut value = escaped.to_digit(8)?;
                        for _ in 0..2 {
                            let (_, digit) = chars.next()?;
                            value = value * 8 + digit.to_digit(8)?;
                        }
                        bytes.push(u8::try_from(value).ok()?);
                    }
                    other => push_char(&mut bytes, other),
                }
            }
            other => push_char(&mut bytes, other),
        }
    }

    None
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// A path as written on a header line, decoded when quoted.
fn path_text(raw: &str) -> String {
    let raw = raw.trim_end();
    if raw.starts_with('"')
        && let Some((path, _)) = unquote_c_style(raw)
    {
        return path;
    }
    raw.trim_matches('"').to_string()
}

/// Path from a `---`/`+++` line; `None` for `/dev/null`.
fn side_path(raw: &str) -> Option<String> {
    let raw = raw.trim_end();
    if raw.starts_with('"') {
        return strip_side(&path_text(raw));
    }
    // Some tools append a tab and timestamp after the path
    strip_side(raw.split('\t').next().unwrap_or(raw).trim_end())
}

/// Strip the `a/`/`b/` prefix; `None` for `/dev/null`.
fn strip_side(path: &str) -> Option<String> {
    if path == "/dev/null" {
        return None;
    }
    let path = path
        .strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path);
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Accumulates one file segment.
struct Segment {
    start_line: usize,
    header_paths: Option<(String, String)>,
    minus_path: Option<Option<String>>,
    plus_path: Option<Option<String>>,
    rename_from: Option<String>,
    rename_to: Option<String>,
    new_file: bool,
    deleted_file: bool,
    binary: bool,
    hunks: Vec<Hunk>,
    in_hunk: bool,
    remaining_old: usize,
    remaining_new: usize,
    added: usize,
    removed: usize,
    snippet: String,
    error: Option<String>,
}

impl Segment {
    fn new(header: &str, start_line: usize) -> Self {
        Self {
            start_line,
            header_paths: parse_git_header(header),
            minus_path: None,
            plus_path: None,
            rename_from: None,
            rename_to: None,
            new_file: false,
            deleted_file: false,
            binary: false,
            hunks: Vec::new(),
            in_hunk: false,
            remaining_old: 0,
            remaining_new: 0,
            added: 0,
            removed: 0,
            snippet: String::new(),
            error: None,
        }
    }

    fn feed(&mut self, line: &str, line_no: usize) {
        if self.error.is_some() {
            return;
        }

        if self.in_hunk {
            self.feed_hunk_line(line);
            return;
        }

        if line.starts_with("@@") {
            match parse_hunk_header(line) {
                Some(hunk) => {
                    self.remaining_old = hunk.old_count;
                    self.remaining_new = hunk.new_count;
                    self.in_hunk = self.remaining_old > 0 || self.remaining_new > 0;
                    self.hunks.push(hunk);
                }
                None => {
                    self.error = Some(format!("malformed hunk header at line {}", line_no));
                }
            }
        } else if line.starts_with("new file mode") {
            self.new_file = true;
        } else if line.starts_with("deleted file mode") {
            self.deleted_file = true;
        } else if let Some(path) = line.strip_prefix("rename from ") {
            self.rename_from = Some(path_text(path));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            self.rename_to = Some(path_text(path));
        } else if let Some(path) = line.strip_prefix("--- ") {
            self.minus_path = Some(side_path(path));
        } else if let Some(path) = line.strip_prefix("+++ ") {
            self.plus_path = Some(side_path(path));
        } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
            self.binary = true;
        }
    }

    fn feed_hunk_line(&mut self, line: &str) {
        match line.chars().next() {
            Some('+') => {
                self.added += 1;
                self.remaining_new = self.remaining_new.saturating_sub(1);
                self.capture(line);
            }
            Some('-') => {
                self.removed += 1;
                self.remaining_old = self.remaining_old.saturating_sub(1);
                self.capture(line);
            }
            Some('\\') => {}
            // Context line; an empty line is context whose leading space was stripped
            _ => {
                self.remaining_old = self.remaining_old.saturating_sub(1);
                self.remaining_new = self.remaining_new.saturating_sub(1);
            }
        }

        if self.remaining_old == 0 && self.remaining_new == 0 {
            self.in_hunk = false;
        }
    }

    fn capture(&mut self, line: &str) {
        if self.snippet.len() >= MAX_CAPTURED_SNIPPET {
            return;
        }
        if !self.snippet.is_empty() {
            self.snippet.push('\n');
        }
        self.snippet.push_str(line);
    }

    fn finish(self) -> Result<FileChange, ParseWarning> {
        let fallback_path = self
            .header_paths
            .as_ref()
            .map(|(_, new)| new.clone())
            .or_else(|| self.plus_path.clone().flatten())
            .or_else(|| self.minus_path.clone().flatten());

        if let Some(reason) = self.error {
            return Err(ParseWarning {
                path: fallback_path,
                line: self.start_line,
                reason,
            });
        }

        let old_path = self
            .rename_from
            .clone()
            .or_else(|| self.minus_path.clone().flatten())
            .or_else(|| self.header_paths.as_ref().map(|(old, _)| old.clone()));
        let new_path = self
            .rename_to
            .clone()
            .or_else(|| self.plus_path.clone().flatten())
            .or_else(|| self.header_paths.as_ref().map(|(_, new)| new.clone()));

        let added_marker = self.new_file || matches!(self.minus_path, Some(None));
        let deleted_marker = self.deleted_file || matches!(self.plus_path, Some(None));

        let kind = if added_marker {
            ChangeKind::Added
        } else if deleted_marker {
            ChangeKind::Deleted
        } else if self.rename_from.is_some() || self.rename_to.is_some() {
            ChangeKind::Renamed
        } else {
            ChangeKind::Modified
        };

        let path = match kind {
            ChangeKind::Deleted => old_path.clone().or(new_path),
            _ => new_path.or_else(|| old_path.clone()),
        };

        let Some(path) = path else {
            return Err(ParseWarning {
                path: None,
                line: self.start_line,
                reason: "unparseable diff header".to_string(),
            });
        };

        let old_path = match kind {
            ChangeKind::Renamed => old_path.filter(|old| *old != path),
            _ => None,
        };

        Ok(FileChange {
            path,
            old_path,
            kind,
            added_lines: self.added,
            removed_lines: self.removed,
            hunks: self.hunks,
            snippet: (!self.snippet.is_empty()).then_some(self.snippet),
            binary: self.binary,
        })
    }
}
