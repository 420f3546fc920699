//! Placeholder substitution for comment templates.

/// Jira wiki-markup template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "\
*Code changes pushed by {author} on {date}*

*Commit:* {commit_hash}
*Message:* {commit_message}

h2. Summary of Changes
{summary}

h3. Files Changed
{files_changed}

[View full changes|{commit_url}]";

/// The recognized placeholder names.
pub const PLACEHOLDERS: [&str; 7] = [
    "commit_hash",
    "commit_message",
    "author",
    "date",
    "summary",
    "files_changed",
    "commit_url",
];

/// Values for each recognized placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    pub commit_hash: String,
    pub commit_message: String,
    pub author: String,
    pub date: String,
    pub summary: String,
    pub files_changed: String,
    pub commit_url: String,
}

impl TemplateValues {
    fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "commit_hash" => &self.commit_hash,
            "commit_message" => &self.commit_message,
            "author" => &self.author,
            "date" => &self.date,
            "summary" => &self.summary,
            "files_changed" => &self.files_changed,
            "commit_url" => &self.commit_url,
            _ => return None,
        };
        Some(value)
    }
}

/// Whether `template` uses at least one recognized placeholder.
pub fn has_placeholder(template: &str) -> bool {
    PLACEHOLDERS
        .iter()
        .any(|name| template.contains(&format!("{{{}}}", name)))
}

/// Substitute recognized placeholders in a single left-to-right pass.
///
/// Substituted values are not rescanned. Unrecognized `{...}` sequences and
/// stray braces are copied through unchanged.
pub fn render_template(template: &str, values: &TemplateValues) -> String {
    let mut out = String::with_capacity(template.len() + values.summary.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substitution = after
            .find('}')
            .and_then(|close| values.get(&after[..close]).map(|value| (close, value)));

        match substitution {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> TemplateValues {
        TemplateValues {
            commit_hash: "abc1234".to_string(),
            commit_message: "PROJ-1: fix".to_string(),
            author: "Dev".to_string(),
            date: "2024-05-01 12:00:00".to_string(),
            summary: "Changed 1 file".to_string(),
            files_changed: "* src/app.py".to_string(),
            commit_url: "#".to_string(),
        }
    }

    #[test]
    fn test_substitutes_recognized_placeholders() {
        let out = render_template("Commit {commit_hash} by {author}: {summary}", &values());
        assert_eq!(out, "Commit abc1234 by Dev: Changed 1 file");
    }

    #[test]
    fn test_unknown_placeholders_left_verbatim() {
        let out = render_template("{ticket} {author} {unknown stuff} {", &values());
        assert_eq!(out, "{ticket} Dev {unknown stuff} {");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut v = values();
        v.commit_message = "literal {author} in message".to_string();
        let out = render_template("{commit_message}", &v);
        assert_eq!(out, "literal {author} in message");
    }

    #[test]
    fn test_nested_braces() {
        assert_eq!(render_template("{{author}}", &values()), "{Dev}");
        assert_eq!(render_template("}{author}{", &values()), "}Dev{");
    }

    #[test]
    fn test_default_template_uses_every_placeholder() {
        for name in PLACEHOLDERS {
            assert!(DEFAULT_TEMPLATE.contains(&format!("{{{name}}}")), "{name}");
        }
        let out = render_template(DEFAULT_TEMPLATE, &values());
        assert!(!out.contains("{summary}"));
        assert!(out.contains("[View full changes|#]"));
    }

    #[test]
    fn test_has_placeholder() {
        assert!(has_placeholder("see {commit_url}"));
        assert!(!has_placeholder("static text {ticket}"));
        assert!(!has_placeholder(""));
    }
}
