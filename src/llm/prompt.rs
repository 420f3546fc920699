//! Prompt construction for AI summaries.

use crate::analysis::{ChangeSummary, CommitAnalysis};

/// Snippets included in one prompt; keeps the request small.
const MAX_PROMPT_SNIPPETS: usize = 2;

pub const SYSTEM_PROMPT: &str =
    "You are a technical code reviewer who provides concise, accurate summaries of code changes.";

/// Build the user prompt for the commits behind one ticket update.
///
/// Commit messages and snippets are sanitized to keep them from breaking
/// out of their fences.
pub fn build_summary_prompt(
    commits: &[&CommitAnalysis],
    summary: &ChangeSummary,
    include_snippets: bool,
) -> String {
    let mut prompt = String::from("Summarize the following code changes in a concise, technical manner.\n");

    prompt.push_str("\nCommit messages:\n");
    for analysis in commits {
        prompt.push_str(&format!("- {}\n", sanitize_for_prompt(&analysis.commit.message)));
    }

    prompt.push_str(&format!(
        "\nFiles changed ({} total, +{} -{}):\n",
        summary.total_files, summary.total_added, summary.total_removed
    ));
    for file in &summary.files {
        prompt.push_str(&format!("- {}: {}\n", file.path, file.description()));
    }
    if let Some(note) = summary.omitted_note() {
        prompt.push_str(&format!("- {}\n", note));
    }

    if include_snippets {
        let snippets = summary
            .files
            .iter()
            .filter_map(|f| f.snippet.as_deref().map(|s| (f.path.as_str(), s)))
            .take(MAX_PROMPT_SNIPPETS);
        for (path, snippet) in snippets {
            prompt.push_str(&format!(
                "\nSnippet from {}:\n```\n{}\n```\n",
                path,
                sanitize_for_prompt(snippet)
            ));
        }
    }

    prompt.push_str(
        "\nProvide a technical summary of what these changes accomplish and their potential impact. \
         Answer in plain text without headings.",
    );
    prompt
}

/// Neutralize code fences and cap the length of untrusted text.
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("```", "'''")
        .lines()
        .take(50)
        .collect::<Vec<_>>()
        .join("\n")
}
