//! jira-update - CLI entry point.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use jira_update::analysis::{ChangeSummary, CommitAnalysis};
use jira_update::comment::CommentPayload;

use jira_update::config::Config;
use jira_update::git::{CommitUrls, collect_push, commit_input, open_repository, resolve_reference};
use jira_update::hook::{HookKind, Pipeline, TicketUpdate, install_hook, process_push};
use jira_update::jira::JiraClient;
use jira_update::llm::narrate;
use jira_update::logging;

/// Post commit summaries to the Jira tickets they reference.
#[derive(Parser, Debug)]
#[command(name = "jira-update")]
#[command(about = "Post commit summaries to the Jira tickets they reference")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a pushed range and comment on every referenced ticket
    Run {
        /// Start of the range (exclusive); all zeros or omitted means from the root
        #[arg(long)]
        base_ref: Option<String>,

        /// End of the range (inclusive)
        #[arg(long, default_value = "HEAD")]
        head_ref: String,

        /// Print the comments instead of posting them
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the comment for one commit without posting it to Jira
    Analyze {
        /// Commit to analyze
        #[arg(long, default_value = "HEAD")]
        rev: String,

        /// Print the analysis, summary and payload as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Install a git hook that runs jira-update automatically
    Install {
        /// Hook to install
        #[arg(long, value_enum, default_value_t = HookKind::PostCommit)]
        hook: HookKind,

        /// Replace an existing hook without asking
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Path inside the git repository
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,

    /// Configuration file (defaults to .jira-update.yml at the repository root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (overrides advanced.log_level)
    #[arg(long)]
    log_level: Option<String>,

    /// Append logs to this file (overrides advanced.log_file)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl CommonArgs {
    /// Load the configuration and start logging.
    fn setup(&self) -> Result<Config> {
        let repo_root = repository_root(&self.repo_path);
        let config = Config::resolve(self.config.as_deref(), &repo_root)
            .context("Failed to load configuration")?;

        let level = self
            .log_level
            .as_deref()
            .unwrap_or(config.advanced.log_level.as_str());
        let log_file = self.log_file.as_deref().or(config.advanced.log_file.as_deref());
        logging::init(level, log_file).context("Failed to open log file")?;

        Ok(config)
    }
}

/// Working directory of the repository containing `path`, or `path` itself.
fn repository_root(path: &Path) -> PathBuf {
    open_repository(path)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            base_ref,
            head_ref,
            dry_run,
            common,
        } => run(&common, base_ref.as_deref(), &head_ref, dry_run).await,
        Command::Analyze { rev, json, common } => analyze(&common, &rev, json).await,
        Command::Install {
            hook,
            force,
            common,
        } => install(&common, hook, force),
    }
}

async fn run(common: &CommonArgs, base_ref: Option<&str>, head_ref: &str, dry_run: bool) -> Result<()> {
    let config = common.setup()?;
    let pipeline = Pipeline::from_config(&config).context("Invalid configuration")?;

    let repo = open_repository(&common.repo_path)
        .context("Not a git repository. Run jira-update from within a git repository.")?;
    let urls = CommitUrls::for_repository(&repo, config.git.commit_url_template.as_deref());
    let commits = collect_push(&repo, base_ref, head_ref, config.git.max_commits, &urls)
        .context("Failed to collect commits")?;

    if commits.is_empty() {
        println!("No new commits. Nothing to do.");
        return Ok(());
    }

    if dry_run {
        let updates = pipeline.plan(commits).await;
        if updates.is_empty() {
            println!("No ticket references found.");
        }
        for update in &updates {
            print_update(update);
        }
        return Ok(());
    }

    let client = JiraClient::from_config(&config.jira).context("Jira is not configured")?;
    let outcome = process_push(&client, &pipeline, commits).await;

    println!(
        "Updated {} ticket(s), skipped {}, failed {}",
        outcome.updated.len(),
        outcome.skipped.len(),
        outcome.failed.len()
    );
    for (ticket, reason) in &outcome.failed {
        eprintln!("  {}: {}", ticket, reason);
    }

    if !outcome.is_success() {
        anyhow::bail!("{} ticket update(s) failed", outcome.failed.len());
    }
    Ok(())
}

/// Machine-readable output of `analyze --json`.
#[derive(Serialize)]
struct AnalyzeReport<'a> {
    analysis: &'a CommitAnalysis,
    summary: &'a ChangeSummary,
    payload: &'a CommentPayload,
}

async fn analyze(common: &CommonArgs, rev: &str, json: bool) -> Result<()> {
    let config = common.setup()?;
    let pipeline = Pipeline::from_config(&config).context("Invalid configuration")?;

    let repo = open_repository(&common.repo_path)
        .context("Not a git repository. Run jira-update from within a git repository.")?;
    let oid = resolve_reference(&repo, rev).context("Failed to resolve revision")?;
    let commit = repo.find_commit(oid).context("Failed to read commit")?;
    let urls = CommitUrls::for_repository(&repo, config.git.commit_url_template.as_deref());
    let input = commit_input(&repo, &commit, urls.url_for(&oid.to_string()))
        .context("Failed to read commit diff")?;

    let analysis = pipeline.analyzer.analyze_commit(input);
    let mut summary = pipeline.analyzer.summarize(&[&analysis]);
    if let Some(narrator) = &pipeline.narrator {
        let include_snippets = pipeline.analyzer.summary_options().include_snippets;
        summary = narrate(narrator.as_ref(), &[&analysis], summary, include_snippets).await;
    }
    let payload = pipeline.renderer.render(&[&analysis], &summary);

    if json {
        let report = AnalyzeReport {
            analysis: &analysis,
            summary: &summary,
            payload: &payload,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize analysis")?
        );
        return Ok(());
    }

    let tickets: Vec<&str> = analysis.tickets.iter().map(|t| t.as_str()).collect();
    println!(
        "Tickets: {}",
        if tickets.is_empty() { "none".to_string() } else { tickets.join(", ") }
    );
    if !payload.labels.is_empty() {
        let labels: Vec<&str> = payload.labels.iter().map(String::as_str).collect();
        println!("Labels: {}", labels.join(", "));
    }
    println!("\n{}", payload.text);
    Ok(())
}

fn install(common: &CommonArgs, hook: HookKind, force: bool) -> Result<()> {
    logging::init(common.log_level.as_deref().unwrap_or(logging::DEFAULT_LEVEL), None)
        .context("Failed to initialize logging")?;

    let config_path = common
        .config
        .as_deref()
        .map(|p| p.canonicalize().with_context(|| format!("Config file {} not found", p.display())))
        .transpose()?;

    let path = install_hook(&common.repo_path, hook, config_path.as_deref(), force)
        .context("Failed to install hook")?;
    println!("✓ Installed {}", path.display());
    Ok(())
}

fn print_update(update: &TicketUpdate) {
    println!("--- {} ({}) ---", update.ticket, update.commits.join(", "));
    if !update.payload.labels.is_empty() {
        let labels: Vec<&str> = update.payload.labels.iter().map(String::as_str).collect();
        println!("Labels: {}", labels.join(", "));
    }
    println!("{}\n", update.payload.text);
}
