//! commit-formatter - CLI entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use commit_formatter::config::{ActionConfig, RewriterArgs, RewriterConfig, RunArgs};
use commit_formatter::git::{current_branch, read_commit};
use commit_formatter::orchestrator::{Orchestrator, Outcome, RewriteRequest};
use commit_formatter::outputs::ActionOutputs;
use commit_formatter::publish::{GitPublisher, NoopPublisher, Publisher};
use commit_formatter::rewriter::OpenRouterRewriter;

/// Rewrite the latest commit message into Conventional Commits format.
#[derive(Parser, Debug)]
#[command(name = "commit-formatter")]
#[command(about = "Rewrite the latest commit message into Conventional Commits format")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show how a message would be rewritten, without touching git
    Preview {
        /// The commit message to format
        message: String,

        #[command(flatten)]
        rewriter: RewriterArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Command::Preview { message, rewriter }) => preview(&message, rewriter).await,
        None => run(cli.run).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "commit_formatter=debug"
    } else {
        "commit_formatter=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Rewrite the configured commit and publish it unless this is a dry run.
async fn run(args: RunArgs) -> Result<()> {
    let config = ActionConfig::from_args(args).context("Invalid configuration")?;

    let source = read_commit(&config.repo_path, &config.sha)
        .with_context(|| format!("Failed to read commit {}", config.sha))?;
    info!("Original commit message: {}", source.message);

    let request = match resolve_branch(&config)
        .and_then(|branch| build_request(&config.rewriter, &source.message, &branch))
    {
        Ok(request) => request.with_dry_run(config.dry_run),
        Err(e) => {
            ActionOutputs::failed(&source.message)
                .write(config.output_file.as_deref())
                .context("Failed to write action outputs")?;
            return Err(e);
        }
    };

    let rewriter = OpenRouterRewriter::new(&config.rewriter.api_key);
    let publisher: Box<dyn Publisher> = if config.dry_run {
        Box::new(NoopPublisher)
    } else {
        Box::new(
            GitPublisher::new(&config.repo_path, config.push_target.clone())
                .with_expected_head(&source.sha),
        )
    };

    let report = Orchestrator::new(&rewriter, publisher.as_ref())
        .with_rewrite_timeout(rewriter.max_duration())
        .run(&request)
        .await;

    let outputs = match &report {
        Ok(report) => ActionOutputs::from(&report.result),
        Err(e) => e
            .result()
            .map(ActionOutputs::from)
            .unwrap_or_else(|| ActionOutputs::failed(&source.message)),
    };
    outputs
        .write(config.output_file.as_deref())
        .context("Failed to write action outputs")?;

    let report = report.context("Commit message was not rewritten")?;
    match report.outcome {
        Outcome::Published => info!("Formatted message: {}", report.result.formatted_message),
        Outcome::DryRun => info!("Dry run complete; no changes were pushed"),
        Outcome::Unchanged => info!("Commit message left as is"),
    }

    Ok(())
}

/// Format a message locally and print the result.
async fn preview(message: &str, args: RewriterArgs) -> Result<()> {
    let config = RewriterConfig::from_args(args).context("Invalid configuration")?;
    let request = build_request(&config, message, "preview")?.with_dry_run(true);

    let rewriter = OpenRouterRewriter::new(&config.api_key);
    let report = Orchestrator::new(&rewriter, &NoopPublisher)
        .with_rewrite_timeout(rewriter.max_duration())
        .run(&request)
        .await
        .inspect_err(|e| error!("Preview failed: {}", e))
        .context("Failed to format message")?;

    println!("Original:  {}", report.result.original_message);
    println!("Formatted: {}", report.result.formatted_message);
    println!("Modified:  {}", report.result.was_modified);

    Ok(())
}

fn resolve_branch(config: &ActionConfig) -> Result<String> {
    match &config.branch {
        Some(branch) => Ok(branch.clone()),
        None => current_branch(&config.repo_path)
            .context("Could not determine the branch to update; pass --ref"),
    }
}

fn build_request(config: &RewriterConfig, message: &str, branch: &str) -> Result<RewriteRequest> {
    let request = RewriteRequest::new(message, branch)
        .with_model(&config.model)
        .with_language_code(&config.language)?
        .with_custom_instructions(config.custom_prompt.clone());
    Ok(request)
}
