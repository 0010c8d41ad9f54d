//! Invocation configuration: command-line flags backed by action environment variables.

use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use crate::error::ConfigError;
use crate::orchestrator::DEFAULT_MODEL;
use crate::publish::PushTarget;

/// Remote used when no repository slug is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Credentials and model selection shared by `run` and `preview`.
#[derive(Args, Debug, Clone, Default)]
pub struct RewriterArgs {
    /// OpenRouter API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,

    /// Model identifier passed to OpenRouter
    #[arg(long, env = "MODEL")]
    pub model: Option<String>,

    /// Output language code (en, ko, ja, zh, es, fr, de, pt, ru, it)
    #[arg(long, env = "LANGUAGE", default_value = "en")]
    pub language: String,

    /// Extra instructions appended to the prompt
    #[arg(long, env = "CUSTOM_PROMPT")]
    pub custom_prompt: Option<String>,
}

/// Inputs for rewriting a commit in a checkout.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub rewriter: RewriterArgs,

    /// Token used to push to the repository named by --repository
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Compute the rewrite without amending or pushing
    #[arg(long, env = "DRY_RUN", value_parser = clap::builder::BoolishValueParser::new(), default_value_t = false)]
    pub dry_run: bool,

    /// Commit whose message is rewritten
    #[arg(long, env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// Branch ref to update (refs/heads/<name> or a bare branch name)
    #[arg(long = "ref", env = "GITHUB_REF")]
    pub git_ref: Option<String>,

    /// Repository slug (owner/name) to push to; defaults to the origin remote
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Path to the checkout
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub repo_path: Option<PathBuf>,

    /// File that receives the action outputs; stdout when unset
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,
}

/// Settings for the rewriter, with defaults applied and blanks removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriterConfig {
    pub api_key: String,
    pub model: String,
    pub language: String,
    pub custom_prompt: Option<String>,
}

impl RewriterConfig {
    pub fn from_args(args: RewriterArgs) -> Result<Self, ConfigError> {
        let api_key = non_blank(args.openrouter_api_key)
            .ok_or(ConfigError::MissingInput("openrouter-api-key"))?;

        Ok(Self {
            api_key,
            model: non_blank(args.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: args.language.trim().to_string(),
            custom_prompt: non_blank(args.custom_prompt),
        })
    }
}

/// Everything a `run` invocation needs, validated.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub rewriter: RewriterConfig,
    pub dry_run: bool,
    pub repo_path: PathBuf,
    /// Revision of the commit to rewrite.
    pub sha: String,
    /// Branch to update; `None` means the branch HEAD points at.
    pub branch: Option<String>,
    pub push_target: PushTarget,
    pub output_file: Option<PathBuf>,
}

impl ActionConfig {
    pub fn from_args(args: RunArgs) -> Result<Self, ConfigError> {
        let rewriter = RewriterConfig::from_args(args.rewriter)?;
        let token = non_blank(args.github_token);

        let branch = non_blank(args.git_ref)
            .map(|r| branch_from_ref(&r))
            .transpose()?;

        let push_target = match (non_blank(args.repository), token) {
            (Some(repository), Some(token)) => PushTarget::GitHub { repository, token },
            (Some(_), None) if !args.dry_run => {
                return Err(ConfigError::MissingInput("github-token"));
            }
            _ => {
                debug!("Pushing to {} with ambient credentials", DEFAULT_REMOTE);
                PushTarget::Remote(DEFAULT_REMOTE.to_string())
            }
        };

        Ok(Self {
            rewriter,
            dry_run: args.dry_run,
            repo_path: args.repo_path.unwrap_or_else(|| PathBuf::from(".")),
            sha: non_blank(args.sha).unwrap_or_else(|| "HEAD".to_string()),
            branch,
            push_target,
            output_file: args.output_file.filter(|p| !p.as_os_str().is_empty()),
        })
    }
}

/// Branch name for a ref. `refs/heads/` is stripped; other fully-qualified
/// refs (tags, pull request merge refs) cannot be rewritten.
pub fn branch_from_ref(git_ref: &str) -> Result<String, ConfigError> {
    let git_ref = git_ref.trim();

    let branch = match git_ref.strip_prefix("refs/heads/") {
        Some(name) => name,
        None if git_ref.starts_with("refs/") => {
            return Err(ConfigError::InvalidBranchRef(git_ref.to_string()));
        }
        None => git_ref,
    };

    if branch.is_empty() {
        return Err(ConfigError::InvalidBranchRef(git_ref.to_string()));
    }
    Ok(branch.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
