//! Error types for commit-formatter modules using thiserror.

use thiserror::Error;

use crate::orchestrator::RewriteResult;

/// Errors surfaced to the caller of the rewrite pipeline.
///
/// Every failure other than the skip path maps to exactly one variant, so
/// callers can tell "nothing happened" apart from "computed but not applied".
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Unsupported language code '{0}'. Expected one of: en, ko, ja, zh, es, fr, de, pt, ru, it")]
    UnsupportedLanguage(String),

    #[error("Rewriter unavailable: {0}")]
    RewriterUnavailable(#[source] RewriterError),

    #[error("Rewriter output could not be normalized into a Conventional Commit: {}", truncate(raw_output, 200))]
    UnparseableRewrite { raw_output: String },

    #[error("Rewrite computed but not applied: {source}")]
    PublishFailure {
        result: RewriteResult,
        #[source]
        source: PublishError,
    },
}

impl RewriteError {
    /// The computed result, if the rewrite itself succeeded.
    pub fn result(&self) -> Option<&RewriteResult> {
        match self {
            RewriteError::PublishFailure { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Errors from the OpenRouter rewriter.
#[derive(Error, Debug)]
pub enum RewriterError {
    #[error("HTTP request to OpenRouter failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("OpenRouter returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("No response content from OpenRouter")]
    EmptyResponse,

    #[error("OpenRouter request timed out after {0} seconds")]
    Timeout(u64),

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<RewriterError>),
}

impl RewriterError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Rate limiting and server-side errors are transient; other client
    /// errors (bad key, unknown model) are not.
    pub fn is_transient(&self) -> bool {
        match self {
            RewriterError::Http(_) | RewriterError::Timeout(_) | RewriterError::EmptyResponse => {
                true
            }
            RewriterError::Status { status, .. } => *status == 429 || *status >= 500,
            RewriterError::RetriesExhausted(_) => false,
        }
    }
}

/// Errors from amending the commit and force-updating the remote branch.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("git executable not found on PATH; it is required to push the amended commit")]
    GitNotInstalled,

    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to amend HEAD commit: {0}")]
    Amend(#[source] git2::Error),

    #[error("Invalid committer identity: {0}")]
    ConfigError(#[source] git2::Error),

    #[error("{0}")]
    GitFailed(String),

    #[error("Failed to force-update remote branch: {0}")]
    PushFailed(String),
}

/// Errors from reading the source commit.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to find reference '{0}': {1}")]
    ReferenceNotFound(String, #[source] git2::Error),

    #[error("Commit {0} has a message that is not valid UTF-8")]
    NonUtf8Message(String),

    #[error("HEAD is detached and no branch was given")]
    DetachedHead,
}

/// Errors from assembling the invocation configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    #[error("'{0}' is not a branch ref; only refs/heads/* can be rewritten")]
    InvalidBranchRef(String),
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
