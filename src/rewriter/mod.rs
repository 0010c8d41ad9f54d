//! The pluggable rewriting capability and its OpenRouter implementation.

pub mod openrouter;
pub mod retry;

use async_trait::async_trait;

use crate::error::RewriterError;
use crate::prompt::PromptPayload;

pub use openrouter::OpenRouterRewriter;
pub use retry::{RetryPolicy, retry_with_backoff};

/// Turns a prompt payload into raw model text.
///
/// Output is untrusted: it may be empty, wrapped in markdown, or prose.
/// Callers must pass it through [`normalize`](crate::normalize::normalize).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, payload: &PromptPayload) -> Result<String, RewriterError>;
}
