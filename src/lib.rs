//! commit-formatter - rewrites commit messages into Conventional Commits format.
//!
//! # Overview
//!
//! commit-formatter checks the latest commit message against the Conventional
//! Commits grammar. Messages that do not conform are rewritten by a language
//! model through OpenRouter, normalized back into the grammar, and published
//! by amending the commit and force-updating the branch.

pub mod config;
pub mod convention;
pub mod error;
pub mod git;
pub mod language;
pub mod normalize;
pub mod orchestrator;
pub mod outputs;
pub mod prompt;
pub mod publish;
pub mod rewriter;

// Re-export commonly used types
pub use convention::{CommitType, ConventionalCommit, is_conventional};
pub use error::{ConfigError, GitError, PublishError, RewriteError, RewriterError};
pub use language::Language;
pub use normalize::{RepairPolicy, normalize};
pub use orchestrator::{
    Orchestrator, Outcome, RewriteReport, RewriteRequest, RewriteResult, Stage, run_rewrite,
};
pub use prompt::{PromptPayload, build_prompt};
pub use publish::{GitPublisher, NoopPublisher, Publisher, PushTarget};
pub use rewriter::{OpenRouterRewriter, Rewriter};
