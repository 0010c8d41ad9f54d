//! Rewrite orchestration: classify, rewrite, normalize, decide, publish.
//!
//! The pipeline is an explicit state machine:
//!
//! ```text
//! Start → Classified → Skip ──────────────┐
//!                    └→ Rewriting → Normalized → Decided → DryRun
//!                                                      ├→ Unchanged
//!                                                      └→ Published | Failed
//! ```
//!
//! Every invocation walks it once. The publisher is called at most once, and
//! never in dry-run mode or when the message did not change.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::convention::is_conventional;
use crate::error::{RewriteError, RewriterError};
use crate::language::Language;
use crate::normalize::{RepairPolicy, normalize_with};
use crate::prompt::render_prompt;
use crate::publish::Publisher;
use crate::rewriter::Rewriter;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// One invocation's inputs. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    original_message: String,
    branch: String,
    model: String,
    language: Language,
    custom_instructions: Option<String>,
    dry_run: bool,
}

impl RewriteRequest {
    /// Create a request with default model, English output and no custom
    /// instructions. Trailing whitespace of the message is dropped.
    pub fn new(original_message: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            original_message: original_message.into().trim_end().to_string(),
            branch: branch.into(),
            model: DEFAULT_MODEL.to_string(),
            language: Language::default(),
            custom_instructions: None,
            dry_run: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the output language from a raw code, failing fast on unknown codes.
    pub fn with_language_code(self, code: &str) -> Result<Self, RewriteError> {
        Ok(self.with_language(code.parse()?))
    }

    /// Blank instructions are treated as absent.
    pub fn with_custom_instructions(mut self, instructions: Option<String>) -> Self {
        self.custom_instructions = instructions.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn original_message(&self) -> &str {
        &self.original_message
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn custom_instructions(&self) -> Option<&str> {
        self.custom_instructions.as_deref()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// What the pipeline computed. Identical for dry and live runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    pub original_message: String,
    pub formatted_message: String,
    pub was_modified: bool,
}

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Start,
    Classified,
    Skip,
    Rewriting,
    Normalized,
    Decided,
    DryRun,
    Unchanged,
    Published,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::DryRun | Stage::Unchanged | Stage::Published | Stage::Failed
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a successful invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Dry run: the result was computed and the publisher was not called.
    DryRun,
    /// Nothing to publish: the final message equals the original.
    Unchanged,
    /// The amended commit was force-pushed.
    Published,
}

/// Successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub result: RewriteResult,
    pub outcome: Outcome,
    /// Every stage visited, in order, ending with the terminal stage.
    pub trace: Vec<Stage>,
}

/// Records the stage path and enforces that no stage is visited twice.
struct StateMachine {
    trace: Vec<Stage>,
}

impl StateMachine {
    fn new() -> Self {
        Self {
            trace: vec![Stage::Start],
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug_assert!(
            !self.trace.contains(&stage),
            "stage {stage} visited twice: {:?}",
            self.trace
        );
        debug!("{} -> {}", self.current(), stage);
        self.trace.push(stage);
    }

    fn current(&self) -> Stage {
        self.trace.last().copied().unwrap_or(Stage::Start)
    }

    fn fail(&mut self, error: RewriteError) -> RewriteError {
        self.enter(Stage::Failed);
        warn!("Rewrite failed: {}", error);
        error
    }
}

/// Ties the classifier, prompt builder, rewriter, normalizer and publisher together.
pub struct Orchestrator<'a> {
    rewriter: &'a dyn Rewriter,
    publisher: &'a dyn Publisher,
    repair: RepairPolicy,
    rewrite_timeout: Option<Duration>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(rewriter: &'a dyn Rewriter, publisher: &'a dyn Publisher) -> Self {
        Self {
            rewriter,
            publisher,
            repair: RepairPolicy::default(),
            rewrite_timeout: None,
        }
    }

    pub fn with_repair_policy(mut self, repair: RepairPolicy) -> Self {
        self.repair = repair;
        self
    }

    /// Bound the whole rewriter call, retries included. When the bound is
    /// hit the run fails as `RewriterUnavailable` and nothing is published.
    pub fn with_rewrite_timeout(mut self, rewrite_timeout: Duration) -> Self {
        self.rewrite_timeout = Some(rewrite_timeout);
        self
    }

    /// Run the pipeline once for the request.
    pub async fn run(&self, request: &RewriteRequest) -> Result<RewriteReport, RewriteError> {
        let mut machine = StateMachine::new();
        let original = request.original_message();

        let conventional = is_conventional(original);
        machine.enter(Stage::Classified);

        let formatted = if conventional {
            machine.enter(Stage::Skip);
            info!("Commit message already follows Conventional Commits. Skipping rewrite.");
            original.to_string()
        } else {
            machine.enter(Stage::Rewriting);
            let payload = render_prompt(
                original,
                request.language(),
                request.model(),
                request.custom_instructions(),
            );

            let raw = match self.call_rewriter(&payload).await {
                Ok(raw) => raw,
                Err(e) => return Err(machine.fail(RewriteError::RewriterUnavailable(e))),
            };

            let commit = match normalize_with(&raw, &self.repair) {
                Ok(commit) => commit,
                Err(e) => return Err(machine.fail(e)),
            };
            machine.enter(Stage::Normalized);
            commit.to_message()
        };

        machine.enter(Stage::Decided);
        let result = RewriteResult {
            original_message: original.to_string(),
            was_modified: formatted != original,
            formatted_message: formatted,
        };

        if request.dry_run() {
            machine.enter(Stage::DryRun);
            info!(
                "[DRY RUN] Would amend commit with: {}",
                result.formatted_message
            );
            return Ok(finish(result, Outcome::DryRun, machine));
        }

        if !result.was_modified {
            machine.enter(Stage::Unchanged);
            info!("No changes needed for the commit message.");
            return Ok(finish(result, Outcome::Unchanged, machine));
        }

        match self
            .publisher
            .publish(&result.formatted_message, request.branch())
            .await
        {
            Ok(()) => {
                machine.enter(Stage::Published);
                info!("Amended commit and force-updated {}", request.branch());
                Ok(finish(result, Outcome::Published, machine))
            }
            Err(source) => Err(machine.fail(RewriteError::PublishFailure { result, source })),
        }
    }

    async fn call_rewriter(
        &self,
        payload: &crate::prompt::PromptPayload,
    ) -> Result<String, RewriterError> {
        match self.rewrite_timeout {
            Some(limit) => tokio::time::timeout(limit, self.rewriter.rewrite(payload))
                .await
                .map_err(|_| RewriterError::Timeout(limit.as_secs()))?,
            None => self.rewriter.rewrite(payload).await,
        }
    }
}

fn finish(result: RewriteResult, outcome: Outcome, machine: StateMachine) -> RewriteReport {
    RewriteReport {
        result,
        outcome,
        trace: machine.trace,
    }
}

/// Run the pipeline with the default repair policy and no extra timeout.
pub async fn run_rewrite(
    request: &RewriteRequest,
    rewriter: &dyn Rewriter,
    publisher: &dyn Publisher,
) -> Result<RewriteReport, RewriteError> {
    Orchestrator::new(rewriter, publisher).run(request).await
}
