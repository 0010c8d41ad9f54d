//! OpenRouter chat completions client.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::RewriterError;
use crate::prompt::PromptPayload;

use super::Rewriter;
use super::retry::{RetryPolicy, retry_with_backoff};

/// Default OpenRouter API base.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variable to override the API base (useful for proxies and tests).
pub const BASE_URL_ENV_VAR: &str = "OPENROUTER_BASE_URL";

/// Default timeout for a single request (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable to override the default timeout.
pub const TIMEOUT_ENV_VAR: &str = "COMMIT_FORMATTER_TIMEOUT";

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;

const REFERER: &str = "https://github.com/seoyeonmun/commit-formatter";
const TITLE: &str = "Commit Message Formatter";

/// Get the configured per-request timeout.
///
/// Reads from COMMIT_FORMATTER_TIMEOUT if set, otherwise uses 30 seconds.
/// Logs a warning if the variable is set but is not a number of seconds.
pub fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Get the configured API base, without a trailing slash.
pub fn get_base_url() -> String {
    env::var(BASE_URL_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Rewriter backed by OpenRouter's OpenAI-compatible API.
pub struct OpenRouterRewriter {
    api_key: String,
    base_url: String,
    request_timeout: Duration,
    retry: RetryPolicy,
    client: Client,
}

impl OpenRouterRewriter {
    /// Create a client using the environment-configured base URL and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: get_base_url(),
            request_timeout: get_timeout(),
            retry: RetryPolicy::default(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Longest a single `rewrite` call can take, retries included.
    pub fn max_duration(&self) -> Duration {
        self.retry.worst_case(self.request_timeout)
    }

    /// Single request, bounded by the per-request timeout.
    async fn send_once(&self, payload: &PromptPayload) -> Result<String, RewriterError> {
        let body = ChatCompletionRequest {
            model: &payload.model,
            messages: [
                Message {
                    role: "system",
                    content: &payload.system,
                },
                Message {
                    role: "user",
                    content: &payload.user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&body)
            .send();

        let timeout_secs = self.request_timeout.as_secs();
        let response = timeout(self.request_timeout, request)
            .await
            .map_err(|_| RewriterError::Timeout(timeout_secs))?
            .map_err(RewriterError::Http)?;

        let status = response.status();
        let text = response.text().await.map_err(RewriterError::Http)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| text.chars().take(200).collect());
            return Err(RewriterError::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_completion(&text)
    }
}

/// Extract the first choice's content from a chat completions body.
fn parse_completion(body: &str) -> Result<String, RewriterError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        debug!("Failed to parse OpenRouter response: {}", e);
        RewriterError::EmptyResponse
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(RewriterError::EmptyResponse)
}

#[async_trait]
impl Rewriter for OpenRouterRewriter {
    async fn rewrite(&self, payload: &PromptPayload) -> Result<String, RewriterError> {
        debug!(
            "Requesting rewrite from {} (model {}, prompt {} chars)",
            self.base_url,
            payload.model,
            payload.user.len()
        );

        retry_with_backoff(
            self.retry,
            || self.send_once(payload),
            RewriterError::is_transient,
            |e| RewriterError::RetriesExhausted(Box::new(e)),
        )
        .await
    }
}
