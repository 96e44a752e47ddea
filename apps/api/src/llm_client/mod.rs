//! LLM Client — the single point of entry for completion-service calls.
//!
//! The pipeline only sees the `CompletionClient` trait; `LlmClient` is the HTTP
//! implementation, speaking either the OpenAI-compatible chat completions API
//! (Groq by default) or the Anthropic Messages API.
//!
//! One attempt per call unless a `RetryPolicy` with more attempts is configured.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

#[cfg(test)]
pub mod fake;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";
const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl CompletionError {
    /// Rate limits, server errors and transport failures may succeed on retry.
    fn is_transient(&self) -> bool {
        match self {
            CompletionError::Http(_) => true,
            CompletionError::Api { status, .. } => *status == 429 || *status >= 500,
            CompletionError::Parse(_) | CompletionError::EmptyContent => false,
        }
    }
}

/// A remote text-generation endpoint: prompt in, free-form text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, CompletionError>;
}

/// Which wire protocol the completion endpoint speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LlmProvider {
    /// `POST {base}/chat/completions` with bearer auth.
    #[default]
    OpenAi,
    /// `POST {base}/messages` with `x-api-key`.
    Anthropic,
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => OPENAI_DEFAULT_BASE_URL,
            LlmProvider::Anthropic => ANTHROPIC_DEFAULT_BASE_URL,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => OPENAI_DEFAULT_MODEL,
            LlmProvider::Anthropic => ANTHROPIC_DEFAULT_MODEL,
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "groq" => Ok(LlmProvider::OpenAi),
            "anthropic" => Ok(LlmProvider::Anthropic),
            other => Err(format!("unknown LLM provider '{other}' (expected openai|anthropic)")),
        }
    }
}

/// Attempts per call and the backoff between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before `attempt` (0-based): none for the first, then base, 2×base, 4×base…
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub retry: RetryPolicy,
    /// `None` leaves the request unbounded.
    pub timeout: Option<Duration>,
}

// ── OpenAI-compatible wire types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ── Anthropic wire types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Both providers wrap error messages as `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
    }
}

impl AnthropicResponse {
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .filter(|t| !t.trim().is_empty())
    }
}

/// HTTP completion client. Cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, CompletionError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            settings,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn provider(&self) -> LlmProvider {
        self.settings.provider
    }

    fn endpoint(&self) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        match self.settings.provider {
            LlmProvider::OpenAi => format!("{base}/chat/completions"),
            LlmProvider::Anthropic => format!("{base}/messages"),
        }
    }

    /// One HTTP round trip, no retries.
    async fn attempt(&self, prompt: &str, system: &str) -> Result<String, CompletionError> {
        let s = &self.settings;
        let request = match s.provider {
            LlmProvider::OpenAi => self
                .client
                .post(self.endpoint())
                .bearer_auth(&s.api_key)
                .json(&ChatRequest {
                    model: &s.model,
                    messages: vec![
                        ChatMessage {
                            role: "system",
                            content: system,
                        },
                        ChatMessage {
                            role: "user",
                            content: prompt,
                        },
                    ],
                    temperature: s.temperature,
                    max_tokens: s.max_tokens,
                }),
            LlmProvider::Anthropic => self
                .client
                .post(self.endpoint())
                .header("x-api-key", &s.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&AnthropicRequest {
                    model: &s.model,
                    max_tokens: s.max_tokens,
                    temperature: s.temperature,
                    system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                }),
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let text = match s.provider {
            LlmProvider::OpenAi => {
                let parsed: ChatResponse = serde_json::from_str(&body)?;
                if let Some(usage) = &parsed.usage {
                    debug!(
                        "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                        usage.prompt_tokens, usage.completion_tokens
                    );
                }
                parsed.into_text()
            }
            LlmProvider::Anthropic => {
                let parsed: AnthropicResponse = serde_json::from_str(&body)?;
                debug!(
                    "LLM call succeeded: input_tokens={}, output_tokens={}",
                    parsed.usage.input_tokens, parsed.usage.output_tokens
                );
                parsed.into_text()
            }
        };

        text.ok_or(CompletionError::EmptyContent)
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    /// Retries transient failures with exponential backoff, up to the policy's attempts.
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, CompletionError> {
        let policy = self.settings.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let delay = policy.delay_before(attempt);
            if !delay.is_zero() {
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt(prompt, system).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    warn!("LLM call failed: {e}");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
