//! Messages API backend for the generator and validator.
//!
//! Replies are kept as content blocks so the caller can decide how to
//! flatten them; see [`GeneratorOutput::into_text`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::llm::client::{LlmClient, LlmError};
use crate::llm::types::{CompletionRequest, CompletionResponse, GeneratorOutput, Message, StopReason, Usage};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Model, output budget and HTTP timeout for [`AnthropicClient`].
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Outgoing request body.
#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "is_blank")]
    system: &'a str,
}

/// Incoming reply body. `content` is usually a block list but some
/// gateways flatten it to a string, which the untagged output accepts.
#[derive(Debug, Deserialize)]
struct MessagesReply {
    content: Option<GeneratorOutput>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

fn is_blank(text: &&str) -> bool {
    text.is_empty()
}

fn stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

/// Client for the Messages API. Tracks tokens spent across calls.
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    config: AnthropicConfig,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl AnthropicClient {
    /// Reads the key from `ANTHROPIC_API_KEY`.
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| LlmError::MissingApiKey {
            env_var: API_KEY_ENV.to_string(),
        })?;
        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: impl Into<String>, config: AnthropicConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            config,
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> MessagesBody<'a> {
        MessagesBody {
            model: request.model.as_deref().unwrap_or(&self.config.model),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            messages: &request.messages,
            system: &request.system,
        }
    }

    fn finish_reply(&self, reply: MessagesReply) -> Result<CompletionResponse, LlmError> {
        let content = reply
            .content
            .ok_or_else(|| LlmError::InvalidResponse("response has no content".to_string()))?;

        self.input_tokens.fetch_add(reply.usage.input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(reply.usage.output_tokens, Ordering::Relaxed);

        Ok(CompletionResponse {
            content,
            stop_reason: stop_reason(reply.stop_reason.as_deref()),
            usage: reply.usage,
        })
    }

    /// Tokens spent by this client so far.
    pub fn total_usage(&self) -> Usage {
        Usage::new(
            self.input_tokens.load(Ordering::Relaxed),
            self.output_tokens.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(&request))
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let seconds = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(LlmError::RateLimited {
                    retry_after: Duration::from_secs(seconds),
                })
            }
            status if !status.is_success() => Err(LlmError::ApiError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
            _ => {
                let reply: MessagesReply = response.json().await?;
                self.finish_reply(reply)
            }
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish_non_exhaustive()
    }
}
