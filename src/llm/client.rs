//! Core LLM client trait, error type and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse, GeneratorOutput, StopReason, Usage};

/// Stateless LLM client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Whether the client has what it needs to make calls
    fn is_ready(&self) -> bool {
        true
    }
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::JsonError(_) => false,
            LlmError::MissingApiKey { .. } => false,
        }
    }
}

enum MockReply {
    Text(String),
    Error(String),
}

type Responder = Box<dyn Fn(&CompletionRequest) -> String + Send + Sync>;

/// Scripted client for tests and dry runs.
///
/// Replies are consumed in order. Once the script is empty the responder (if
/// any) answers, then the fallback text, otherwise the call fails. Every
/// request is recorded.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    responder: Option<Responder>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Client answering with `replies` in order.
    pub fn new(replies: Vec<impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| MockReply::Text(r.into())).collect()),
            responder: None,
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Client that always answers with the same text.
    pub fn always(reply: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new()).with_fallback(reply)
    }

    /// Client whose reply is computed from each request.
    pub fn from_fn(responder: impl Fn(&CompletionRequest) -> String + Send + Sync + 'static) -> Self {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Client whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        let client = Self::new(Vec::<String>::new());
        client.push_error(message);
        client
    }

    /// Text to answer with once the script is exhausted.
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Queue a text reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(MockReply::Text(reply.into()));
    }

    /// Queue a failing reply.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.replies).push_back(MockReply::Error(message.into()));
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Copy of every request received.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let scripted = lock(&self.replies).pop_front();
        let text = match scripted {
            Some(MockReply::Text(text)) => text,
            Some(MockReply::Error(message)) => {
                lock(&self.requests).push(request);
                return Err(LlmError::ApiError { status: 500, message });
            }
            None => match (&self.responder, &self.fallback) {
                (Some(responder), _) => responder(&request),
                (None, Some(fallback)) => fallback.clone(),
                (None, None) => {
                    lock(&self.requests).push(request);
                    return Err(LlmError::InvalidResponse("mock script exhausted".to_string()));
                }
            },
        };
        lock(&self.requests).push(request);

        Ok(CompletionResponse {
            content: GeneratorOutput::Text(text),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
