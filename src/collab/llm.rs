//! LLM-backed generator and validator.
//!
//! The validator is an LLM-as-judge: a separate call evaluates one file
//! against explicit criteria and answers with a binary verdict plus
//! actionable feedback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{Generator, Validator};
use crate::error::{Result, ScaffoldrError};
use crate::llm::{CompletionRequest, GeneratorOutput, LlmClient};

const DEFAULT_GENERATOR_SYSTEM: &str =
    "You are a senior front-end engineer generating production-ready Next.js (App Router) and TypeScript code.";

const DEFAULT_VALIDATOR_SYSTEM: &str = "You are a strict code reviewer. You give binary pass/fail verdicts with \
specific, actionable feedback and you answer with a single JSON object only.";

/// Generator backed by an [`LlmClient`].
pub struct LlmGenerator {
    client: Arc<dyn LlmClient>,
    default_system: String,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            default_system: DEFAULT_GENERATOR_SYSTEM.to_string(),
            max_tokens: 16384,
            timeout: Duration::from_secs(600),
        }
    }

    /// System prompt used when the caller passes none.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_system = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<GeneratorOutput> {
        let request = CompletionRequest::new(system_prompt.unwrap_or(&self.default_system))
            .with_user_message(prompt)
            .with_max_tokens(self.max_tokens);

        let response = tokio::time::timeout(self.timeout, self.client.complete(request))
            .await
            .map_err(|_| ScaffoldrError::Llm(format!("generator timed out after {:?}", self.timeout)))??;

        if response.stop_reason.is_truncated() {
            log::warn!("Generator output hit the token limit; trailing blocks may be unterminated");
        }

        Ok(response.content)
    }
}

/// Criteria the validator asks the judge to check.
#[derive(Debug, Clone)]
pub struct ReviewCriteria {
    pub questions: Vec<String>,
}

impl ReviewCriteria {
    pub fn with_questions(mut self, questions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.questions.extend(questions.into_iter().map(|q| q.into()));
        self
    }

    /// Standard criteria for generated application files.
    pub fn generated_code() -> Self {
        Self { questions: Vec::new() }.with_questions([
            "Is the file complete (no placeholders, TODOs, or elided sections)?",
            "Is it syntactically valid and would it type-check?",
            "Does it satisfy the application specification and the stated context?",
            "Are imports consistent with the other files described in the context?",
            "Does it avoid hard-coded secrets and unsafe patterns?",
        ])
    }

    /// Build the judge prompt.
    pub fn build_prompt(&self, content: &str, context: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str("## Context\n\n");
        prompt.push_str(context.trim());
        prompt.push_str("\n\n## Evaluation Criteria\n\n");
        for (i, question) in self.questions.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, question));
        }

        prompt.push_str("\n## Content to Evaluate\n\n```\n");
        prompt.push_str(content);
        prompt.push_str("\n```\n\n");

        prompt.push_str("## Your Response\n\n");
        prompt.push_str("Respond with EXACTLY one JSON object and nothing else:\n");
        prompt.push_str("{\"pass\": true|false, \"feedback\": \"<what must change, or why it passes>\"}\n");

        prompt
    }
}

impl Default for ReviewCriteria {
    fn default() -> Self {
        Self::generated_code()
    }
}

/// Validator backed by an [`LlmClient`].
pub struct LlmValidator {
    client: Arc<dyn LlmClient>,
    criteria: ReviewCriteria,
    system_prompt: String,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmValidator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            criteria: ReviewCriteria::default(),
            system_prompt: DEFAULT_VALIDATOR_SYSTEM.to_string(),
            max_tokens: 1024,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Validator for LlmValidator {
    async fn validate(&self, content: &str, context: &str) -> Result<String> {
        let request = CompletionRequest::new(&self.system_prompt)
            .with_user_message(self.criteria.build_prompt(content, context))
            .with_max_tokens(self.max_tokens);

        let response = tokio::time::timeout(self.timeout, self.client.complete(request))
            .await
            .map_err(|_| ScaffoldrError::Llm(format!("validator timed out after {:?}", self.timeout)))??;

        Ok(response.content.into_text())
    }
}
