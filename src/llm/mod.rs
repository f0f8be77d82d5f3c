//! LLM Client Layer - Anthropic API integration
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - AnthropicClient implementation
//! - MockLlmClient for scripted tests and dry runs

pub mod anthropic;
pub mod client;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
pub use client::{LlmClient, LlmError, MockLlmClient};
pub use types::{CompletionRequest, CompletionResponse, ContentPart, GeneratorOutput, Message, Role, StopReason, Usage};
