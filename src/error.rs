//! Error types for Scaffoldr
//!
//! Centralized error handling using thiserror. Only the fatal kinds of the
//! pipeline live here; incomplete specs and unparseable review verdicts are
//! ordinary values, not errors.

use thiserror::Error;

/// All error types that can abort a compose request
#[derive(Debug, Error)]
pub enum ScaffoldrError {
    /// A generation call produced no extractable file
    #[error("Generation produced no files during {phase}")]
    GenerationEmpty { phase: String },

    /// Correction budget consumed while files still fail review
    #[error("Correction exhausted after {attempts} attempts; {file} still failing: {feedback}")]
    CorrectionExhausted {
        attempts: u32,
        file: String,
        feedback: String,
    },

    /// Generative model call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// An external collaborator (catalogue, intent channel) failed
    #[error("{name} error: {message}")]
    Collaborator { name: String, message: String },

    /// The inbound request could not be understood
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Scaffold write / persistence failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScaffoldrError {
    /// Build a collaborator error.
    pub fn collaborator(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            ScaffoldrError::GenerationEmpty { .. } => "generation_empty",
            ScaffoldrError::CorrectionExhausted { .. } => "correction_exhausted",
            ScaffoldrError::Llm(_) => "llm",
            ScaffoldrError::Collaborator { .. } => "collaborator",
            ScaffoldrError::InvalidRequest(_) => "invalid_request",
            ScaffoldrError::Persistence(_) => "persistence",
            ScaffoldrError::Io(_) => "io",
            ScaffoldrError::Json(_) => "json",
        }
    }
}

impl From<crate::llm::LlmError> for ScaffoldrError {
    fn from(err: crate::llm::LlmError) -> Self {
        ScaffoldrError::Llm(err.to_string())
    }
}

/// Result type alias for Scaffoldr operations
pub type Result<T> = std::result::Result<T, ScaffoldrError>;
