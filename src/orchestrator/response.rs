//! Responses returned to the router.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::collab::PersistReport;
use crate::domain::{AppType, ApplicationSpec, GeneratedFile};
use crate::error::ScaffoldrError;

pub const STATUS_AWAITING_USER_INPUT: &str = "AWAITING_USER_INPUT";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

/// Outcome of one compose invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum IntentResponse {
    /// More input is needed before the pipeline can continue.
    #[serde(rename = "AWAITING_USER_INPUT")]
    AwaitingInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(rename = "clarificationQuestions", skip_serializing_if = "Vec::is_empty")]
        clarification_questions: Vec<String>,
        #[serde(rename = "layoutOptions", skip_serializing_if = "Vec::is_empty")]
        layout_options: Vec<String>,
        spec: ApplicationSpec,
    },

    #[serde(rename = "completed")]
    Completed(ComposeReport),

    #[serde(rename = "failed")]
    Failed { trace_id: String, error: ErrorEnvelope },
}

impl IntentResponse {
    /// Reply for a confirmed spec that still lacks required fields.
    pub fn missing_fields(missing: &[&str], questions: Vec<String>, spec: ApplicationSpec) -> Self {
        let error = format!("Missing required fields: {}", missing.join(", "));
        IntentResponse::AwaitingInput {
            message: error.clone(),
            error: Some(error),
            clarification_questions: questions,
            layout_options: Vec::new(),
            spec,
        }
    }

    pub fn failed(error: &ScaffoldrError, trace_id: impl Into<String>) -> Self {
        IntentResponse::Failed {
            trace_id: trace_id.into(),
            error: ErrorEnvelope::from(error),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            IntentResponse::AwaitingInput { .. } => STATUS_AWAITING_USER_INPUT,
            IntentResponse::Completed(_) => STATUS_COMPLETED,
            IntentResponse::Failed { .. } => STATUS_FAILED,
        }
    }

    pub fn report(&self) -> Option<&ComposeReport> {
        match self {
            IntentResponse::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Everything produced by a completed request.
#[derive(Debug, Clone, Serialize)]
pub struct ComposeReport {
    pub trace_id: String,
    pub app_type: AppType,
    pub files: Vec<GeneratedFile>,
    pub dependencies: Vec<String>,
    pub test_files: Vec<String>,
    pub correction_attempts: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_models: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_workflows: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<PersistReport>,
    pub completed_at: DateTime<Utc>,
}

/// Error reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl From<&ScaffoldrError> for ErrorEnvelope {
    fn from(error: &ScaffoldrError) -> Self {
        let feedback = match error {
            ScaffoldrError::CorrectionExhausted { feedback, .. } => Some(feedback.clone()),
            _ => None,
        };
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            feedback,
        }
    }
}
