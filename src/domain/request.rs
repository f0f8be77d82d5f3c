//! Inbound intent envelope.

use serde::{Deserialize, Serialize};

use super::spec::ApplicationSpec;

/// Intent name handled by the compose pipeline.
pub const APP_COMPOSE_INTENT: &str = "app.compose";

/// Request routed to the pipeline by the upstream router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRequest {
    pub intent: String,
    #[serde(default)]
    pub payload: ApplicationSpec,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

impl IntentRequest {
    /// Build an `app.compose` request.
    pub fn compose(payload: ApplicationSpec, trace_id: impl Into<String>) -> Self {
        Self {
            intent: APP_COMPOSE_INTENT.to_string(),
            payload,
            trace_id: trace_id.into(),
            jwt: None,
        }
    }

    /// Attach a bearer token forwarded to sub-intents.
    pub fn with_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }
}
