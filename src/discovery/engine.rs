//! Discovery: refine a partial spec from free-text user input.

use std::sync::Arc;

use serde::Deserialize;

use super::confirm::clarification_questions;
use crate::artifact::parse_json_payload;
use crate::collab::Generator;
use crate::domain::{ApplicationSpec, SpecUpdate};
use crate::error::Result;

const DISCOVERY_SYSTEM: &str = "You are a product analyst helping a user specify a web application. \
You extract structured requirements from the conversation and answer with a single JSON object only.";

/// Result of one discovery round.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutcome {
    pub is_complete: bool,
    pub updated_spec: ApplicationSpec,
    pub response_to_user: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiscoveryReply {
    spec: SpecUpdate,
    #[serde(alias = "response", alias = "question")]
    message: String,
}

/// Turns user input plus a partial spec into an updated spec and a reply.
pub struct DiscoveryEngine {
    generator: Arc<dyn Generator>,
}

impl DiscoveryEngine {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Run one discovery round.
    ///
    /// Completion is decided locally from the required fields, never from the
    /// generator's own claim. Generator errors propagate.
    pub async fn discover(&self, user_input: &str, spec: Option<&ApplicationSpec>) -> Result<DiscoveryOutcome> {
        let mut updated = spec.cloned().unwrap_or_default();
        let prompt = build_prompt(user_input, &updated);

        let raw = self.generator.generate(&prompt, Some(DISCOVERY_SYSTEM)).await?.into_text();

        let message = match parse_json_payload::<DiscoveryReply>(&raw) {
            Ok((reply, layer)) => {
                log::debug!("Discovery reply parsed ({:?})", layer);
                updated.apply(reply.spec);
                reply.message.trim().to_string()
            }
            Err(e) => {
                log::warn!("Discovery reply was not structured, keeping spec unchanged: {}", e);
                updated.user_input = Some(user_input.to_string());
                return Ok(DiscoveryOutcome {
                    is_complete: false,
                    updated_spec: updated,
                    response_to_user: raw.trim().to_string(),
                });
            }
        };

        updated.user_input = Some(user_input.to_string());
        let missing = updated.missing_required_fields();
        let is_complete = missing.is_empty();
        updated.ready_for_confirmation = is_complete;

        let response_to_user = if !message.is_empty() {
            message
        } else if is_complete {
            summary(&updated)
        } else {
            clarification_questions(&missing).join("\n")
        };

        Ok(DiscoveryOutcome {
            is_complete,
            updated_spec: updated,
            response_to_user,
        })
    }
}

fn build_prompt(user_input: &str, spec: &ApplicationSpec) -> String {
    let missing = spec.missing_required_fields();
    let mut prompt = String::new();

    prompt.push_str("## Current specification\n\n");
    prompt.push_str(&spec.brief());
    prompt.push_str("\n\n## User said\n\n");
    prompt.push_str(user_input.trim());
    prompt.push_str("\n\n## Instructions\n\n");
    prompt.push_str("Update the specification with anything the user stated. ");
    if missing.is_empty() {
        prompt.push_str("All required fields are present: summarise the app and ask the user to confirm.\n");
    } else {
        prompt.push_str(&format!(
            "Still missing: {}. Ask one concise follow-up question about them.\n",
            missing.join(", ")
        ));
    }
    prompt.push_str(
        "\nRespond with EXACTLY one JSON object:\n\
         {\"spec\": {\"app_name\": ..., \"description\": ..., \"pages\": [...], \"components\": [...], \
         \"domain\": ..., \"layout\": ...}, \"message\": \"<reply to the user>\"}\n\
         Omit fields you have no information for.\n",
    );
    prompt
}

fn summary(spec: &ApplicationSpec) -> String {
    format!(
        "Here is what I have for {}:\n- Pages: {}\n- Components: {}\nShall I proceed?",
        spec.app_name.as_deref().unwrap_or("your app"),
        spec.pages.join(", "),
        spec.components.join(", ")
    )
}
