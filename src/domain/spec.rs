//! The application specification gathered during discovery.

use serde::{Deserialize, Serialize};

/// Fields that must be populated before planning can start.
pub const REQUIRED_FIELDS: [&str; 2] = ["pages", "components"];

/// Catalogue version used when the spec does not carry one.
pub const DEFAULT_VERSION: &str = "latest";

/// Structured description of the app to generate.
///
/// Mutated round by round during discovery; treated as read-only once
/// `confirmed` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(alias = "appName", skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub pages: Vec<String>,

    pub components: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(alias = "workspaceId", skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,

    #[serde(alias = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(alias = "isConfirmed")]
    pub confirmed: bool,

    /// Set once discovery judged the spec complete and asked for confirmation.
    #[serde(alias = "readyForConfirmation")]
    pub ready_for_confirmation: bool,

    #[serde(alias = "userInput", skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
}

/// Partial update proposed by the discovery generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecUpdate {
    #[serde(alias = "appName")]
    pub app_name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub pages: Option<Vec<String>>,
    pub components: Option<Vec<String>>,
    pub domain: Option<String>,
    pub layout: Option<String>,
}

impl ApplicationSpec {
    /// Names of required fields that are still empty.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.pages.iter().all(|p| p.trim().is_empty()) {
            missing.push(REQUIRED_FIELDS[0]);
        }
        if self.components.iter().all(|c| c.trim().is_empty()) {
            missing.push(REQUIRED_FIELDS[1]);
        }
        missing
    }

    /// Whether every required field is populated.
    pub fn is_complete(&self) -> bool {
        self.missing_required_fields().is_empty()
    }

    /// Apply a discovery update. Confirmed specs are left untouched.
    pub fn apply(&mut self, update: SpecUpdate) {
        if self.confirmed {
            return;
        }
        fn set(target: &mut Option<String>, value: Option<String>) {
            if let Some(v) = value.map(|v| v.trim().to_string())
                && !v.is_empty()
            {
                *target = Some(v);
            }
        }
        set(&mut self.app_name, update.app_name);
        set(&mut self.description, update.description);
        set(&mut self.version, update.version);
        set(&mut self.domain, update.domain);
        set(&mut self.layout, update.layout);

        if let Some(pages) = update.pages {
            let pages = clean_list(pages);
            if !pages.is_empty() {
                self.pages = pages;
            }
        }
        if let Some(components) = update.components {
            let components = clean_list(components);
            if !components.is_empty() {
                self.components = components;
            }
        }
    }

    /// Version tag used for catalogue lookups.
    pub fn catalogue_version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    /// Domain tag, if set and non-blank.
    pub fn domain_tag(&self) -> Option<&str> {
        self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    /// Compact JSON rendering used as the generation brief.
    ///
    /// Conversation bookkeeping (user input, confirmation flags) is left out.
    pub fn brief(&self) -> String {
        let brief = ApplicationSpec {
            user_input: None,
            confirmed: false,
            ready_for_confirmation: false,
            ..self.clone()
        };
        serde_json::to_string_pretty(&brief).unwrap_or_default()
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
