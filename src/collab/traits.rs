//! Interfaces to the systems the pipeline calls but does not implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::GeneratedFile;
use crate::error::Result;
use crate::llm::GeneratorOutput;

/// Generative model: prompt in, text (or multi-part text) out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<GeneratorOutput>;
}

/// Compliance validator. The reply is expected to encode
/// `{"pass": bool, "feedback": string}` but is not trusted to.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, content: &str, context: &str) -> Result<String>;
}

/// Best-practice catalogue lookup for a domain.
#[async_trait]
pub trait Catalogue: Send + Sync {
    async fn fetch(&self, domain: &str, version: &str) -> Result<CatalogueRecord>;
}

/// Channel for dispatching follow-up intents.
#[async_trait]
pub trait IntentChannel: Send + Sync {
    async fn send(&self, intent: SubIntent) -> Result<Value>;
}

/// Final handoff of the accepted artifact set.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn persist(&self, files: &[GeneratedFile], dependencies: &[String]) -> Result<PersistReport>;
}

/// Catalogue data for one domain/version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueRecord {
    pub data_models: Vec<CatalogueEntry>,
    pub workflows: Vec<CatalogueEntry>,
    pub ui_layouts: Vec<UiLayout>,
}

impl CatalogueRecord {
    pub fn model_names(&self) -> Vec<String> {
        self.data_models.iter().map(|m| m.name.clone()).collect()
    }

    pub fn workflow_names(&self) -> Vec<String> {
        self.workflows.iter().map(|w| w.name.clone()).collect()
    }
}

/// A named catalogue item. Accepts either `"Invoice"` or
/// `{"name": "Invoice", "description": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EntryRepr")]
pub struct CatalogueEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CatalogueEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntryRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<EntryRepr> for CatalogueEntry {
    fn from(repr: EntryRepr) -> Self {
        match repr {
            EntryRepr::Name(name) => CatalogueEntry::named(name),
            EntryRepr::Full { name, description } => CatalogueEntry { name, description },
        }
    }
}

/// A page layout recommended by the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiLayout {
    #[serde(alias = "page_name", alias = "name")]
    pub page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub components: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Follow-up intent envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubIntent {
    pub intent: String,
    pub payload: Value,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

/// What persistence wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
    pub written: Vec<WrittenFile>,
    pub dependencies_merged: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refused: Vec<String>,
}

/// One file written by persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: String,
    pub sha256: String,
}
