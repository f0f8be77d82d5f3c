//! Planning: classify the spec and lay out per-file generation steps.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use super::paths::{component_path, page_path};
use crate::collab::{Catalogue, CatalogueRecord, IntentChannel, SubIntent, UiLayout};
use crate::domain::{ActionPlan, ActionPlanStep, AppType, ApplicationSpec, StepCategory};
use crate::error::{Result, ScaffoldrError};

/// Layouts offered when the spec names neither a domain nor a layout.
pub const LAYOUT_OPTIONS: [&str; 4] = ["sidebar-dashboard", "top-navigation", "landing-page", "split-view"];

pub const SCHEMA_SYNTHESISE_INTENT: &str = "schema.synthesise";
pub const WORKFLOW_COMPOSE_INTENT: &str = "workflow.compose";

/// A planned build.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningResult {
    pub app_type: AppType,
    pub action_plan: ActionPlan,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_models: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shared_workflows: Vec<String>,
}

/// Either a plan or a request for more input.
#[derive(Debug, Clone)]
pub enum PlanningOutcome {
    Plan(PlanningResult),
    Clarify { message: String, layout_options: Vec<String> },
}

/// Identifiers forwarded with sub-intents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanContext<'a> {
    pub trace_id: &'a str,
    pub jwt: Option<&'a str>,
}

pub struct PlanningEngine {
    catalogue: Option<Arc<dyn Catalogue>>,
    intents: Option<Arc<dyn IntentChannel>>,
}

impl PlanningEngine {
    /// Engine without catalogue or intent channel; every plan is custom.
    pub fn new() -> Self {
        Self {
            catalogue: None,
            intents: None,
        }
    }

    pub fn with_catalogue(mut self, catalogue: Arc<dyn Catalogue>) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    pub fn with_intent_channel(mut self, intents: Arc<dyn IntentChannel>) -> Self {
        self.intents = Some(intents);
        self
    }

    /// Plan a confirmed spec.
    ///
    /// Catalogue and sub-intent failures degrade to a custom plan; they are
    /// logged, never returned.
    pub async fn plan(&self, spec: &ApplicationSpec, ctx: PlanContext<'_>) -> Result<PlanningOutcome> {
        let domain = spec.domain_tag();

        if let Some(domain) = domain {
            if let Some(record) = self.fetch_catalogue(domain, spec.catalogue_version()).await {
                let result = domain_plan(spec, &record);
                log::info!(
                    "Domain plan for {}: {} steps, {} models, {} workflows",
                    domain,
                    result.action_plan.len(),
                    result.shared_models.len(),
                    result.shared_workflows.len()
                );
                self.dispatch_sub_intents(spec, &result, ctx).await;
                return ensure_steps(result).map(PlanningOutcome::Plan);
            }
        } else if spec.layout.as_deref().is_none_or(|l| l.trim().is_empty()) {
            log::info!("No domain or layout set; asking for a layout");
            return Ok(PlanningOutcome::Clarify {
                message: format!("Which layout should the app use? Options: {}", LAYOUT_OPTIONS.join(", ")),
                layout_options: LAYOUT_OPTIONS.iter().map(|s| s.to_string()).collect(),
            });
        }

        let result = PlanningResult {
            app_type: AppType::Custom,
            action_plan: base_plan(spec, &[]),
            shared_models: Vec::new(),
            shared_workflows: Vec::new(),
        };
        log::info!("Custom plan: {} steps", result.action_plan.len());
        ensure_steps(result).map(PlanningOutcome::Plan)
    }

    async fn fetch_catalogue(&self, domain: &str, version: &str) -> Option<CatalogueRecord> {
        let Some(catalogue) = &self.catalogue else {
            log::warn!("Domain {} requested but no catalogue is configured; planning as custom", domain);
            return None;
        };
        match catalogue.fetch(domain, version).await {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Catalogue fetch for {}@{} failed, planning as custom: {}", domain, version, e);
                None
            }
        }
    }

    async fn dispatch_sub_intents(&self, spec: &ApplicationSpec, result: &PlanningResult, ctx: PlanContext<'_>) {
        let Some(intents) = &self.intents else {
            log::debug!("No intent channel configured; skipping sub-intents");
            return;
        };

        let dispatches = [
            (SCHEMA_SYNTHESISE_INTENT, "models", &result.shared_models),
            (WORKFLOW_COMPOSE_INTENT, "workflows", &result.shared_workflows),
        ];
        for (intent, key, names) in dispatches {
            if names.is_empty() {
                log::debug!("No {} to send for {}", key, intent);
                continue;
            }
            let envelope = SubIntent {
                intent: intent.to_string(),
                payload: json!({
                    key: names,
                    "workspace_id": spec.workspace_id,
                    "domain": spec.domain_tag(),
                }),
                trace_id: ctx.trace_id.to_string(),
                jwt: ctx.jwt.map(str::to_string),
            };
            match intents.send(envelope).await {
                Ok(_) => log::info!("Dispatched {} with {} {}", intent, names.len(), key),
                Err(e) => log::warn!("Sub-intent {} failed: {}", intent, e),
            }
        }
    }
}

impl Default for PlanningEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_steps(result: PlanningResult) -> Result<PlanningResult> {
    if result.action_plan.is_empty() {
        return Err(ScaffoldrError::InvalidRequest(
            "spec produced an empty action plan".to_string(),
        ));
    }
    Ok(result)
}

fn domain_plan(spec: &ApplicationSpec, record: &CatalogueRecord) -> PlanningResult {
    let shared_models = record.model_names();
    let shared_workflows = record.workflow_names();
    let mut plan = base_plan(spec, &record.ui_layouts);

    if !shared_models.is_empty() {
        let models = shared_models.join(", ");
        plan = plan
            .iter()
            .map(|step| ActionPlanStep {
                description: format!("{} Use the shared data models where relevant: {}.", step.description, models),
                ..step.clone()
            })
            .collect();
    }

    PlanningResult {
        app_type: AppType::Domain,
        action_plan: plan,
        shared_models,
        shared_workflows,
    }
}

/// Layout, pages (spec first, then catalogue layouts), then components.
fn base_plan(spec: &ApplicationSpec, ui_layouts: &[UiLayout]) -> ActionPlan {
    let mut plan = ActionPlan::new();
    let app = spec.app_name.as_deref().unwrap_or("the application");

    if let Some(layout) = spec.layout.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        plan.push(
            ActionPlanStep::new(
                "app/layout.tsx",
                format!("Root layout for {} using the {} layout, shared by every page.", app, layout),
            )
            .with_category(StepCategory::Layout),
        );
    }

    for page in spec.pages.iter().filter(|p| !p.trim().is_empty()) {
        plan.push(
            ActionPlanStep::new(page_path(page), format!("The {} page of {}.", page.trim(), app))
                .with_category(StepCategory::Page),
        );
    }

    let mut extra_components = Vec::new();
    for layout in ui_layouts.iter().filter(|l| !l.page.trim().is_empty()) {
        let mut description = format!("The {} page of {}", layout.page.trim(), app);
        if let Some(style) = &layout.layout {
            description.push_str(&format!(", arranged as {}", style));
        }
        if !layout.components.is_empty() {
            description.push_str(&format!(", composed of {}", layout.components.join(", ")));
        }
        description.push('.');
        if let Some(extra) = &layout.description {
            description.push(' ');
            description.push_str(extra.trim());
        }
        plan.push(ActionPlanStep::new(page_path(&layout.page), description).with_category(StepCategory::Page));
        extra_components.extend(layout.components.iter().cloned());
    }

    for component in spec.components.iter().chain(extra_components.iter()) {
        match component_path(component) {
            Some(path) => {
                plan.push(
                    ActionPlanStep::new(path, format!("Reusable {} component.", component.trim()))
                        .with_category(StepCategory::Component),
                );
            }
            None => log::warn!("Component {:?} has no usable name; not planned", component),
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    struct StaticCatalogue(Option<CatalogueRecord>);

    #[async_trait]
    impl Catalogue for StaticCatalogue {
        async fn fetch(&self, _domain: &str, _version: &str) -> Result<CatalogueRecord> {
            self.0
                .clone()
                .ok_or_else(|| ScaffoldrError::collaborator("catalogue", "unavailable"))
        }
    }

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<SubIntent>>,
        fail: bool,
    }

    #[async_trait]
    impl IntentChannel for RecordingChannel {
        async fn send(&self, intent: SubIntent) -> Result<Value> {
            self.sent.lock().unwrap().push(intent);
            if self.fail {
                return Err(ScaffoldrError::collaborator("intent channel", "down"));
            }
            Ok(Value::Null)
        }
    }

    fn spec() -> ApplicationSpec {
        ApplicationSpec {
            app_name: Some("Ledger".to_string()),
            pages: vec!["home".to_string(), "Reports".to_string()],
            components: vec!["navigation bar".to_string()],
            workspace_id: Some("ws-1".to_string()),
            confirmed: true,
            ..Default::default()
        }
    }

    fn finance_record() -> CatalogueRecord {
        serde_json::from_str(
            r#"{"data_models": ["Account", "Transaction"], "workflows": ["month_end_close"],
                "ui_layouts": [{"page": "Dashboard", "layout": "grid", "components": ["BalanceCard"]}, {"page": "Reports"}]}"#,
        )
        .unwrap()
    }

    fn paths(result: &PlanningResult) -> Vec<&str> {
        result.action_plan.iter().map(|s| s.file_path.as_str()).collect()
    }

    #[tokio::test]
    async fn test_no_domain_no_layout_clarifies() {
        let outcome = PlanningEngine::new().plan(&spec(), PlanContext::default()).await.unwrap();
        match outcome {
            PlanningOutcome::Clarify { layout_options, .. } => assert_eq!(layout_options.len(), 4),
            other => panic!("expected clarification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_custom_plan_with_layout() {
        let spec = ApplicationSpec {
            layout: Some("sidebar-dashboard".to_string()),
            ..spec()
        };
        let PlanningOutcome::Plan(result) = PlanningEngine::new().plan(&spec, PlanContext::default()).await.unwrap()
        else {
            panic!("expected plan");
        };
        assert_eq!(result.app_type, AppType::Custom);
        assert_eq!(
            paths(&result),
            vec![
                "app/layout.tsx",
                "app/page.tsx",
                "app/reports/page.tsx",
                "components/NavigationBar.tsx"
            ]
        );
    }

    #[tokio::test]
    async fn test_non_ascii_pages_are_all_planned() {
        let spec = ApplicationSpec {
            layout: Some("top-navigation".to_string()),
            pages: vec!["home".to_string(), "设置".to_string(), "Configuración".to_string()],
            ..spec()
        };
        let PlanningOutcome::Plan(result) = PlanningEngine::new().plan(&spec, PlanContext::default()).await.unwrap()
        else {
            panic!("expected plan");
        };
        assert_eq!(
            paths(&result),
            vec![
                "app/layout.tsx",
                "app/page.tsx",
                "app/设置/page.tsx",
                "app/configuración/page.tsx",
                "components/NavigationBar.tsx"
            ]
        );
    }

    #[tokio::test]
    async fn test_domain_plan_folds_catalogue() {
        let channel = Arc::new(RecordingChannel::default());
        let engine = PlanningEngine::new()
            .with_catalogue(Arc::new(StaticCatalogue(Some(finance_record()))))
            .with_intent_channel(channel.clone());
        let spec = ApplicationSpec {
            domain: Some("finance".to_string()),
            ..spec()
        };

        let ctx = PlanContext {
            trace_id: "trace-9",
            jwt: Some("jwt-1"),
        };
        let PlanningOutcome::Plan(result) = engine.plan(&spec, ctx).await.unwrap() else {
            panic!("expected plan");
        };

        assert_eq!(result.app_type, AppType::Domain);
        assert_eq!(result.shared_models, vec!["Account", "Transaction"]);
        assert_eq!(result.shared_workflows, vec!["month_end_close"]);
        assert!(result.action_plan.get("app/dashboard/page.tsx").is_some());
        assert!(result.action_plan.get("components/BalanceCard.tsx").is_some());
        // "Reports" from the catalogue duplicates the spec page
        assert_eq!(paths(&result).iter().filter(|p| **p == "app/reports/page.tsx").count(), 1);
        assert!(result.action_plan.get("app/page.tsx").unwrap().description.contains("Account, Transaction"));

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].intent, SCHEMA_SYNTHESISE_INTENT);
        assert_eq!(sent[0].payload["models"], json!(["Account", "Transaction"]));
        assert_eq!(sent[0].payload["workspace_id"], "ws-1");
        assert_eq!(sent[1].intent, WORKFLOW_COMPOSE_INTENT);
        assert_eq!(sent[1].trace_id, "trace-9");
        assert_eq!(sent[1].jwt.as_deref(), Some("jwt-1"));
    }

    #[tokio::test]
    async fn test_catalogue_failure_degrades_to_custom() {
        let engine = PlanningEngine::new().with_catalogue(Arc::new(StaticCatalogue(None)));
        let spec = ApplicationSpec {
            domain: Some("finance".to_string()),
            ..spec()
        };
        let PlanningOutcome::Plan(result) = engine.plan(&spec, PlanContext::default()).await.unwrap() else {
            panic!("expected plan");
        };
        assert_eq!(result.app_type, AppType::Custom);
        assert_eq!(result.action_plan.len(), 3);
    }

    #[tokio::test]
    async fn test_sub_intent_failure_is_absorbed() {
        let channel = Arc::new(RecordingChannel {
            fail: true,
            ..Default::default()
        });
        let engine = PlanningEngine::new()
            .with_catalogue(Arc::new(StaticCatalogue(Some(finance_record()))))
            .with_intent_channel(channel.clone());
        let spec = ApplicationSpec {
            domain: Some("finance".to_string()),
            ..spec()
        };
        let outcome = engine.plan(&spec, PlanContext::default()).await.unwrap();
        assert!(matches!(outcome, PlanningOutcome::Plan(ref r) if r.app_type == AppType::Domain));
        assert_eq!(channel.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_plan_is_an_error() {
        let spec = ApplicationSpec {
            layout: None,
            domain: Some("finance".to_string()),
            pages: vec![],
            components: vec!["***".to_string()],
            ..Default::default()
        };
        let engine = PlanningEngine::new().with_catalogue(Arc::new(StaticCatalogue(Some(CatalogueRecord::default()))));
        let err = engine.plan(&spec, PlanContext::default()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }
}
