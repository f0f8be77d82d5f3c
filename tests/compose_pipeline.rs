//! End-to-end compose pipeline tests
//!
//! Drives the orchestrator with scripted generator/validator clients, an
//! in-memory catalogue and a temp-dir scaffold writer.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scaffoldr::collab::{
    Catalogue, CatalogueRecord, IntentChannel, LlmGenerator, LlmValidator, SubIntent,
};
use scaffoldr::correction::CorrectionScope;
use scaffoldr::domain::{AppType, ApplicationSpec, IntentRequest};
use scaffoldr::error::{Result, ScaffoldrError};
use scaffoldr::llm::MockLlmClient;
use scaffoldr::orchestrator::{IntentOrchestrator, IntentResponse, PipelineConfig};
use scaffoldr::persist::ScaffoldWriter;
use serde_json::Value;
use tempfile::TempDir;

const PASS: &str = r#"{"pass": true, "feedback": "meets the brief"}"#;
const FAIL: &str = r#"{"pass": false, "feedback": "component is missing its default export"}"#;

struct FinanceCatalogue {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Catalogue for FinanceCatalogue {
    async fn fetch(&self, domain: &str, version: &str) -> Result<CatalogueRecord> {
        self.calls.lock().unwrap().push((domain.to_string(), version.to_string()));
        Ok(serde_json::from_value(serde_json::json!({
            "data_models": ["Account", "Transaction"],
            "workflows": ["month_end_close"],
            "ui_layouts": [
                {"page": "Dashboard", "layout": "grid", "components": ["BalanceCard"]},
                {"page": "Transactions", "components": ["LedgerTable"]}
            ]
        }))?)
    }
}

#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<SubIntent>>,
}

#[async_trait]
impl IntentChannel for RecordingChannel {
    async fn send(&self, intent: SubIntent) -> Result<Value> {
        self.sent.lock().unwrap().push(intent);
        Ok(Value::Null)
    }
}

fn orchestrator(generator: &Arc<MockLlmClient>, validator: &Arc<MockLlmClient>) -> IntentOrchestrator {
    IntentOrchestrator::new(
        Arc::new(LlmGenerator::new(generator.clone())),
        Arc::new(LlmValidator::new(validator.clone())),
    )
}

fn confirmed(pages: &[&str], components: &[&str]) -> ApplicationSpec {
    ApplicationSpec {
        app_name: Some("Ledger".to_string()),
        pages: pages.iter().map(|s| s.to_string()).collect(),
        components: components.iter().map(|s| s.to_string()).collect(),
        layout: Some("sidebar-dashboard".to_string()),
        confirmed: true,
        ..Default::default()
    }
}

fn no_tests() -> PipelineConfig {
    PipelineConfig {
        generate_tests: false,
        ..Default::default()
    }
}

/// A confirmed spec without components is answered locally.
#[tokio::test]
async fn test_missing_components_makes_no_generation_call() {
    let generator = Arc::new(MockLlmClient::always("unused"));
    let validator = Arc::new(MockLlmClient::always(PASS));
    let o = orchestrator(&generator, &validator);

    let response = o.handle(IntentRequest::compose(confirmed(&["home"], &[]), "t-1")).await;
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["status"], "AWAITING_USER_INPUT");
    assert_eq!(json["error"], "Missing required fields: components");
    assert!(!json["clarificationQuestions"].as_array().unwrap().is_empty());
    assert_eq!(generator.call_count(), 0);
    assert_eq!(validator.call_count(), 0);
}

/// A finance spec is planned from the catalogue's layouts.
#[tokio::test]
async fn test_finance_domain_plan_uses_catalogue_layouts() {
    let generator = Arc::new(MockLlmClient::always(
        "<artifact filename=\"app/dashboard/page.tsx\">dashboard</artifact>\
         <artifact filename=\"app/transactions/page.tsx\">transactions</artifact>\
         <dependency>recharts@2.12.0</dependency>",
    ));
    let validator = Arc::new(MockLlmClient::always(PASS));
    let catalogue = Arc::new(FinanceCatalogue {
        calls: Mutex::new(Vec::new()),
    });
    let channel = Arc::new(RecordingChannel::default());
    let o = orchestrator(&generator, &validator)
        .with_catalogue(catalogue.clone())
        .with_intent_channel(channel.clone())
        .with_config(no_tests());

    let spec = ApplicationSpec {
        domain: Some("finance".to_string()),
        layout: None,
        workspace_id: Some("ws-42".to_string()),
        ..confirmed(&["home"], &["Navbar"])
    };
    let response = o
        .handle(IntentRequest::compose(spec, "t-fin").with_jwt("token"))
        .await;

    let report = response.report().expect("completed");
    assert_eq!(report.app_type, AppType::Domain);
    assert_eq!(report.shared_models, vec!["Account", "Transaction"]);
    assert_eq!(report.dependencies, vec!["recharts@2.12.0"]);
    assert_eq!(catalogue.calls.lock().unwrap()[0], ("finance".to_string(), "latest".to_string()));

    let requests = generator.requests();
    let prompt = requests[0].last_user_text();
    assert!(prompt.contains("app/dashboard/page.tsx"));
    assert!(prompt.contains("app/transactions/page.tsx"));
    assert!(prompt.contains("components/LedgerTable.tsx"));
    assert!(prompt.contains("Shared data models: Account, Transaction"));

    let sent = channel.sent.lock().unwrap();
    let intents: Vec<_> = sent.iter().map(|s| s.intent.as_str()).collect();
    assert_eq!(intents, vec!["schema.synthesise", "workflow.compose"]);
    assert!(sent.iter().all(|s| s.trace_id == "t-fin" && s.jwt.as_deref() == Some("token")));
    assert_eq!(sent[0].payload["workspace_id"], "ws-42");
}

/// Two corrections, then the request fails with the remaining feedback.
#[tokio::test]
async fn test_correction_budget_is_exact() {
    let generator = Arc::new(MockLlmClient::always(
        "<artifact filename=\"app/page.tsx\">page</artifact>",
    ));
    let validator = Arc::new(MockLlmClient::always(FAIL));
    let o = orchestrator(&generator, &validator).with_config(no_tests());

    let response = o.handle(IntentRequest::compose(confirmed(&["home"], &["Nav"]), "t-2")).await;

    match response {
        IntentResponse::Failed { trace_id, error } => {
            assert_eq!(trace_id, "t-2");
            assert_eq!(error.kind, "correction_exhausted");
            assert_eq!(error.feedback.as_deref(), Some("component is missing its default export"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    // initial generation + exactly two corrections
    assert_eq!(generator.call_count(), 3);
    let snapshot = o.metrics().snapshot();
    assert_eq!(snapshot.corrections, 2);
    assert_eq!(snapshot.failed, 1);
}

/// All-pass review performs no corrections and persists everything.
#[tokio::test]
async fn test_happy_path_persists_scaffold() {
    let dir = TempDir::new().unwrap();
    let baseline = dir.path().join("baseline");
    fs::create_dir_all(&baseline).unwrap();
    fs::write(baseline.join("package.json"), r#"{"name": "ledger", "dependencies": {}}"#).unwrap();
    let target = dir.path().join("out");

    let generator = Arc::new(MockLlmClient::from_fn(|request| {
        if request.last_user_text().contains("Write `components/Nav.test.tsx`") {
            "<artifact filename=\"components/Nav.test.tsx\">it('renders')</artifact>".to_string()
        } else {
            "<artifact filename=\"app/layout.tsx\">layout</artifact>\
             <artifact filename=\"app/page.tsx\">page</artifact>\
             <artifact filename=\"components/Nav.tsx\">nav</artifact>\
             <dependency>zod@3.22.4</dependency><dependency>clsx</dependency>"
                .to_string()
        }
    }));
    let validator = Arc::new(MockLlmClient::always(PASS));
    let o = orchestrator(&generator, &validator)
        .with_persistence(Arc::new(ScaffoldWriter::new(&target).with_baseline(&baseline)));

    let response = o.handle(IntentRequest::compose(confirmed(&["home"], &["Nav"]), "t-3")).await;
    let report = response.report().expect("completed");

    assert_eq!(report.correction_attempts, 0);
    assert_eq!(report.test_files, vec!["components/Nav.test.tsx"]);
    let persisted = report.persisted.as_ref().unwrap();
    assert_eq!(persisted.written.len(), 4);
    assert_eq!(persisted.dependencies_merged, 2);

    assert_eq!(fs::read_to_string(target.join("components/Nav.tsx")).unwrap(), "nav");
    assert!(target.join("components/Nav.test.tsx").exists());
    let manifest: Value = serde_json::from_str(&fs::read_to_string(target.join("package.json")).unwrap()).unwrap();
    assert_eq!(manifest["name"], "ledger");
    assert_eq!(manifest["dependencies"]["zod"], "3.22.4");
    assert_eq!(manifest["dependencies"]["clsx"], "latest");
}

/// A test the generator already wrote is kept instead of being generated
/// a second time.
#[tokio::test]
async fn test_generated_test_file_is_not_duplicated() {
    let generator = Arc::new(MockLlmClient::from_fn(|request| {
        if request.last_user_text().contains("Write `components/Nav.test.tsx`") {
            "<artifact filename=\"components/Nav.test.tsx\">it('again')</artifact>".to_string()
        } else {
            "<artifact filename=\"app/layout.tsx\">layout</artifact>\
             <artifact filename=\"app/page.tsx\">page</artifact>\
             <artifact filename=\"components/Nav.tsx\">nav</artifact>\
             <artifact filename=\"components/Nav.test.tsx\">it('renders')</artifact>"
                .to_string()
        }
    }));
    let validator = Arc::new(MockLlmClient::always(PASS));
    let o = orchestrator(&generator, &validator);

    let response = o.handle(IntentRequest::compose(confirmed(&["home"], &["Nav"]), "t-dup")).await;
    let report = response.report().expect("completed");

    assert!(report.test_files.is_empty());
    assert_eq!(generator.call_count(), 1);
    let tests: Vec<_> = report
        .files
        .iter()
        .filter(|f| f.key() == "components/Nav.test.tsx")
        .collect();
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0].content, "it('renders')");
}

/// A quoted path from the generator still matches its plan step and
/// lands unquoted on disk.
#[tokio::test]
async fn test_quoted_paths_are_normalized_through_correction() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("out");

    let generator = Arc::new(MockLlmClient::new(vec![
        "<artifact filename=\"\"app/page.tsx\"\">v1</artifact><artifact filename=\"components/Nav.tsx\">nav</artifact>",
        "<artifact filename='app/page.tsx'>v2</artifact>",
    ]));
    let validator = Arc::new(MockLlmClient::new(vec![FAIL, PASS, PASS]));
    let o = orchestrator(&generator, &validator)
        .with_config(no_tests())
        .with_persistence(Arc::new(ScaffoldWriter::new(&target)));

    let response = o.handle(IntentRequest::compose(confirmed(&["home"], &["Nav"]), "t-4")).await;
    let report = response.report().expect("completed");

    assert_eq!(report.correction_attempts, 1);
    assert_eq!(report.files.len(), 2);
    assert_eq!(fs::read_to_string(target.join("app/page.tsx")).unwrap(), "v2");

    // the corrective prompt carried the original step and the feedback
    let requests = generator.requests();
    let prompt = requests[1].last_user_text();
    assert!(prompt.contains("The home page of Ledger."));
    assert!(prompt.contains("missing its default export"));
}

/// All-failed scope regenerates each failing file in one attempt.
#[tokio::test]
async fn test_all_failed_scope() {
    let generator = Arc::new(MockLlmClient::new(vec![
        "<artifact filename=\"app/page.tsx\">v1</artifact><artifact filename=\"components/Nav.tsx\">v1</artifact>",
        "<artifact filename=\"app/page.tsx\">v2</artifact>",
        "<artifact filename=\"components/Nav.tsx\">v2</artifact>",
    ]));
    let validator = Arc::new(MockLlmClient::new(vec![FAIL, FAIL, PASS, PASS]));
    let config = PipelineConfig {
        correction_scope: CorrectionScope::AllFailed,
        max_correction_attempts: 1,
        generate_tests: false,
        ..Default::default()
    };
    let o = orchestrator(&generator, &validator).with_config(config);

    let response = o.handle(IntentRequest::compose(confirmed(&["home"], &["Nav"]), "t-5")).await;
    let report = response.report().expect("completed");
    assert_eq!(report.correction_attempts, 1);
    assert!(report.files.iter().all(|f| f.content == "v2"));
}

/// Discovery round, then confirmation on the next turn.
#[tokio::test]
async fn test_discovery_then_confirmation() {
    let generator = Arc::new(MockLlmClient::new(vec![
        r#"{"spec": {"app_name": "Ledger", "pages": ["home"], "components": ["Nav"], "layout": "top-navigation"},
            "message": "Ledger with a home page and a Nav. Shall I build it?"}"#,
        r#"{"spec": {"pages": ["home", "settings"]}, "message": "Added settings. Build it?"}"#,
        "<artifact filename=\"app/layout.tsx\">layout</artifact><artifact filename=\"app/page.tsx\">page</artifact>\
         <artifact filename=\"components/Nav.tsx\">nav</artifact>",
    ]));
    let validator = Arc::new(MockLlmClient::always(PASS));
    let o = orchestrator(&generator, &validator).with_config(no_tests());

    let first = ApplicationSpec {
        user_input: Some("I need a small ledger app".to_string()),
        ..Default::default()
    };
    let response = o.handle(IntentRequest::compose(first, "t-6")).await;
    let IntentResponse::AwaitingInput { message, spec, .. } = response else {
        panic!("expected discovery reply");
    };
    assert!(message.contains("Shall I build it?"));
    assert!(spec.ready_for_confirmation);

    // "no thanks" goes back to discovery
    let declined = ApplicationSpec {
        user_input: Some("no thanks, add a settings page".to_string()),
        ..spec.clone()
    };
    let response = o.handle(IntentRequest::compose(declined, "t-6")).await;
    let IntentResponse::AwaitingInput { spec, .. } = response else {
        panic!("expected discovery reply");
    };
    assert_eq!(spec.pages, vec!["home", "settings"]);

    let second = ApplicationSpec {
        user_input: Some("yes, let's go".to_string()),
        ..spec
    };
    let response = o.handle(IntentRequest::compose(second, "t-6")).await;
    assert_eq!(response.status(), "completed");
    assert_eq!(o.metrics().snapshot().awaiting_input, 2);
}

/// A generator that returns nothing usable fails the request.
#[tokio::test]
async fn test_generation_empty_fails_request() {
    let generator = Arc::new(MockLlmClient::always("Here is a description of the app instead of code."));
    let validator = Arc::new(MockLlmClient::always(PASS));
    let o = orchestrator(&generator, &validator);

    let err = o
        .compose(IntentRequest::compose(confirmed(&["home"], &["Nav"]), "t-7"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScaffoldrError::GenerationEmpty { .. }));
    assert_eq!(validator.call_count(), 0);
}
