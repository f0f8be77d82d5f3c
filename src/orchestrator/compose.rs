//! The compose state machine.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use super::config::PipelineConfig;
use super::response::{ComposeReport, IntentResponse};
use crate::collab::{Catalogue, Generator, IntentChannel, Persistence, Validator};
use crate::correction::{CorrectionInput, CorrectionLoop};
use crate::discovery::{DiscoveryEngine, clarification_questions, is_affirmative};
use crate::domain::{APP_COMPOSE_INTENT, ApplicationSpec, GeneratedFile, IntentRequest};
use crate::error::{Result, ScaffoldrError};
use crate::generation::GenerationEngine;
use crate::id::generate_trace_id;
use crate::metrics::PipelineMetrics;
use crate::planning::{PlanContext, PlanningEngine, PlanningOutcome, PlanningResult};
use crate::review::ReviewEngine;
use crate::testgen::TestGenerationEngine;

/// Phases of one compose request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposePhase {
    Discovery,
    Confirmation,
    Planning,
    Generating,
    Correcting,
    TestGeneration,
    ReadyForPersistence,
    Completed,
    Failed,
}

impl fmt::Display for ComposePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComposePhase::Discovery => "DISCOVERY",
            ComposePhase::Confirmation => "CONFIRMATION",
            ComposePhase::Planning => "PLANNING",
            ComposePhase::Generating => "GENERATING",
            ComposePhase::Correcting => "REVIEWING/CORRECTING",
            ComposePhase::TestGeneration => "TEST_GENERATION",
            ComposePhase::ReadyForPersistence => "READY_FOR_PERSISTENCE",
            ComposePhase::Completed => "COMPLETED",
            ComposePhase::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Composes every phase for incoming `app.compose` requests.
///
/// Holds only shared collaborators; all per-request state lives on the
/// stack of [`IntentOrchestrator::compose`], so concurrent requests are
/// independent.
pub struct IntentOrchestrator {
    generator: Arc<dyn Generator>,
    validator: Arc<dyn Validator>,
    catalogue: Option<Arc<dyn Catalogue>>,
    intents: Option<Arc<dyn IntentChannel>>,
    persistence: Option<Arc<dyn Persistence>>,
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
}

impl IntentOrchestrator {
    pub fn new(generator: Arc<dyn Generator>, validator: Arc<dyn Validator>) -> Self {
        Self {
            generator,
            validator,
            catalogue: None,
            intents: None,
            persistence: None,
            config: PipelineConfig::default(),
            metrics: Arc::new(PipelineMetrics::new()),
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

    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a request and always produce a response; fatal errors become a
    /// `failed` envelope.
    pub async fn handle(&self, request: IntentRequest) -> IntentResponse {
        let mut request = request;
        if request.trace_id.trim().is_empty() {
            request.trace_id = generate_trace_id();
        }
        let trace_id = request.trace_id.clone();

        match self.compose(request).await {
            Ok(response) => response,
            Err(e) => {
                transition(&trace_id, ComposePhase::Failed);
                tracing::error!(trace_id = %trace_id, kind = e.kind(), error = %e, "Compose failed");
                IntentResponse::failed(&e, trace_id)
            }
        }
    }

    /// Run one request through the pipeline.
    pub async fn compose(&self, request: IntentRequest) -> Result<IntentResponse> {
        self.metrics.record_request();
        let result = self.run(request).await;
        match &result {
            Ok(IntentResponse::Completed(_)) => self.metrics.record_completed(),
            Ok(IntentResponse::AwaitingInput { .. }) => self.metrics.record_awaiting_input(),
            Ok(IntentResponse::Failed { .. }) | Err(_) => self.metrics.record_failed(),
        }
        result
    }

    async fn run(&self, request: IntentRequest) -> Result<IntentResponse> {
        if request.intent != APP_COMPOSE_INTENT {
            return Err(ScaffoldrError::InvalidRequest(format!(
                "unsupported intent {:?}, expected {}",
                request.intent, APP_COMPOSE_INTENT
            )));
        }
        let trace_id = request.trace_id.as_str();
        let mut spec = request.payload;

        if !spec.confirmed {
            let input = spec.user_input.clone().unwrap_or_default();
            if spec.ready_for_confirmation && is_affirmative(&input) {
                transition(trace_id, ComposePhase::Confirmation);
                log::info!("User confirmed the spec");
                spec.confirmed = true;
            } else {
                transition(trace_id, ComposePhase::Discovery);
                return self.discover(&input, spec).await;
            }
        }

        let missing = spec.missing_required_fields();
        if !missing.is_empty() {
            log::info!("Confirmed spec is missing {:?}", missing);
            let questions = clarification_questions(&missing);
            return Ok(IntentResponse::missing_fields(&missing, questions, spec));
        }

        transition(trace_id, ComposePhase::Planning);
        let planning = self.planning_engine();
        let ctx = PlanContext {
            trace_id,
            jwt: request.jwt.as_deref(),
        };
        let planned = match planning.plan(&spec, ctx).await? {
            PlanningOutcome::Plan(result) => result,
            PlanningOutcome::Clarify {
                message,
                layout_options,
            } => {
                return Ok(IntentResponse::AwaitingInput {
                    message,
                    error: None,
                    clarification_questions: Vec::new(),
                    layout_options,
                    spec,
                });
            }
        };

        self.build(trace_id, &spec, planned).await.map(IntentResponse::Completed)
    }

    async fn discover(&self, input: &str, spec: ApplicationSpec) -> Result<IntentResponse> {
        let outcome = DiscoveryEngine::new(self.generator.clone())
            .discover(input, Some(&spec))
            .await?;

        let questions = if outcome.is_complete {
            Vec::new()
        } else {
            clarification_questions(&outcome.updated_spec.missing_required_fields())
        };
        Ok(IntentResponse::AwaitingInput {
            message: outcome.response_to_user,
            error: None,
            clarification_questions: questions,
            layout_options: Vec::new(),
            spec: outcome.updated_spec,
        })
    }

    /// Generation through persistence for a planned spec.
    async fn build(&self, trace_id: &str, spec: &ApplicationSpec, planned: PlanningResult) -> Result<ComposeReport> {
        let brief = spec.brief();
        let schema = schema_context(&planned);
        let generation = GenerationEngine::new(self.generator.clone())
            .with_mode(self.config.generation_mode)
            .with_metrics(self.metrics.clone());
        let review = ReviewEngine::new(self.validator.clone()).with_metrics(self.metrics.clone());

        transition(trace_id, ComposePhase::Generating);
        let extraction = generation.build(&planned.action_plan, &brief, schema.as_deref()).await?;

        transition(trace_id, ComposePhase::Correcting);
        let input = CorrectionInput {
            plan: &planned.action_plan,
            brief: &brief,
            schema: schema.as_deref(),
        };
        let corrected = CorrectionLoop::new(&generation, &review)
            .with_max_attempts(self.config.max_correction_attempts)
            .with_scope(self.config.correction_scope)
            .with_metrics(self.metrics.clone())
            .run(input, extraction.files)
            .await?;

        let mut files = corrected.files;
        let mut dependencies = extraction.dependencies;
        dependencies.extend(corrected.dependencies);

        let mut test_files = Vec::new();
        if self.config.generate_tests {
            transition(trace_id, ComposePhase::TestGeneration);
            let companions = TestGenerationEngine::new(self.generator.clone())
                .with_metrics(self.metrics.clone())
                .generate_tests(&files, &brief)
                .await;
            for companion in accepted_companions(&review, companions, &input.review_context()).await {
                test_files.push(companion.path.clone());
                files.push(companion);
            }
        }

        transition(trace_id, ComposePhase::ReadyForPersistence);
        let persisted = match &self.persistence {
            Some(persistence) => Some(persistence.persist(&files, &dependencies).await?),
            None => {
                log::info!("No persistence configured; returning files to the caller");
                None
            }
        };

        transition(trace_id, ComposePhase::Completed);
        Ok(ComposeReport {
            trace_id: trace_id.to_string(),
            app_type: planned.app_type,
            files,
            dependencies,
            test_files,
            correction_attempts: corrected.attempts,
            shared_models: planned.shared_models,
            shared_workflows: planned.shared_workflows,
            persisted,
            completed_at: Utc::now(),
        })
    }

    fn planning_engine(&self) -> PlanningEngine {
        let mut planning = PlanningEngine::new();
        if let Some(catalogue) = &self.catalogue {
            planning = planning.with_catalogue(catalogue.clone());
        }
        if let Some(intents) = &self.intents {
            planning = planning.with_intent_channel(intents.clone());
        }
        planning
    }
}

/// Review companions once and keep only the passing ones.
async fn accepted_companions(
    review: &ReviewEngine,
    companions: Vec<GeneratedFile>,
    context: &str,
) -> Vec<GeneratedFile> {
    if companions.is_empty() {
        return companions;
    }
    let verdicts = review.review(&companions, context).await;
    companions
        .into_iter()
        .zip(verdicts)
        .filter_map(|(file, verdict)| {
            if verdict.passed {
                Some(file)
            } else {
                log::warn!("Dropping test companion {}: {}", file.path, verdict.feedback);
                None
            }
        })
        .collect()
}

fn schema_context(planned: &PlanningResult) -> Option<String> {
    let mut lines = Vec::new();
    if !planned.shared_models.is_empty() {
        lines.push(format!("Shared data models: {}", planned.shared_models.join(", ")));
    }
    if !planned.shared_workflows.is_empty() {
        lines.push(format!("Shared workflows: {}", planned.shared_workflows.join(", ")));
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn transition(trace_id: &str, phase: ComposePhase) {
    tracing::info!(trace_id = %trace_id, phase = %phase, "Compose phase");
}
