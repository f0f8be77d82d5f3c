//! Generation: one generator call per plan (or per corrective step).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::artifact::{Extraction, extract_artifacts};
use crate::collab::Generator;
use crate::domain::{ActionPlan, ActionPlanStep};
use crate::error::{Result, ScaffoldrError};
use crate::metrics::PipelineMetrics;

/// System prompt establishing the output protocol.
pub const GENERATION_SYSTEM: &str = "You are a senior front-end engineer generating a Next.js (App Router) \
application in TypeScript with Tailwind CSS.\n\
Wrap every file you produce in <artifact filename=\"PATH\">...</artifact> with the complete file content \
and nothing else inside the tags.\n\
Declare each npm package the code needs as <dependency>name@version</dependency>.\n\
Never elide code, never leave placeholders.";

/// How often the generator is invoked for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One call for the whole plan
    #[default]
    WholePlan,
    /// One call per plan step
    PerStep,
}

/// Review feedback for one file, carried into a corrective call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub file: String,
    pub feedback: String,
}

impl Correction {
    pub fn new(file: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            feedback: feedback.into(),
        }
    }
}

pub struct GenerationEngine {
    generator: Arc<dyn Generator>,
    mode: GenerationMode,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl GenerationEngine {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            mode: GenerationMode::default(),
            metrics: None,
        }
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Issue exactly one generator call and return its text.
    ///
    /// An empty plan without a correction makes no call and returns "".
    /// No retries happen here.
    pub async fn generate(
        &self,
        plan: &ActionPlan,
        brief: &str,
        schema: Option<&str>,
        correction: Option<&Correction>,
    ) -> Result<String> {
        if plan.is_empty() && correction.is_none() {
            log::debug!("Empty plan and no correction; skipping generator call");
            return Ok(String::new());
        }

        let prompt = build_prompt(plan.steps(), brief, schema, correction);
        if let Some(metrics) = &self.metrics {
            metrics.record_generation_call();
        }
        let output = self.generator.generate(&prompt, Some(GENERATION_SYSTEM)).await?;
        Ok(output.into_text())
    }

    /// Generate the whole plan according to the configured mode.
    ///
    /// Fails with `GenerationEmpty` when no file could be extracted.
    pub async fn build(&self, plan: &ActionPlan, brief: &str, schema: Option<&str>) -> Result<Extraction> {
        let extraction = match self.mode {
            GenerationMode::WholePlan => extract_artifacts(&self.generate(plan, brief, schema, None).await?),
            GenerationMode::PerStep => {
                let mut combined = Extraction::default();
                for step in plan.iter() {
                    let raw = self.generate(&ActionPlan::single(step.clone()), brief, schema, None).await?;
                    let extraction = extract_artifacts(&raw);
                    if extraction.is_empty() {
                        log::warn!("Step {} produced no files", step.file_path);
                    }
                    combined.files.extend(extraction.files);
                    combined.dependencies.extend(extraction.dependencies);
                    combined.skipped += extraction.skipped;
                }
                combined
            }
        };

        if extraction.is_empty() {
            return Err(ScaffoldrError::GenerationEmpty {
                phase: "generation".to_string(),
            });
        }
        log::info!(
            "Generated {} files, {} dependencies ({} blocks skipped)",
            extraction.files.len(),
            extraction.dependencies.len(),
            extraction.skipped
        );
        Ok(extraction)
    }
}

fn build_prompt(steps: &[ActionPlanStep], brief: &str, schema: Option<&str>, correction: Option<&Correction>) -> String {
    let mut prompt = String::new();

    prompt.push_str("## Application brief\n\n");
    prompt.push_str(brief.trim());
    prompt.push_str("\n\n");

    if let Some(schema) = schema.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("## Schema and context\n\n");
        prompt.push_str(schema);
        prompt.push_str("\n\n");
    }

    prompt.push_str("## Files to generate\n\n");
    for (i, step) in steps.iter().enumerate() {
        prompt.push_str(&format!("{}. `{}`: {}\n", i + 1, step.key(), step.description));
    }

    if let Some(correction) = correction {
        prompt.push_str("\n## Correction\n\n");
        prompt.push_str(&format!(
            "Regenerate only `{}`. The previous version was rejected in review:\n{}\n",
            correction.file,
            correction.feedback.trim()
        ));
    }

    prompt.push_str("\nReturn every file in its own artifact block.\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::LlmGenerator;
    use crate::domain::StepCategory;
    use crate::llm::MockLlmClient;

    fn engine(mock: Arc<MockLlmClient>) -> GenerationEngine {
        GenerationEngine::new(Arc::new(LlmGenerator::new(mock)))
    }

    fn plan() -> ActionPlan {
        [
            ActionPlanStep::new("app/page.tsx", "Home page").with_category(StepCategory::Page),
            ActionPlanStep::new("components/Nav.tsx", "Navigation").with_category(StepCategory::Component),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_empty_plan_makes_no_call() {
        let mock = Arc::new(MockLlmClient::always("x"));
        let raw = engine(mock.clone()).generate(&ActionPlan::new(), "{}", None, None).await.unwrap();
        assert!(raw.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_correction_with_empty_plan_still_calls() {
        let mock = Arc::new(MockLlmClient::always("<artifact filename=\"a.ts\">a</artifact>"));
        let correction = Correction::new("a.ts", "add an export");
        let raw = engine(mock.clone())
            .generate(&ActionPlan::new(), "{}", None, Some(&correction))
            .await
            .unwrap();
        assert!(raw.contains("a.ts"));
        assert_eq!(mock.call_count(), 1);
        let requests = mock.requests();
        let prompt = requests[0].last_user_text();
        assert!(prompt.contains("Regenerate only `a.ts`"));
        assert!(prompt.contains("add an export"));
    }

    #[tokio::test]
    async fn test_prompt_lists_steps_and_schema() {
        let mock = Arc::new(MockLlmClient::always("nothing"));
        engine(mock.clone())
            .generate(&plan(), "{\"app_name\":\"Ledger\"}", Some("models: Account"), None)
            .await
            .unwrap();
        let requests = mock.requests();
        let prompt = requests[0].last_user_text();
        assert!(prompt.contains("1. `app/page.tsx`: Home page"));
        assert!(prompt.contains("2. `components/Nav.tsx`: Navigation"));
        assert!(prompt.contains("models: Account"));
        assert!(requests[0].system.contains("<artifact filename"));
    }

    #[tokio::test]
    async fn test_build_whole_plan_single_call() {
        let mock = Arc::new(MockLlmClient::always(
            "<artifact filename=\"app/page.tsx\">page</artifact><artifact filename=\"components/Nav.tsx\">nav</artifact>\
             <dependency>zod@3.22.4</dependency>",
        ));
        let metrics = Arc::new(PipelineMetrics::new());
        let extraction = engine(mock.clone())
            .with_metrics(metrics.clone())
            .build(&plan(), "{}", None)
            .await
            .unwrap();
        assert_eq!(extraction.files.len(), 2);
        assert_eq!(extraction.dependencies, vec!["zod@3.22.4"]);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(metrics.snapshot().generation_calls, 1);
    }

    #[tokio::test]
    async fn test_build_per_step() {
        let mock = Arc::new(MockLlmClient::new(vec![
            "<artifact filename=\"app/page.tsx\">page</artifact>",
            "<artifact filename=\"components/Nav.tsx\">nav</artifact>",
        ]));
        let extraction = engine(mock.clone())
            .with_mode(GenerationMode::PerStep)
            .build(&plan(), "{}", None)
            .await
            .unwrap();
        assert_eq!(extraction.files.len(), 2);
        assert_eq!(mock.call_count(), 2);
        let requests = mock.requests();
        assert!(!requests[0].last_user_text().contains("components/Nav.tsx"));
    }

    #[tokio::test]
    async fn test_build_zero_files_is_generation_empty() {
        let mock = Arc::new(MockLlmClient::always("Sorry, I cannot help with that."));
        let err = engine(mock).build(&plan(), "{}", None).await.unwrap_err();
        assert!(matches!(err, ScaffoldrError::GenerationEmpty { .. }));
    }

    struct PartsGenerator;

    #[async_trait::async_trait]
    impl Generator for PartsGenerator {
        async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<crate::llm::GeneratorOutput> {
            Ok(crate::llm::GeneratorOutput::Parts(vec![
                crate::llm::ContentPart::text("<artifact filename=\"a.ts\">a</artifact>"),
                crate::llm::ContentPart::text("<artifact filename=\"b.ts\">b</artifact>"),
            ]))
        }
    }

    #[tokio::test]
    async fn test_multipart_output_is_normalized() {
        let engine = GenerationEngine::new(Arc::new(PartsGenerator));
        let extraction = engine.build(&plan(), "{}", None).await.unwrap();
        let paths: Vec<_> = extraction.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn test_generation_mode_serde() {
        let mode: GenerationMode = serde_yaml::from_str("per_step").unwrap();
        assert_eq!(mode, GenerationMode::PerStep);
        assert_eq!(GenerationMode::default(), GenerationMode::WholePlan);
    }
}
