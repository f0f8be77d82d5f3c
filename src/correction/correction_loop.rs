//! Bounded review-and-correct loop.
//!
//! ```text
//! Reviewing ──all pass──▶ Done
//!     │
//!     ├─budget spent──▶ Exhausted (error)
//!     ▼
//! Correcting ──regenerate failed file(s), re-review new files──▶ Reviewing
//! ```
//!
//! A correction that yields no file goes back to `Reviewing` with the same
//! failures and still consumes an attempt.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::artifact::extract_artifacts;
use crate::domain::{
    ActionPlan, ActionPlanStep, GeneratedFile, RetrySession, ReviewResult, merge_results, normalize_path, splice_file,
};
use crate::error::{Result, ScaffoldrError};
use crate::generation::{Correction, GenerationEngine};
use crate::metrics::PipelineMetrics;
use crate::review::ReviewEngine;

/// Default correction budget per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Which failed files are regenerated in one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionScope {
    /// Only the first failing file, in file order
    #[default]
    FirstFailed,
    /// Every failing file
    AllFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CorrectionState {
    /// Inspect the current verdicts and spend budget if anything failed
    Reviewing,
    Correcting,
    Done,
    Exhausted,
}

/// Files and verdicts after the loop finished with everything passing.
#[derive(Debug, Clone)]
pub struct CorrectionOutcome {
    pub files: Vec<GeneratedFile>,
    pub results: Vec<ReviewResult>,
    /// Dependencies declared by corrective generations
    pub dependencies: Vec<String>,
    /// Correction attempts spent
    pub attempts: u32,
}

/// What the loop regenerates against.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionInput<'a> {
    pub plan: &'a ActionPlan,
    pub brief: &'a str,
    pub schema: Option<&'a str>,
}

impl CorrectionInput<'_> {
    /// Context handed to the validator.
    pub fn review_context(&self) -> String {
        match self.schema.map(str::trim).filter(|s| !s.is_empty()) {
            Some(schema) => format!("Application brief:\n{}\n\nSchema and context:\n{}", self.brief.trim(), schema),
            None => format!("Application brief:\n{}", self.brief.trim()),
        }
    }
}

pub struct CorrectionLoop<'a> {
    generation: &'a GenerationEngine,
    review: &'a ReviewEngine,
    max_attempts: u32,
    scope: CorrectionScope,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl<'a> CorrectionLoop<'a> {
    pub fn new(generation: &'a GenerationEngine, review: &'a ReviewEngine) -> Self {
        Self {
            generation,
            review,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scope: CorrectionScope::default(),
            metrics: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_scope(mut self, scope: CorrectionScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Review `files` and correct failures until all pass or the budget is
    /// spent.
    pub async fn run(&self, input: CorrectionInput<'_>, files: Vec<GeneratedFile>) -> Result<CorrectionOutcome> {
        let context = input.review_context();
        let mut session = RetrySession::new(self.max_attempts);
        let mut files = files;
        let mut results = self.review.review(&files, &context).await;
        let mut dependencies = Vec::new();
        let mut state = CorrectionState::Reviewing;

        loop {
            state = match state {
                CorrectionState::Reviewing => {
                    if results.iter().all(|r| r.passed) {
                        CorrectionState::Done
                    } else if let Some(attempt) = session.begin_attempt() {
                        log::info!("Correction attempt {}/{}", attempt, session.max_attempts());
                        if let Some(metrics) = &self.metrics {
                            metrics.record_correction();
                        }
                        CorrectionState::Correcting
                    } else {
                        CorrectionState::Exhausted
                    }
                }
                CorrectionState::Correcting => {
                    let targets = self.targets(&results);
                    let mut produced = Vec::new();
                    for failed in &targets {
                        let raw = self.regenerate(&input, failed).await?;
                        let extraction = extract_artifacts(&raw);
                        if extraction.is_empty() {
                            log::warn!("Correction of {} produced no files", failed.file_path);
                            continue;
                        }
                        dependencies.extend(extraction.dependencies);
                        produced.extend(extraction.files);
                    }

                    if !produced.is_empty() {
                        for file in &produced {
                            splice_file(&mut files, file.clone());
                        }
                        let fresh = self.review.review(&produced, &context).await;
                        merge_results(&mut results, fresh);
                    }
                    CorrectionState::Reviewing
                }
                CorrectionState::Done => {
                    log::info!("All {} files passed after {} corrections", files.len(), session.attempts());
                    return Ok(CorrectionOutcome {
                        files,
                        results,
                        dependencies,
                        attempts: session.attempts(),
                    });
                }
                CorrectionState::Exhausted => {
                    let (file, feedback) = results
                        .iter()
                        .find(|r| !r.passed)
                        .map(|r| (r.file_path.clone(), r.feedback.clone()))
                        .unwrap_or_default();
                    log::warn!("Correction budget of {} spent; {} still failing", session.max_attempts(), file);
                    return Err(ScaffoldrError::CorrectionExhausted {
                        attempts: session.attempts(),
                        file,
                        feedback,
                    });
                }
            };
        }
    }

    fn targets(&self, results: &[ReviewResult]) -> Vec<ReviewResult> {
        let failed = results.iter().filter(|r| !r.passed).cloned();
        match self.scope {
            CorrectionScope::FirstFailed => failed.take(1).collect(),
            CorrectionScope::AllFailed => failed.collect(),
        }
    }

    async fn regenerate(&self, input: &CorrectionInput<'_>, failed: &ReviewResult) -> Result<String> {
        let key = normalize_path(&failed.file_path);
        let step = match input.plan.get(&key) {
            Some(step) => step.clone(),
            None => {
                log::debug!("No plan step for {}; synthesising one", key);
                ActionPlanStep::new(&key, format!("Regenerate {} so it passes review.", key))
            }
        };
        let corrective = ActionPlan::single(step.with_feedback(&failed.feedback));
        let correction = Correction::new(key, &failed.feedback);
        self.generation
            .generate(&corrective, input.brief, input.schema, Some(&correction))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{LlmGenerator, LlmValidator};
    use crate::llm::MockLlmClient;

    const PASS: &str = r#"{"pass": true, "feedback": "looks right"}"#;
    const FAIL: &str = r#"{"pass": false, "feedback": "missing default export"}"#;

    struct Harness {
        generator: Arc<MockLlmClient>,
        validator: Arc<MockLlmClient>,
        generation: GenerationEngine,
        review: ReviewEngine,
        plan: ActionPlan,
    }

    fn harness(generator: MockLlmClient, validator: MockLlmClient) -> Harness {
        let generator = Arc::new(generator);
        let validator = Arc::new(validator);
        Harness {
            generation: GenerationEngine::new(Arc::new(LlmGenerator::new(generator.clone()))),
            review: ReviewEngine::new(Arc::new(LlmValidator::new(validator.clone()))),
            generator,
            validator,
            plan: [
                ActionPlanStep::new("app/page.tsx", "Home page"),
                ActionPlanStep::new("components/Nav.tsx", "Navigation"),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn files() -> Vec<GeneratedFile> {
        vec![
            GeneratedFile::new("app/page.tsx", "v1 page"),
            GeneratedFile::new("components/Nav.tsx", "v1 nav"),
        ]
    }

    fn input(plan: &ActionPlan) -> CorrectionInput<'_> {
        CorrectionInput {
            plan,
            brief: "{}",
            schema: None,
        }
    }

    #[tokio::test]
    async fn test_all_pass_means_zero_corrections() {
        let h = harness(MockLlmClient::always("unused"), MockLlmClient::always(PASS));
        let outcome = CorrectionLoop::new(&h.generation, &h.review)
            .run(input(&h.plan), files())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 0);
        assert_eq!(h.generator.call_count(), 0);
        assert_eq!(h.validator.call_count(), 2);
        assert_eq!(outcome.files, files());
    }

    #[tokio::test]
    async fn test_always_failing_exhausts_after_exactly_max_attempts() {
        let h = harness(
            MockLlmClient::always("<artifact filename=\"app/page.tsx\">again</artifact>"),
            MockLlmClient::always(FAIL),
        );
        let metrics = Arc::new(PipelineMetrics::new());
        let err = CorrectionLoop::new(&h.generation, &h.review)
            .with_max_attempts(2)
            .with_metrics(metrics.clone())
            .run(input(&h.plan), files())
            .await
            .unwrap_err();

        match err {
            ScaffoldrError::CorrectionExhausted {
                attempts,
                file,
                feedback,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(file, "app/page.tsx");
                assert_eq!(feedback, "missing default export");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(h.generator.call_count(), 2);
        assert_eq!(metrics.snapshot().corrections, 2);
        // 2 initial reviews + 1 re-review per correction
        assert_eq!(h.validator.call_count(), 4);
    }

    #[tokio::test]
    async fn test_fixes_first_failure_with_feedback() {
        let h = harness(
            MockLlmClient::always("<artifact filename=\"\"app/page.tsx\"\">v2 page</artifact>"),
            MockLlmClient::new(vec![FAIL, PASS, PASS]),
        );
        let outcome = CorrectionLoop::new(&h.generation, &h.review)
            .run(input(&h.plan), files())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.files[0].content, "v2 page");
        assert!(outcome.results.iter().all(|r| r.passed));
        assert_eq!(outcome.results.len(), 2);

        let requests = h.generator.requests();
        let prompt = requests[0].last_user_text();
        assert!(prompt.contains("Home page"));
        assert!(prompt.contains("missing default export"));
        assert!(!prompt.contains("components/Nav.tsx"));
    }

    #[tokio::test]
    async fn test_empty_correction_consumes_budget() {
        let h = harness(
            MockLlmClient::new(vec![
                "I could not regenerate it.",
                "<artifact filename=\"app/page.tsx\">fixed</artifact><dependency>clsx@2.1.0</dependency>",
            ]),
            MockLlmClient::new(vec![FAIL, PASS, PASS]),
        );
        let outcome = CorrectionLoop::new(&h.generation, &h.review)
            .with_max_attempts(2)
            .run(input(&h.plan), files())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.files[0].content, "fixed");
        assert_eq!(outcome.dependencies, vec!["clsx@2.1.0"]);
    }

    #[tokio::test]
    async fn test_all_failed_scope_corrects_each_file() {
        let h = harness(
            MockLlmClient::new(vec![
                "<artifact filename=\"app/page.tsx\">v2 page</artifact>",
                "<artifact filename=\"components/Nav.tsx\">v2 nav</artifact>",
            ]),
            MockLlmClient::new(vec![FAIL, FAIL, PASS, PASS]),
        );
        let outcome = CorrectionLoop::new(&h.generation, &h.review)
            .with_scope(CorrectionScope::AllFailed)
            .run(input(&h.plan), files())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(h.generator.call_count(), 2);
        assert_eq!(outcome.files[1].content, "v2 nav");
    }

    #[tokio::test]
    async fn test_unplanned_file_gets_synthesised_step() {
        let h = harness(
            MockLlmClient::always("<artifact filename=\"lib/util.ts\">fixed</artifact>"),
            MockLlmClient::new(vec![FAIL, PASS]),
        );
        let outcome = CorrectionLoop::new(&h.generation, &h.review)
            .run(input(&h.plan), vec![GeneratedFile::new("lib/util.ts", "broken")])
            .await
            .unwrap();

        assert_eq!(outcome.files[0].content, "fixed");
        let requests = h.generator.requests();
        assert!(requests[0].last_user_text().contains("Regenerate lib/util.ts"));
    }

    #[tokio::test]
    async fn test_generator_error_during_correction_propagates() {
        let h = harness(MockLlmClient::failing("down"), MockLlmClient::always(FAIL));
        let err = CorrectionLoop::new(&h.generation, &h.review)
            .run(input(&h.plan), files())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "llm");
    }

    #[test]
    fn test_review_context() {
        let plan = ActionPlan::new();
        let ctx = CorrectionInput {
            plan: &plan,
            brief: "brief",
            schema: Some("schema"),
        }
        .review_context();
        assert!(ctx.contains("brief") && ctx.contains("schema"));
    }
}
