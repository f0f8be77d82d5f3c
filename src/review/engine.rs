//! Review: one validator call per file, parsed defensively.

use std::sync::Arc;

use serde::Deserialize;

use crate::artifact::parse_json_payload;
use crate::collab::Validator;
use crate::domain::{GeneratedFile, ReviewResult};
use crate::metrics::PipelineMetrics;

/// Characters of an unparseable reply quoted back in feedback.
const SNIPPET_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(alias = "passed")]
    pass: bool,
    #[serde(default)]
    feedback: String,
}

pub struct ReviewEngine {
    validator: Arc<dyn Validator>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl ReviewEngine {
    pub fn new(validator: Arc<dyn Validator>) -> Self {
        Self {
            validator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Review each file in order. Never fails: a validator error or an
    /// unparseable verdict yields a failing result for that file only.
    pub async fn review(&self, files: &[GeneratedFile], context: &str) -> Vec<ReviewResult> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.review_file(file, context).await);
        }
        let failed = results.iter().filter(|r| !r.passed).count();
        log::info!("Reviewed {} files: {} passed, {} failed", results.len(), results.len() - failed, failed);
        results
    }

    /// Review a single file.
    pub async fn review_file(&self, file: &GeneratedFile, context: &str) -> ReviewResult {
        if let Some(metrics) = &self.metrics {
            metrics.record_review_call();
        }

        let file_context = format!("File under review: {}\n\n{}", file.key(), context.trim());
        let raw = match self.validator.validate(&file.content, &file_context).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Validator failed for {}: {}", file.path, e);
                return ReviewResult::fail(&file.path, format!("Validator call failed: {}", e));
            }
        };

        match parse_json_payload::<Verdict>(&raw) {
            Ok((verdict, layer)) => {
                log::debug!("Verdict for {} parsed ({:?}): pass={}", file.path, layer, verdict.pass);
                ReviewResult {
                    file_path: file.path.clone(),
                    passed: verdict.pass,
                    feedback: verdict.feedback,
                }
            }
            Err(e) => {
                log::warn!("Unparseable verdict for {}: {}", file.path, e);
                ReviewResult::fail(
                    &file.path,
                    format!("Review verdict could not be parsed ({}). Raw reply: {}", e.reason, snippet(&raw)),
                )
            }
        }
    }
}

fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(SNIPPET_LEN) {
        Some((end, _)) => format!("{}...", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}
